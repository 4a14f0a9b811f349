//! Serial framing protocol of the canlink CAN bridge
//!
//! The bridge forwards every captured bus frame as a short burst of bytes in
//! which bit 7 is reserved: it is set on exactly one byte, the trailing
//! framing byte, and clear everywhere else. The receiver therefore finds
//! frame boundaries by looking at bit 7 alone, with no escape sequences and
//! no length prefix. The real bit 7 of each payload byte is stripped by the
//! bridge and carried in dedicated positions instead.
//!
//! # Binary frame
//!
//! ```text
//! ┌─────────────┬────────────┬───────┬─────────┐
//! │ IDENTIFIER  │ DATA       │ CARRY │ FRAMING │
//! │ 2–5B        │ 0–8B       │ 1B    │ 1B      │
//! └─────────────┴────────────┴───────┴─────────┘
//!
//! FRAMING: 1 C II LLLL
//!          │ │ │  └── count of all bytes before FRAMING
//!          │ │ └───── identifier width - 2
//!          │ └─────── bit 7 of the last data byte
//!          └───────── boundary marker
//! ```
//!
//! # Text line
//!
//! Older bridge firmware prints one frame per line instead:
//! `IDENTIFIER COUNT FIELD_1 … FIELD_COUNT\n`. See [`line`].

#![cfg_attr(not(any(test, feature = "std")), no_std)]
#![deny(unsafe_code)]

pub mod decode;
pub mod encode;
pub mod frame;
pub mod line;

pub use decode::{decode, DecodedFrame, FrameId, MAX_DATA_LEN, MAX_IDENTIFIER};
pub use encode::encode;
pub use frame::{FrameAccumulator, FrameError, RawFrame, ReadError, MAX_RAW_FRAME_SIZE};
pub use line::{parse_line, LineAccumulator, LineError, TextRecord, MAX_LINE_LEN};
