//! canlink Hardware Abstraction Layer
//!
//! The monitor only needs one thing from the hardware: a stream of bytes
//! from the bridge. This crate defines that seam so the framing and
//! decoding code can be driven by a real serial port, a capture file, or
//! a canned buffer in tests.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  canlink-monitor (ingest thread)        │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  canlink-hal (this crate - traits)      │
//! └─────────────────────────────────────────┘
//!                     │
//!         ┌───────────┴───────────┐
//!         ▼                       ▼
//! ┌───────────────┐       ┌───────────────┐
//! │  tty / file   │       │   SliceRx     │
//! │  (host std)   │       │  (in-memory)  │
//! └───────────────┘       └───────────────┘
//! ```
//!
//! # Traits
//!
//! - [`uart::UartRx`] - Blocking byte source

#![no_std]
#![deny(unsafe_code)]

pub mod uart;

pub use uart::{SliceRx, SliceRxError, UartConfig, UartRx};
