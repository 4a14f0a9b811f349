//! Board-agnostic logic for the bridge monitor
//!
//! This crate contains everything between a decoded frame and the display
//! that does not depend on the host:
//!
//! - Per-identifier change cache with diff masks
//! - Update records handed from the ingest flow to the display flow
//! - Configuration type definitions
//!
//! Time is passed in as milliseconds by the caller; nothing here reads a
//! clock.

#![cfg_attr(not(test), no_std)]
#![deny(unsafe_code)]

extern crate alloc;

pub mod cache;
pub mod config;
pub mod update;

pub use cache::{CacheEntry, ChangeCache, DiffMask};
pub use update::{BinaryUpdate, FrameUpdate, TextUpdate};
