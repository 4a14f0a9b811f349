//! Presentation side of the bridge monitor
//!
//! This crate provides:
//! - `FrameTable`, the presentation-visible mapping from identifier to the
//!   latest update, with time-based decay of change highlighting
//! - `DisplayBackend` trait for anything that can show rows of text with
//!   highlighted regions
//! - `Screen`, an in-memory backend the terminal renderer draws from
//! - Field formatting (hex/decimal) and single-line log formatting
//!
//! # Architecture
//!
//! The ingest flow owns the change cache and only sends updates. The
//! display flow owns a `FrameTable`, applies every drained update to it and
//! redraws. Decay is evaluated at render time against the caller's clock
//! and never mutates a stored diff mask.

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod backend;
pub mod format;
pub mod screen;
pub mod table;

// Re-export key types
pub use backend::{DisplayBackend, DisplayError};
pub use format::{log_line, FieldFormat};
pub use screen::Screen;
pub use table::{FrameTable, TableRow};
