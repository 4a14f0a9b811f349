//! Monitor flows
//!
//! - ingest: byte source → accumulator → decoder/parser → change cache → dispatcher
//! - render: dispatcher → frame table → terminal
//! - tick: the clock both flows stamp with

pub mod ingest;
pub mod render;
pub mod tick;

pub use ingest::{binary_ingest, text_ingest, IngestStats};
pub use render::{render_loop, LoopExit, Presenter, Renderer};
pub use tick::MonotonicClock;
