//! Configuration type definitions
//!
//! Parsing lives in the host binary; these types only describe the
//! settings and their defaults.

pub mod types;

pub use types::{ConfigError, MonitorConfig, MonitorSettings, Radix, SerialConfig, SourceMode, View};
