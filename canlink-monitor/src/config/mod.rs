//! Configuration loading
//!
//! The types live in `canlink_core::config`; this module reads them from
//! TOML.

mod loader;

pub use loader::load_config;
