//! Monitor error type

use std::io;

use canlink_core::config::ConfigError;
use canlink_display::DisplayError;
use canlink_hal::SliceRxError;
use thiserror::Error;

use crate::source::SerialError;

/// Errors that stop the monitor
#[derive(Debug, Error)]
pub enum MonitorError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("config parse error: {0}")]
    Config(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    InvalidConfig(ConfigError),

    /// The transport ended with part of a frame buffered
    #[error("transport closed mid-frame ({buffered} bytes buffered)")]
    DecodeIncomplete { buffered: usize },

    /// The transport ended at a frame boundary
    #[error("transport closed")]
    Closed,

    #[error("display error: {0:?}")]
    Display(DisplayError),
}

impl From<ConfigError> for MonitorError {
    fn from(e: ConfigError) -> Self {
        MonitorError::InvalidConfig(e)
    }
}

impl From<DisplayError> for MonitorError {
    fn from(e: DisplayError) -> Self {
        MonitorError::Display(e)
    }
}

impl From<SerialError> for MonitorError {
    fn from(e: SerialError) -> Self {
        match e {
            SerialError::Closed => MonitorError::Closed,
            SerialError::Io(e) => MonitorError::Io(e),
        }
    }
}

impl From<SliceRxError> for MonitorError {
    fn from(_: SliceRxError) -> Self {
        MonitorError::Closed
    }
}

impl MonitorError {
    /// Map a byte source failure, taking the partially received frame into account
    pub fn from_source<E: Into<MonitorError>>(error: E, pending: usize) -> Self {
        match error.into() {
            MonitorError::Closed if pending > 0 => {
                MonitorError::DecodeIncomplete { buffered: pending }
            }
            other => other,
        }
    }

    /// True when the transport simply ended at a frame boundary
    pub fn is_clean_close(&self) -> bool {
        matches!(self, MonitorError::Closed)
    }
}
