//! Configuration type definitions
//!
//! These types represent the monitor configuration. On the host they are
//! deserialized from TOML (see `canlink-monitor/monitor.toml`).

use alloc::string::String;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Default serial device of the bridge
pub const DEFAULT_DEVICE: &str = "/dev/ttyACM0";

/// Default baud rate of the bridge
pub const DEFAULT_BAUDRATE: u32 = 115_200;

/// Default display poll interval
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 100;

/// Default time a change stays highlighted
pub const DEFAULT_STALENESS_WINDOW_MS: u64 = 2_000;

/// Wire format sent by the bridge
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum SourceMode {
    /// Bit-stuffed binary frames
    #[default]
    Binary,
    /// Whitespace separated text lines
    Text,
}

/// How updates are presented
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum View {
    /// Redrawn table, one row per identifier
    #[default]
    Table,
    /// One line per update
    Log,
}

/// Number base for payload bytes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "lowercase"))]
pub enum Radix {
    #[default]
    Hex,
    Decimal,
}

/// Serial link settings
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct SerialConfig {
    /// Device path (or capture file)
    pub device: String,
    /// Baud rate; the tty must already be configured to match
    pub baudrate: u32,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: String::from(DEFAULT_DEVICE),
            baudrate: DEFAULT_BAUDRATE,
        }
    }
}

/// Pipeline and presentation settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MonitorSettings {
    /// Wire format
    pub mode: SourceMode,
    /// Presentation
    pub view: View,
    /// Payload number base (binary mode)
    pub format: Radix,
    /// Display poll interval in ms
    pub poll_interval_ms: u64,
    /// How long a change stays highlighted, in ms
    pub staleness_window_ms: u64,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            mode: SourceMode::Binary,
            view: View::Table,
            format: Radix::Hex,
            poll_interval_ms: DEFAULT_POLL_INTERVAL_MS,
            staleness_window_ms: DEFAULT_STALENESS_WINDOW_MS,
        }
    }
}

/// Complete monitor configuration
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct MonitorConfig {
    pub serial: SerialConfig,
    pub monitor: MonitorSettings,
}

/// Configuration validation errors
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// No serial device given
    EmptyDevice,
    /// Poll interval of zero would spin the display loop
    ZeroPollInterval,
    /// Baud rate of zero
    ZeroBaudrate,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            ConfigError::EmptyDevice => f.write_str("serial.device must not be empty"),
            ConfigError::ZeroPollInterval => f.write_str("monitor.poll_interval_ms must be > 0"),
            ConfigError::ZeroBaudrate => f.write_str("serial.baudrate must be > 0"),
        }
    }
}

impl MonitorConfig {
    /// Check settings that the type system cannot
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.serial.device.trim().is_empty() {
            return Err(ConfigError::EmptyDevice);
        }
        if self.serial.baudrate == 0 {
            return Err(ConfigError::ZeroBaudrate);
        }
        if self.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::ZeroPollInterval);
        }
        Ok(())
    }
}
