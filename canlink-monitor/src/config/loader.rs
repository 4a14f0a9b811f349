//! TOML configuration loader
//!
//! Reads the configuration file given on the command line, or falls back to
//! the defaults embedded at build time.

use std::fs;
use std::path::Path;

use canlink_core::config::MonitorConfig;
use tracing::{debug, info};

use crate::error::MonitorError;

/// Default configuration, compiled in
pub const EMBEDDED_CONFIG: &str = include_str!("../../monitor.toml");

/// Parse and validate a TOML configuration
pub fn parse_config(toml_str: &str) -> Result<MonitorConfig, MonitorError> {
    let config: MonitorConfig = toml::from_str(toml_str)?;
    config.validate()?;
    Ok(config)
}

/// Load configuration from `path`, or the embedded defaults
pub fn load_config(path: Option<&Path>) -> Result<MonitorConfig, MonitorError> {
    let config = match path {
        Some(path) => {
            info!(path = %path.display(), "Loading configuration");
            let text = fs::read_to_string(path)?;
            debug!("Read {} bytes of TOML", text.len());
            parse_config(&text)?
        }
        None => {
            debug!("No config file given, using embedded defaults");
            parse_config(EMBEDDED_CONFIG)?
        }
    };

    log_config_summary(&config);
    Ok(config)
}

/// Log a summary of the loaded configuration
pub fn log_config_summary(config: &MonitorConfig) {
    info!("Configuration loaded successfully");
    debug!(
        "  serial: {} @ {} baud",
        config.serial.device, config.serial.baudrate
    );
    debug!(
        "  mode {:?}, view {:?}, format {:?}",
        config.monitor.mode, config.monitor.view, config.monitor.format
    );
    debug!(
        "  poll every {} ms, highlight for {} ms",
        config.monitor.poll_interval_ms, config.monitor.staleness_window_ms
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use canlink_core::config::{ConfigError, Radix, SourceMode, View};

    #[test]
    fn test_embedded_config_matches_defaults() {
        let config = parse_config(EMBEDDED_CONFIG).unwrap();
        assert_eq!(config, MonitorConfig::default());
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = parse_config(
            r#"
            [monitor]
            mode = "text"
            format = "decimal"
            "#,
        )
        .unwrap();

        assert_eq!(config.monitor.mode, SourceMode::Text);
        assert_eq!(config.monitor.format, Radix::Decimal);
        assert_eq!(config.monitor.view, View::Table);
        assert_eq!(config.monitor.poll_interval_ms, 100);
        assert_eq!(config.serial.device, "/dev/ttyACM0");
    }

    #[test]
    fn test_unknown_mode_rejected() {
        let result = parse_config("[monitor]\nmode = \"morse\"\n");
        assert!(matches!(result, Err(MonitorError::Config(_))));
    }

    #[test]
    fn test_zero_poll_interval_rejected() {
        let result = parse_config("[monitor]\npoll_interval_ms = 0\n");
        assert!(matches!(
            result,
            Err(MonitorError::InvalidConfig(ConfigError::ZeroPollInterval))
        ));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config(Some(Path::new("/nonexistent/monitor.toml")));
        assert!(matches!(result, Err(MonitorError::Io(_))));
    }
}
