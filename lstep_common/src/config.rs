//! Driver configuration loading.
//!
//! This module provides the TOML configuration surface for the driver
//! workspace:
//! - `ControllerConfig` - Main configuration loaded from controller.toml
//! - `ConfigError` - Error type for configuration loading
//!
//! # TOML Example
//!
//! ```toml
//! driver = "native"
//! library_path = "/opt/lstep/liblstep64.so"
//!
//! [connection]
//! interface_type = 1
//! port = "/dev/ttyUSB0"
//! baud_rate = 57600
//!
//! [timeouts]
//! general_ms = 5000
//! move_ms = 30000
//! calibrate_ms = 120000
//! ```

use crate::consts::DEFAULT_LIBRARY_NAME;
use crate::types::{AxisVector, CommandTimeouts, ConnectionParams};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;

/// Error type for configuration loading operations.
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    /// Configuration file not found at specified path.
    #[error("Configuration file not found")]
    FileNotFound,

    /// TOML parsing failed.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// Semantic validation failed.
    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}

/// Default function for driver
fn default_driver() -> String {
    "native".to_string()
}

/// Default function for library_path
fn default_library_path() -> PathBuf {
    PathBuf::from(DEFAULT_LIBRARY_NAME)
}

/// Main configuration loaded from `controller.toml`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    /// Driver backend to use ("native" or "simulation").
    #[serde(default = "default_driver")]
    pub driver: String,

    /// Path to the vendor shared library (native driver only).
    #[serde(default = "default_library_path")]
    pub library_path: PathBuf,

    /// Vendor configuration file forwarded to the controller on connect,
    /// if any. Opaque to this layer.
    #[serde(default)]
    pub vendor_config: Option<PathBuf>,

    /// Explicit connection parameters. When omitted, the connection uses
    /// the parameters stored in `vendor_config` instead.
    #[serde(default)]
    pub connection: Option<ConnectionParams>,

    /// Command timeouts handed to the vendor library after connecting.
    #[serde(default)]
    pub timeouts: CommandTimeouts,

    /// Axis velocities applied after connecting, if any.
    #[serde(default)]
    pub velocity: Option<AxisVector>,

    /// Show the vendor command-list window while connected.
    #[serde(default)]
    pub show_command_list: bool,

    /// State persistence file (simulation driver only).
    #[serde(default)]
    pub state_file: Option<PathBuf>,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            library_path: default_library_path(),
            vendor_config: None,
            connection: Some(ConnectionParams::default()),
            timeouts: CommandTimeouts::default(),
            velocity: None,
            show_command_list: false,
            state_file: None,
        }
    }
}

impl ControllerConfig {
    /// Load and validate a configuration from a TOML file.
    ///
    /// # Errors
    /// Returns `ConfigError::FileNotFound` if the path does not exist,
    /// `ConfigError::ParseError` on I/O or TOML errors, and
    /// `ConfigError::ValidationError` if validation fails.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::FileNotFound);
        }
        tracing::debug!("Loading controller configuration from {:?}", path);
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        Self::from_toml(&content)
    }

    /// Parse and validate a configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate the configuration.
    ///
    /// # Validation Rules
    /// 1. `driver` is non-empty
    /// 2. Either `connection` or `vendor_config` is present
    /// 3. Connection port is non-empty and baud rate is positive
    /// 4. All timeouts are positive
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.driver.is_empty() {
            return Err(ConfigError::ValidationError(
                "driver must not be empty".to_string(),
            ));
        }

        if self.connection.is_none() && self.vendor_config.is_none() {
            return Err(ConfigError::ValidationError(
                "either [connection] or vendor_config must be given".to_string(),
            ));
        }

        if let Some(conn) = &self.connection {
            if conn.port.is_empty() {
                return Err(ConfigError::ValidationError(
                    "connection.port must not be empty".to_string(),
                ));
            }
            if conn.baud_rate <= 0 {
                return Err(ConfigError::ValidationError(format!(
                    "connection.baud_rate must be positive, got {}",
                    conn.baud_rate
                )));
            }
        }

        if self.timeouts.general_ms <= 0
            || self.timeouts.move_ms <= 0
            || self.timeouts.calibrate_ms <= 0
        {
            return Err(ConfigError::ValidationError(format!(
                "timeouts must be positive, got {}/{}/{} ms",
                self.timeouts.general_ms, self.timeouts.move_ms, self.timeouts.calibrate_ms
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn empty_toml_uses_defaults() {
        // An empty file fails validation only through the missing-connection
        // rule, so give it the minimal connection table.
        let config = ControllerConfig::from_toml("[connection]\n").expect("parse");
        assert_eq!(config.driver, "native");
        assert!(config.vendor_config.is_none());
        assert_eq!(config.timeouts, CommandTimeouts::default());
    }

    #[test]
    fn full_toml_parses() {
        let toml = r#"
            driver = "simulation"
            library_path = "/opt/lstep/liblstep64.so"
            vendor_config = "/etc/lstep/table.ini"
            show_command_list = true

            [connection]
            interface_type = 1
            port = "COM3"
            baud_rate = 115200
            show_protocol_window = true

            [timeouts]
            general_ms = 1000
            move_ms = 20000
            calibrate_ms = 60000

            [velocity]
            x = 10.0
            y = 10.0
        "#;
        let config = ControllerConfig::from_toml(toml).expect("parse");
        assert_eq!(config.driver, "simulation");
        let conn = config.connection.expect("connection");
        assert_eq!(conn.port, "COM3");
        assert_eq!(conn.baud_rate, 115_200);
        assert!(conn.show_protocol_window);
        assert_eq!(config.timeouts.move_ms, 20_000);
        let velocity = config.velocity.expect("velocity");
        assert_eq!(velocity.x, 10.0);
        assert_eq!(velocity.z, 0.0);
    }

    #[test]
    fn missing_connection_and_vendor_config_rejected() {
        let result = ControllerConfig::from_toml("driver = \"native\"\n");
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn invalid_baud_rate_rejected() {
        let toml = r#"
            [connection]
            baud_rate = 0
        "#;
        let result = ControllerConfig::from_toml(toml);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn negative_timeout_rejected() {
        let toml = r#"
            [connection]

            [timeouts]
            move_ms = -1
        "#;
        let result = ControllerConfig::from_toml(toml);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn load_from_file() {
        let mut file = tempfile::NamedTempFile::new().expect("temp file");
        writeln!(file, "driver = \"simulation\"\n[connection]").expect("write");
        let config = ControllerConfig::load(file.path()).expect("load");
        assert_eq!(config.driver, "simulation");
    }

    #[test]
    fn load_missing_file() {
        let result = ControllerConfig::load(Path::new("/nonexistent/controller.toml"));
        assert!(matches!(result, Err(ConfigError::FileNotFound)));
    }
}
