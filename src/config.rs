//! Configuration for powerlog
//!
//! Loaded from an optional TOML file; every field has a default matching the
//! Nucleo/INA228 firmware (115200 baud, 2 s read timeout, 2 s reset settle).
//! Command-line flags override file values.

use crate::error::{Error, Result};
use crate::protocol::SessionParams;
use crate::sample::SensorLayout;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct Config {
    pub serial: SerialConfig,
    pub session: SessionConfig,
    pub output: OutputConfig,
    pub logging: LoggingConfig,
}

/// Serial link settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SerialConfig {
    /// Port path (e.g. "/dev/ttyACM0", "COM6")
    pub port: String,
    /// Baud rate
    pub baud_rate: u32,
    /// Per-read timeout in milliseconds
    pub timeout_ms: u64,
    /// Delay after opening, for boards that reset when the port opens
    pub settle_ms: u64,
}

impl SerialConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            port: default_port().to_string(),
            baud_rate: 115_200,
            timeout_ms: 2000,
            settle_ms: 2000,
        }
    }
}

#[cfg(windows)]
fn default_port() -> &'static str {
    "COM6"
}

#[cfg(not(windows))]
fn default_port() -> &'static str {
    "/dev/ttyACM0"
}

/// Sampling session settings
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Sampling rate in Hz; prompted for when unset
    pub rate_hz: Option<u32>,
    /// Duration in seconds; prompted for when unset
    pub duration_s: Option<u32>,
    /// Single or dual sensor records
    pub layout: SensorLayout,
    /// Consecutive timed-out reads before the stream is declared stalled.
    /// Unset or 0 waits forever.
    pub max_idle_reads: Option<u32>,
}

impl SessionConfig {
    /// Session parameters, if both rate and duration are configured
    pub fn params(&self) -> Option<Result<SessionParams>> {
        match (self.rate_hz, self.duration_s) {
            (Some(rate), Some(duration)) => Some(SessionParams::new(rate, duration)),
            _ => None,
        }
    }
}

/// Report outputs
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct OutputConfig {
    /// CSV file to write
    pub csv: Option<PathBuf>,
    /// Directory for SVG charts
    pub plot_dir: Option<PathBuf>,
    /// Print every record as it arrives
    pub echo: bool,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from TOML file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate TOML text
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values the device or the host cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.serial.port.is_empty() {
            return Err(Error::InvalidParameter(
                "serial.port must not be empty".to_string(),
            ));
        }
        if self.serial.baud_rate == 0 {
            return Err(Error::InvalidParameter(
                "serial.baud_rate must be positive".to_string(),
            ));
        }
        if self.serial.timeout_ms == 0 {
            return Err(Error::InvalidParameter(
                "serial.timeout_ms must be positive".to_string(),
            ));
        }
        if self.session.rate_hz == Some(0) {
            return Err(Error::InvalidParameter(
                "session.rate_hz must be positive".to_string(),
            ));
        }
        if self.session.duration_s == Some(0) {
            return Err(Error::InvalidParameter(
                "session.duration_s must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
