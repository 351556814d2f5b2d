//! Configuration for the setu-gs ground station
//!
//! Loaded from a TOML file. Every field has a default, so a partial file (or
//! none at all) yields a usable configuration.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Top-level application configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct AppConfig {
    pub network: NetworkConfig,
    pub store: StoreConfig,
    pub recorder: RecorderConfig,
    pub commands: CommandsConfig,
    pub logging: LoggingConfig,
}

/// Telemetry and command endpoints
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// UDP bind address for inbound telemetry
    ///
    /// Examples:
    /// - `0.0.0.0:5555` - All interfaces on port 5555
    /// - `127.0.0.1:0` - Localhost, any free port
    pub telemetry_bind: String,

    /// TCP address of the stand controller's command port
    pub command_addr: String,

    /// Connect and ack timeout for one command round trip
    pub command_timeout_ms: u64,
}

/// Live data store settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Samples kept in history
    pub history_capacity: usize,
    /// Silence after which the link is considered lost
    pub liveness_timeout_ms: u64,
    /// How often liveness is re-evaluated
    pub poll_interval_ms: u64,
}

/// Session recording
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RecorderConfig {
    /// Output directory, created if missing
    pub directory: PathBuf,
    /// File name prefix, followed by the session start time
    pub file_prefix: String,
    /// Start a session as soon as the station is up
    pub record_on_start: bool,
}

/// Command dispatcher pool
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CommandsConfig {
    pub workers: usize,
    pub queue_capacity: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            telemetry_bind: "0.0.0.0:5555".to_string(),
            command_addr: "192.168.1.10:5556".to_string(),
            command_timeout_ms: 2000,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            history_capacity: 100,
            liveness_timeout_ms: 2000,
            poll_interval_ms: 500,
        }
    }
}

impl Default for RecorderConfig {
    fn default() -> Self {
        Self {
            directory: PathBuf::from("logs"),
            file_prefix: "rocket_telemetry".to_string(),
            record_on_start: false,
        }
    }
}

impl Default for CommandsConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            queue_capacity: 16,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl NetworkConfig {
    pub fn telemetry_bind_addr(&self) -> Result<SocketAddr> {
        parse_addr("network.telemetry_bind", &self.telemetry_bind)
    }

    pub fn command_socket_addr(&self) -> Result<SocketAddr> {
        parse_addr("network.command_addr", &self.command_addr)
    }

    pub fn command_timeout(&self) -> Duration {
        Duration::from_millis(self.command_timeout_ms)
    }
}

impl StoreConfig {
    pub fn liveness_timeout(&self) -> Duration {
        Duration::from_millis(self.liveness_timeout_ms)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

fn parse_addr(field: &str, value: &str) -> Result<SocketAddr> {
    value
        .parse()
        .map_err(|_| Error::Config(format!("{}: '{}' is not an ip:port address", field, value)))
}

impl AppConfig {
    /// Load configuration from a TOML file
    ///
    /// # Example
    /// ```no_run
    /// use setu_gs::config::AppConfig;
    ///
    /// let config = AppConfig::from_file("setu-gs.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a TOML file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let contents = toml::to_string_pretty(self)?;
        fs::write(path, contents)?;
        Ok(())
    }

    /// Reject values the station cannot run with
    pub fn validate(&self) -> Result<()> {
        self.network.telemetry_bind_addr()?;
        self.network.command_socket_addr()?;

        let nonzero = [
            ("network.command_timeout_ms", self.network.command_timeout_ms),
            ("store.history_capacity", self.store.history_capacity as u64),
            ("store.liveness_timeout_ms", self.store.liveness_timeout_ms),
            ("store.poll_interval_ms", self.store.poll_interval_ms),
            ("commands.workers", self.commands.workers as u64),
            ("commands.queue_capacity", self.commands.queue_capacity as u64),
        ];
        for (field, value) in nonzero {
            if value == 0 {
                return Err(Error::Config(format!("{} must be greater than zero", field)));
            }
        }

        if self.recorder.file_prefix.is_empty() {
            return Err(Error::Config("recorder.file_prefix must not be empty".into()));
        }
        Ok(())
    }
}
