//! Application Configuration
//!
//! Settings come from an optional TOML file (`coldchain.toml`, or the path in
//! `COLDCHAIN_CONFIG`) overlaid with `COLDCHAIN__`-prefixed environment
//! variables, e.g. `COLDCHAIN__POLLER__FETCH_INTERVAL_SECS=10`.

use config::{Config, ConfigError, Environment, File};
use data_validator::ValidationConfig;
use pipeline::PipelineConfig;
use poller::PollerConfig;
use sensor_protocol::DeviceConfig;
use sensor_tracker::TrackerConfig;
use serde::{Deserialize, Serialize};
use status_engine::StatusConfig;

/// How readings reach the service
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    /// The device posts readings and reads the color from the response
    #[default]
    Push,
    /// The service polls the device and drives the indicator itself
    Poll,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind_addr: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Max level: trace, debug, info, warn or error
    pub level: String,
    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

/// Complete service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub mode: RunMode,
    /// Simulate the device instead of calling it (poll mode)
    pub mock_device: bool,
    pub device: DeviceConfig,
    pub poller: PollerConfig,
    pub validation: ValidationConfig,
    pub tracker: TrackerConfig,
    pub status: StatusConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let path = std::env::var("COLDCHAIN_CONFIG").unwrap_or_else(|_| "coldchain".to_string());

        Config::builder()
            .add_source(File::with_name(&path).required(false))
            .add_source(
                Environment::with_prefix("COLDCHAIN")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?
            .try_deserialize()
    }

    /// Settings of the monitoring core
    pub fn pipeline(&self) -> PipelineConfig {
        PipelineConfig {
            validation: self.validation.clone(),
            tracker: self.tracker.clone(),
            status: self.status.clone(),
        }
    }
}
