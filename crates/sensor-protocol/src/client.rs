//! Sensor Device Client
//!
//! Provides async HTTP communication with the sensor/indicator device used in
//! the polling deployment.

use crate::color::IndicatorCommand;
use crate::error::DeviceError;
use crate::parameter::RawReading;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Device endpoint configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeviceConfig {
    /// Base URL of the device (e.g. "http://192.168.0.117")
    pub base_url: String,
    /// Path serving the latest sensor values
    pub data_path: String,
    /// Path accepting indicator commands
    pub indicator_path: String,
    /// Request timeout in milliseconds
    pub timeout_ms: u64,
}

impl Default for DeviceConfig {
    fn default() -> Self {
        Self {
            base_url: "http://192.168.0.117".to_string(),
            data_path: "/sensor".to_string(),
            indicator_path: "/led".to_string(),
            timeout_ms: 10_000,
        }
    }
}

/// Something that can be polled for a raw reading
pub trait ReadingSource: Send + Sync {
    /// Fetch the device's current values
    fn fetch(&self) -> impl Future<Output = Result<RawReading, DeviceError>> + Send;
}

/// Something that can display an indicator command
pub trait IndicatorDevice: Send + Sync {
    /// Deliver a command to the indicator
    fn send(&self, command: IndicatorCommand) -> impl Future<Output = Result<(), DeviceError>> + Send;
}

#[derive(Debug, Serialize)]
struct IndicatorBody {
    color: IndicatorCommand,
}

/// HTTP client for the sensor device
pub struct SensorClient {
    config: DeviceConfig,
    http: reqwest::Client,
    /// Mock mode for testing (uses simulated responses)
    mock_mode: bool,
    /// Number of mock fetches served
    mock_fetches: AtomicU64,
    /// Last command delivered in mock mode
    mock_last_command: Mutex<Option<IndicatorCommand>>,
}

impl SensorClient {
    /// Create a new device client
    pub fn new(config: DeviceConfig) -> Result<Self, DeviceError> {
        info!("Creating sensor client for device: {}", config.base_url);

        let http = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.timeout_ms))
            .build()
            .map_err(|e| DeviceError::InvalidConfig(e.to_string()))?;

        Ok(Self {
            config,
            http,
            mock_mode: false,
            mock_fetches: AtomicU64::new(0),
            mock_last_command: Mutex::new(None),
        })
    }

    /// Create a mock client for testing (no hardware required)
    pub fn mock() -> Self {
        info!("Creating mock sensor client for testing");
        Self {
            config: DeviceConfig {
                base_url: "mock".to_string(),
                timeout_ms: 100,
                ..Default::default()
            },
            http: reqwest::Client::new(),
            mock_mode: true,
            mock_fetches: AtomicU64::new(0),
            mock_last_command: Mutex::new(None),
        }
    }

    /// Whether the client simulates the device
    pub fn is_mock(&self) -> bool {
        self.mock_mode
    }

    /// Device configuration in use
    pub fn config(&self) -> &DeviceConfig {
        &self.config
    }

    /// Last command delivered while in mock mode
    pub fn last_mock_command(&self) -> Option<IndicatorCommand> {
        self.mock_last_command.lock().ok().and_then(|c| *c)
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_error(&self, err: reqwest::Error) -> DeviceError {
        if err.is_timeout() {
            DeviceError::Timeout(self.config.timeout_ms)
        } else {
            DeviceError::from(err)
        }
    }

    async fn fetch_reading(&self) -> Result<RawReading, DeviceError> {
        if self.mock_mode {
            let n = self.mock_fetches.fetch_add(1, Ordering::Relaxed);
            return Ok(Self::generate_mock_reading(n));
        }

        let url = self.url(&self.config.data_path);
        debug!("Fetching sensor values from {}", url);

        let response = self.http.get(&url).send().await.map_err(|e| self.map_error(e))?;
        let status = response.status();
        if !status.is_success() {
            warn!("Device responded with status {}", status);
            return Err(DeviceError::Status(status.as_u16()));
        }

        response.json::<RawReading>().await.map_err(|e| self.map_error(e))
    }

    async fn send_command(&self, command: IndicatorCommand) -> Result<(), DeviceError> {
        if self.mock_mode {
            if let Ok(mut last) = self.mock_last_command.lock() {
                *last = Some(command);
            }
            return Ok(());
        }

        let url = self.url(&self.config.indicator_path);
        debug!("Sending indicator command {:?} to {}", command, url);

        let response = self
            .http
            .post(&url)
            .json(&IndicatorBody { color: command })
            .send()
            .await
            .map_err(|e| self.map_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DeviceError::Status(status.as_u16()));
        }
        Ok(())
    }

    /// Generate a deterministic refrigerated reading for testing
    fn generate_mock_reading(sequence: u64) -> RawReading {
        use std::collections::hash_map::DefaultHasher;
        use std::hash::{Hash, Hasher};

        let mut hasher = DefaultHasher::new();
        sequence.hash(&mut hasher);
        let hash = hasher.finish();

        // Compressor cycle: 3.2–5.8 °C, 42–52 % RH, dim cabinet, ~870 hPa
        let fraction = (hash % 1000) as f64 / 1000.0;
        RawReading {
            temperature: Some(3.2 + fraction * 2.6),
            humidity: Some(42.0 + fraction * 10.0),
            light: Some(80.0 + (hash % 40) as f64),
            pressure: Some(865.0 + (hash % 10) as f64),
            timestamp: None,
        }
    }
}

impl ReadingSource for SensorClient {
    async fn fetch(&self) -> Result<RawReading, DeviceError> {
        self.fetch_reading().await
    }
}

impl IndicatorDevice for SensorClient {
    async fn send(&self, command: IndicatorCommand) -> Result<(), DeviceError> {
        self.send_command(command).await
    }
}
