//! Device Error Types

use thiserror::Error;

/// Errors that can occur while talking to the sensor device
#[derive(Debug, Error)]
pub enum DeviceError {
    /// Transport-level failure (connection refused, DNS, TLS)
    #[error("Device transport error: {0}")]
    Transport(String),

    /// Timeout waiting for the device
    #[error("Timeout waiting for device response after {0}ms")]
    Timeout(u64),

    /// Device answered with a non-success status
    #[error("Device responded with HTTP status {0}")]
    Status(u16),

    /// Response body could not be decoded
    #[error("Invalid device payload: {0}")]
    InvalidPayload(String),

    /// Client could not be built from the given configuration
    #[error("Invalid device configuration: {0}")]
    InvalidConfig(String),
}

impl From<reqwest::Error> for DeviceError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            DeviceError::InvalidPayload(err.to_string())
        } else if let Some(status) = err.status() {
            DeviceError::Status(status.as_u16())
        } else {
            DeviceError::Transport(err.to_string())
        }
    }
}
