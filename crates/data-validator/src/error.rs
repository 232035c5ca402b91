//! Validation Error Types

use sensor_protocol::Parameter;
use thiserror::Error;

/// Errors during data validation
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    /// Value outside what the sensor can physically report
    #[error("{parameter} value {value} is out of range [{min}, {max}]")]
    Implausible {
        parameter: Parameter,
        value: f64,
        min: f64,
        max: f64,
    },

    /// NaN or infinite value
    #[error("{parameter} value is not a finite number")]
    NotFinite { parameter: Parameter },
}

impl ValidationError {
    /// Parameter the error refers to
    pub fn parameter(&self) -> Parameter {
        match self {
            ValidationError::Implausible { parameter, .. } => *parameter,
            ValidationError::NotFinite { parameter } => *parameter,
        }
    }
}
