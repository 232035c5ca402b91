//! Data Validator for Physical Plausibility
//!
//! Values a sensor cannot physically produce (humidity above 100 %, pressure
//! of 50 hPa) are rejected and the channel is treated as not having reported.

use crate::error::ValidationError;
use sensor_protocol::{Parameter, Reading};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Validation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Temperature valid range (°C)
    pub temperature_range: (f64, f64),
    /// Relative humidity valid range (%)
    pub humidity_range: (f64, f64),
    /// Illuminance valid range (lux)
    pub light_range: (f64, f64),
    /// Atmospheric pressure valid range (hPa)
    pub pressure_range: (f64, f64),
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            temperature_range: (-40.0, 80.0),
            humidity_range: (0.0, 100.0),
            light_range: (0.0, 100_000.0),
            pressure_range: (300.0, 1100.0),
        }
    }
}

impl ValidationConfig {
    /// Plausible range for a parameter
    pub fn range(&self, parameter: Parameter) -> (f64, f64) {
        match parameter {
            Parameter::Temperature => self.temperature_range,
            Parameter::Humidity => self.humidity_range,
            Parameter::Light => self.light_range,
            Parameter::Pressure => self.pressure_range,
        }
    }
}

/// Result of sanitizing a reading
#[derive(Debug, Clone)]
pub struct ValidationResult {
    /// Reading with implausible channels cleared
    pub reading: Reading,
    /// Channels that were rejected
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    /// Whether every reported value was accepted
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }

    /// Parameters that were rejected
    pub fn rejected(&self) -> Vec<Parameter> {
        self.errors.iter().map(|e| e.parameter()).collect()
    }
}

/// Plausibility validator for incoming readings
pub struct Validator {
    config: ValidationConfig,
}

impl Validator {
    /// Create a new validator with given config
    pub fn new(config: ValidationConfig) -> Self {
        Self { config }
    }

    /// Validate a single value against the parameter's plausible range
    pub fn validate_value(&self, parameter: Parameter, value: f64) -> Result<(), ValidationError> {
        if !value.is_finite() {
            return Err(ValidationError::NotFinite { parameter });
        }

        let (min, max) = self.config.range(parameter);
        if value < min || value > max {
            Err(ValidationError::Implausible {
                parameter,
                value,
                min,
                max,
            })
        } else {
            Ok(())
        }
    }

    /// Clear every implausible channel of `reading`
    pub fn sanitize(&self, mut reading: Reading) -> ValidationResult {
        let mut errors = Vec::new();

        for parameter in Parameter::ALL {
            if let Some(value) = reading.value(parameter) {
                if let Err(e) = self.validate_value(parameter, value) {
                    warn!("Rejecting reading channel: {}", e);
                    reading.set(parameter, None);
                    errors.push(e);
                }
            }
        }

        ValidationResult { reading, errors }
    }
}

impl Default for Validator {
    fn default() -> Self {
        Self::new(ValidationConfig::default())
    }
}
