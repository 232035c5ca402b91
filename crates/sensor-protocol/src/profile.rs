//! Range Profiles

use crate::parameter::Parameter;
use serde::{Deserialize, Serialize};

/// Identifier of a monitored item
pub type ItemId = i64;

/// Closed interval `[min, max]` for one parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Bounds {
    pub min: f64,
    pub max: f64,
}

impl Bounds {
    pub fn new(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    /// Whether `value` lies within the closed interval
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Width of the interval
    pub fn span(&self) -> f64 {
        self.max - self.min
    }
}

/// Safe storage envelope: one [`Bounds`] per parameter
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RangeProfile {
    pub temperature: Bounds,
    pub humidity: Bounds,
    pub light: Bounds,
    pub pressure: Bounds,
}

impl RangeProfile {
    /// Bounds for one parameter
    pub fn bounds(&self, parameter: Parameter) -> Bounds {
        match parameter {
            Parameter::Temperature => self.temperature,
            Parameter::Humidity => self.humidity,
            Parameter::Light => self.light,
            Parameter::Pressure => self.pressure,
        }
    }

    /// Typical refrigerated pharmaceutical profile (2–8 °C)
    pub fn refrigerated() -> Self {
        Self {
            temperature: Bounds::new(2.0, 8.0),
            humidity: Bounds::new(30.0, 60.0),
            light: Bounds::new(0.0, 200.0),
            pressure: Bounds::new(500.0, 1100.0),
        }
    }
}
