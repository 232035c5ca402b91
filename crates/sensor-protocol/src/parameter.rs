//! Monitored Parameters and Readings
//!
//! Defines the four environmental channels reported by the device and the
//! reading tuple that carries one optional value per channel.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Environmental parameters reported by the sensor device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Parameter {
    /// Ambient temperature (°C)
    Temperature,
    /// Relative humidity (%)
    Humidity,
    /// Illuminance (lux)
    Light,
    /// Atmospheric pressure (hPa)
    Pressure,
}

impl Parameter {
    /// All parameters in reporting order
    pub const ALL: [Parameter; 4] = [
        Parameter::Temperature,
        Parameter::Humidity,
        Parameter::Light,
        Parameter::Pressure,
    ];

    /// Stable lowercase name
    pub fn name(&self) -> &'static str {
        match self {
            Parameter::Temperature => "temperature",
            Parameter::Humidity => "humidity",
            Parameter::Light => "light",
            Parameter::Pressure => "pressure",
        }
    }

    /// Measurement unit
    pub fn unit(&self) -> &'static str {
        match self {
            Parameter::Temperature => "°C",
            Parameter::Humidity => "%",
            Parameter::Light => "lux",
            Parameter::Pressure => "hPa",
        }
    }

    /// Whether losing this channel counts toward total device unreachability
    pub fn is_critical(&self) -> bool {
        matches!(self, Parameter::Temperature | Parameter::Humidity)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// A timestamped set of channel values; `None` means the channel did not report
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// When the reading was taken (or received, if the device sent no timestamp)
    pub timestamp: DateTime<Utc>,
    pub temperature: Option<f64>,
    pub humidity: Option<f64>,
    pub light: Option<f64>,
    pub pressure: Option<f64>,
}

impl Reading {
    /// Create a reading with no channel values
    pub fn new(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp,
            temperature: None,
            humidity: None,
            light: None,
            pressure: None,
        }
    }

    /// Builder-style setter for one channel
    pub fn with(mut self, parameter: Parameter, value: f64) -> Self {
        self.set(parameter, Some(value));
        self
    }

    /// Get the value of a channel
    pub fn value(&self, parameter: Parameter) -> Option<f64> {
        match parameter {
            Parameter::Temperature => self.temperature,
            Parameter::Humidity => self.humidity,
            Parameter::Light => self.light,
            Parameter::Pressure => self.pressure,
        }
    }

    /// Set or clear the value of a channel
    pub fn set(&mut self, parameter: Parameter, value: Option<f64>) {
        let slot = match parameter {
            Parameter::Temperature => &mut self.temperature,
            Parameter::Humidity => &mut self.humidity,
            Parameter::Light => &mut self.light,
            Parameter::Pressure => &mut self.pressure,
        };
        *slot = value;
    }

    /// Iterate over the channels that reported a value
    pub fn present(&self) -> impl Iterator<Item = (Parameter, f64)> + '_ {
        Parameter::ALL
            .into_iter()
            .filter_map(|p| self.value(p).map(|v| (p, v)))
    }

    /// True if no channel reported
    pub fn is_empty(&self) -> bool {
        self.present().next().is_none()
    }
}

/// Reading as it arrives on the wire from the device
///
/// Older firmware reports Spanish field names; both spellings are accepted.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawReading {
    #[serde(default, alias = "temperatura")]
    pub temperature: Option<f64>,
    #[serde(default, alias = "humedad")]
    pub humidity: Option<f64>,
    #[serde(default, alias = "lux")]
    pub light: Option<f64>,
    #[serde(default, alias = "presion")]
    pub pressure: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

impl RawReading {
    /// Convert into a reading, stamping it with `received_at` when the device sent no time
    pub fn into_reading(self, received_at: DateTime<Utc>) -> Reading {
        Reading {
            timestamp: self.timestamp.unwrap_or(received_at),
            temperature: self.temperature,
            humidity: self.humidity,
            light: self.light,
            pressure: self.pressure,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reading_accessors() {
        let reading = Reading::new(Utc::now())
            .with(Parameter::Temperature, 5.2)
            .with(Parameter::Pressure, 1013.0);

        assert_eq!(reading.value(Parameter::Temperature), Some(5.2));
        assert_eq!(reading.value(Parameter::Humidity), None);

        let present: Vec<_> = reading.present().map(|(p, _)| p).collect();
        assert_eq!(present, vec![Parameter::Temperature, Parameter::Pressure]);
        assert!(!reading.is_empty());
        assert!(Reading::new(Utc::now()).is_empty());
    }

    #[test]
    fn test_raw_reading_accepts_legacy_keys() {
        let raw: RawReading = serde_json::from_str(
            r#"{"temperatura": 5.2, "humedad": 65, "lux": 150, "presion": 1013}"#,
        )
        .unwrap();
        assert_eq!(raw.temperature, Some(5.2));
        assert_eq!(raw.humidity, Some(65.0));
        assert_eq!(raw.light, Some(150.0));
        assert_eq!(raw.pressure, Some(1013.0));
    }

    #[test]
    fn test_raw_reading_missing_fields() {
        let raw: RawReading = serde_json::from_str(r#"{"temperature": 4.0, "humidity": null}"#).unwrap();
        let now = Utc::now();
        let reading = raw.into_reading(now);
        assert_eq!(reading.timestamp, now);
        assert_eq!(reading.temperature, Some(4.0));
        assert!(reading.humidity.is_none());
        assert!(reading.light.is_none());
    }

    #[test]
    fn test_critical_channels() {
        let critical: Vec<_> = Parameter::ALL.into_iter().filter(|p| p.is_critical()).collect();
        assert_eq!(critical, vec![Parameter::Temperature, Parameter::Humidity]);
    }
}
