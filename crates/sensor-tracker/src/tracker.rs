//! Sensor Tracker Implementation

use chrono::{DateTime, Utc};
use sensor_protocol::{Parameter, Reading};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Duration;
use tracing::{info, warn};

/// Tracker configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrackerConfig {
    /// Age after which the latest reading is considered stale (seconds)
    pub freshness_timeout_secs: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            freshness_timeout_secs: 30,
        }
    }
}

impl TrackerConfig {
    pub fn freshness_timeout(&self) -> Duration {
        Duration::from_secs(self.freshness_timeout_secs)
    }
}

/// Reachability of each channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SensorStatus {
    pub temperature_ok: bool,
    pub humidity_ok: bool,
    pub light_ok: bool,
    pub pressure_ok: bool,
}

impl Default for SensorStatus {
    fn default() -> Self {
        Self {
            temperature_ok: true,
            humidity_ok: true,
            light_ok: true,
            pressure_ok: true,
        }
    }
}

impl SensorStatus {
    /// Status implied by which channels a reading carries
    pub fn from_reading(reading: &Reading) -> Self {
        Self {
            temperature_ok: reading.temperature.is_some(),
            humidity_ok: reading.humidity.is_some(),
            light_ok: reading.light.is_some(),
            pressure_ok: reading.pressure.is_some(),
        }
    }

    /// Whether a channel is reachable
    pub fn is_ok(&self, parameter: Parameter) -> bool {
        match parameter {
            Parameter::Temperature => self.temperature_ok,
            Parameter::Humidity => self.humidity_ok,
            Parameter::Light => self.light_ok,
            Parameter::Pressure => self.pressure_ok,
        }
    }

    /// Channels currently failed
    pub fn failed(&self) -> BTreeSet<Parameter> {
        Parameter::ALL
            .into_iter()
            .filter(|p| !self.is_ok(*p))
            .collect()
    }

    /// Whether any channel is failed
    pub fn any_failed(&self) -> bool {
        Parameter::ALL.into_iter().any(|p| !self.is_ok(p))
    }

    /// Total device unreachability: every critical channel is failed
    pub fn all_failed(&self) -> bool {
        Parameter::ALL
            .into_iter()
            .filter(|p| p.is_critical())
            .all(|p| !self.is_ok(p))
    }
}

/// Availability tracker
///
/// The tracker is a plain value; the owning context serializes writers and
/// swaps whole instances so readers never see a half-applied update.
#[derive(Debug, Clone, Default)]
pub struct SensorTracker {
    /// Current channel status
    status: SensorStatus,
    /// Most recent reading
    latest: Option<Reading>,
}

impl SensorTracker {
    /// Create a tracker with every channel marked ok
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a reading and return the channels that failed to report
    pub fn update(&mut self, reading: &Reading) -> BTreeSet<Parameter> {
        let previous = self.status;
        self.status = SensorStatus::from_reading(reading);
        self.latest = Some(reading.clone());

        for parameter in Parameter::ALL {
            match (previous.is_ok(parameter), self.status.is_ok(parameter)) {
                (true, false) => warn!("Sensor channel {} stopped reporting", parameter),
                (false, true) => info!("Sensor channel {} recovered", parameter),
                _ => {}
            }
        }

        self.status.failed()
    }

    /// Current channel status
    pub fn status(&self) -> SensorStatus {
        self.status
    }

    /// Channels currently failed
    pub fn get_failed(&self) -> BTreeSet<Parameter> {
        self.status.failed()
    }

    /// Total device unreachability
    pub fn all_failed(&self) -> bool {
        self.status.all_failed()
    }

    /// Most recent reading, if any was ingested
    pub fn latest(&self) -> Option<&Reading> {
        self.latest.as_ref()
    }

    /// Timestamp of the most recent reading
    pub fn latest_timestamp(&self) -> Option<DateTime<Utc>> {
        self.latest.as_ref().map(|r| r.timestamp)
    }

    /// Whether the latest reading is younger than `timeout` at `now`
    pub fn is_fresh(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        match self.latest_timestamp() {
            // A reading stamped in the future counts as fresh
            Some(ts) => (now - ts).to_std().map_or(true, |age| age < timeout),
            None => false,
        }
    }
}
