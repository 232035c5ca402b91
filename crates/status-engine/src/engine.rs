//! Status Engine Implementation

use sensor_protocol::{Parameter, RangeProfile, Reading, StatusColor};
use sensor_tracker::SensorStatus;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Status engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusConfig {
    /// Fraction of the range, measured from the opposite edge, at which YELLOW turns on
    pub warning_on: f64,
    /// Fraction at which an active YELLOW turns off again
    pub warning_off: f64,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            warning_on: 0.90,
            warning_off: 0.85,
        }
    }
}

/// Everything one decision looks at
#[derive(Debug, Clone, Copy)]
pub struct DecisionInput<'a> {
    /// Pending alerts across all items
    pub pending_alerts: usize,
    /// Current channel availability
    pub status: SensorStatus,
    /// Latest reading, if any was ingested
    pub reading: Option<&'a Reading>,
    /// Range profile of the active item, if one is being monitored
    pub profile: Option<&'a RangeProfile>,
}

/// Which tier produced the color
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionReason {
    /// At least one alert is pending; lockout holds RED
    PendingAlerts,
    /// At least one sensor channel is failed
    SensorFailure,
    /// A value is close to the edge of its range
    NearThreshold,
    /// Everything within the comfortable band
    Nominal,
    /// Nothing to judge yet (no reading or no active item)
    NoData,
}

/// Outcome of one decision
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Decision {
    pub color: StatusColor,
    pub lockout: bool,
    pub reason: DecisionReason,
}

/// Status decision state machine
///
/// The current color is remembered between calls; it selects which
/// hysteresis fraction applies on the next decision.
#[derive(Debug, Clone)]
pub struct StatusEngine {
    config: StatusConfig,
    current: StatusColor,
    lockout: bool,
}

impl StatusEngine {
    /// Create an engine starting from GREEN without lockout
    pub fn new(config: StatusConfig) -> Self {
        Self {
            config,
            current: StatusColor::Green,
            lockout: false,
        }
    }

    /// Color produced by the last decision
    pub fn current(&self) -> StatusColor {
        self.current
    }

    /// Whether the alert lockout is holding RED
    pub fn lockout_active(&self) -> bool {
        self.lockout
    }

    /// Decide the color for the given inputs and remember it
    pub fn decide(&mut self, input: DecisionInput<'_>) -> Decision {
        if input.pending_alerts > 0 {
            if !self.lockout {
                warn!(
                    "{} pending alert(s): indicator locked on red until resolved",
                    input.pending_alerts
                );
            }
            self.lockout = true;
            return self.settle(StatusColor::Red, DecisionReason::PendingAlerts);
        }

        if self.lockout {
            info!("All alerts resolved: releasing indicator lockout");
            self.lockout = false;
            // Do not let pre-incident hysteresis leak into the next decision
            self.current = StatusColor::Green;
        }

        if input.status.any_failed() {
            if self.current != StatusColor::Red {
                warn!("Failed sensor channels: {:?}", input.status.failed());
            }
            return self.settle(StatusColor::Red, DecisionReason::SensorFailure);
        }

        let (reading, profile) = match (input.reading, input.profile) {
            (Some(reading), Some(profile)) => (reading, profile),
            _ => {
                debug!("No reading or no active item: defaulting to green");
                return self.settle(StatusColor::Green, DecisionReason::NoData);
            }
        };

        if self.any_near_threshold(reading, profile, &input.status) {
            self.settle(StatusColor::Yellow, DecisionReason::NearThreshold)
        } else {
            self.settle(StatusColor::Green, DecisionReason::Nominal)
        }
    }

    /// Fraction in force for the current color
    fn active_fraction(&self) -> f64 {
        if self.current == StatusColor::Yellow {
            self.config.warning_off
        } else {
            self.config.warning_on
        }
    }

    fn any_near_threshold(
        &self,
        reading: &Reading,
        profile: &RangeProfile,
        status: &SensorStatus,
    ) -> bool {
        let fraction = self.active_fraction();

        Parameter::ALL.into_iter().any(|parameter| {
            if !status.is_ok(parameter) {
                return false;
            }
            let Some(value) = reading.value(parameter) else {
                return false;
            };

            let bounds = profile.bounds(parameter);
            let warn_high = bounds.min + bounds.span() * fraction;
            let warn_low = bounds.max - bounds.span() * fraction;
            let near = value >= warn_high || value <= warn_low;
            if near {
                debug!(
                    "{} at {} is near its range edge (fraction {})",
                    parameter, value, fraction
                );
            }
            near
        })
    }

    fn settle(&mut self, color: StatusColor, reason: DecisionReason) -> Decision {
        if color != self.current {
            info!("Indicator {} -> {} ({:?})", self.current, color, reason);
        }
        self.current = color;
        Decision {
            color,
            lockout: self.lockout,
            reason,
        }
    }
}

impl Default for StatusEngine {
    fn default() -> Self {
        Self::new(StatusConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;
    use sensor_protocol::Bounds;

    fn wide_profile() -> RangeProfile {
        RangeProfile {
            temperature: Bounds::new(0.0, 100.0),
            humidity: Bounds::new(0.0, 100.0),
            light: Bounds::new(0.0, 100.0),
            pressure: Bounds::new(0.0, 100.0),
        }
    }

    fn reading(temperature: f64) -> Reading {
        Reading::new(Utc::now())
            .with(Parameter::Temperature, temperature)
            .with(Parameter::Humidity, 50.0)
            .with(Parameter::Light, 50.0)
            .with(Parameter::Pressure, 50.0)
    }

    fn decide(engine: &mut StatusEngine, reading: &Reading, pending: usize) -> Decision {
        let profile = wide_profile();
        engine.decide(DecisionInput {
            pending_alerts: pending,
            status: SensorStatus::from_reading(reading),
            reading: Some(reading),
            profile: Some(&profile),
        })
    }

    #[test]
    fn test_no_data_is_green() {
        let mut engine = StatusEngine::default();
        let decision = engine.decide(DecisionInput {
            pending_alerts: 0,
            status: SensorStatus::default(),
            reading: None,
            profile: None,
        });
        assert_eq!(decision.color, StatusColor::Green);
        assert_eq!(decision.reason, DecisionReason::NoData);
    }

    #[test]
    fn test_nominal_is_green() {
        let mut engine = StatusEngine::default();
        let decision = decide(&mut engine, &reading(50.0), 0);
        assert_eq!(decision.color, StatusColor::Green);
        assert_eq!(decision.reason, DecisionReason::Nominal);
    }

    #[test]
    fn test_hysteresis_sequence() {
        let mut engine = StatusEngine::default();

        assert_eq!(decide(&mut engine, &reading(91.0), 0).color, StatusColor::Yellow);
        assert_eq!(decide(&mut engine, &reading(86.0), 0).color, StatusColor::Yellow);
        assert_eq!(decide(&mut engine, &reading(80.0), 0).color, StatusColor::Green);
    }

    #[test]
    fn test_hysteresis_entry_needs_on_threshold() {
        let mut engine = StatusEngine::default();
        // 86 is inside the off band but GREEN uses the stricter on fraction
        assert_eq!(decide(&mut engine, &reading(86.0), 0).color, StatusColor::Green);
    }

    #[test]
    fn test_low_edge_triggers_yellow() {
        let mut engine = StatusEngine::default();
        assert_eq!(decide(&mut engine, &reading(9.0), 0).color, StatusColor::Yellow);
        assert_eq!(decide(&mut engine, &reading(14.0), 0).color, StatusColor::Yellow);
        assert_eq!(decide(&mut engine, &reading(20.0), 0).color, StatusColor::Green);
    }

    #[test]
    fn test_pending_alert_locks_red() {
        let mut engine = StatusEngine::default();
        let decision = decide(&mut engine, &reading(50.0), 1);
        assert_eq!(decision.color, StatusColor::Red);
        assert!(decision.lockout);
        assert_eq!(decision.reason, DecisionReason::PendingAlerts);

        // Healthy reading still red while the alert stays pending
        assert_eq!(decide(&mut engine, &reading(50.0), 1).color, StatusColor::Red);
    }

    #[test]
    fn test_lockout_release_resets_baseline() {
        let mut engine = StatusEngine::default();
        decide(&mut engine, &reading(91.0), 0);
        assert_eq!(engine.current(), StatusColor::Yellow);

        decide(&mut engine, &reading(99.0), 1);
        assert!(engine.lockout_active());

        // 87 would hold YELLOW, but the baseline restarts at GREEN
        let decision = decide(&mut engine, &reading(87.0), 0);
        assert!(!decision.lockout);
        assert_eq!(decision.color, StatusColor::Green);
    }

    #[test]
    fn test_sensor_failure_is_red() {
        let mut engine = StatusEngine::default();
        let mut r = reading(50.0);
        r.set(Parameter::Light, None);
        let decision = decide(&mut engine, &r, 0);
        assert_eq!(decision.color, StatusColor::Red);
        assert_eq!(decision.reason, DecisionReason::SensorFailure);
        assert!(!decision.lockout);
    }

    #[test]
    fn test_pending_outranks_sensor_failure() {
        let mut engine = StatusEngine::default();
        let decision = decide(&mut engine, &Reading::new(Utc::now()), 2);
        assert_eq!(decision.reason, DecisionReason::PendingAlerts);
    }

    #[test]
    fn test_no_active_item_is_green() {
        let mut engine = StatusEngine::default();
        let r = reading(99.0);
        let decision = engine.decide(DecisionInput {
            pending_alerts: 0,
            status: SensorStatus::from_reading(&r),
            reading: Some(&r),
            profile: None,
        });
        assert_eq!(decision.color, StatusColor::Green);
    }

    proptest! {
        #[test]
        fn prop_comfortable_band_is_green(v in 15.5f64..84.5, yellow_first in any::<bool>()) {
            let mut engine = StatusEngine::default();
            if yellow_first {
                decide(&mut engine, &reading(95.0), 0);
            }
            prop_assert_eq!(decide(&mut engine, &reading(v), 0).color, StatusColor::Green);
        }

        #[test]
        fn prop_between_thresholds_keeps_color(v in 85.5f64..89.5, yellow_first in any::<bool>()) {
            let mut engine = StatusEngine::default();
            let before = if yellow_first {
                decide(&mut engine, &reading(95.0), 0).color
            } else {
                decide(&mut engine, &reading(50.0), 0).color
            };
            prop_assert_eq!(decide(&mut engine, &reading(v), 0).color, before);
        }
    }
}
