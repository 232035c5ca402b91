//! Range Profile Evaluation

use sensor_protocol::{Parameter, RangeProfile, Reading};
use std::collections::BTreeSet;

/// Parameters of `reading` that lie strictly outside `profile`
///
/// Channels absent from the reading are never reported; absence is an
/// availability concern, not a range concern.
pub fn evaluate(reading: &Reading, profile: &RangeProfile) -> BTreeSet<Parameter> {
    reading
        .present()
        .filter(|(parameter, value)| !profile.bounds(*parameter).contains(*value))
        .map(|(parameter, _)| parameter)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use proptest::prelude::*;

    fn in_range_reading() -> Reading {
        Reading::new(Utc::now())
            .with(Parameter::Temperature, 5.0)
            .with(Parameter::Humidity, 45.0)
            .with(Parameter::Light, 10.0)
            .with(Parameter::Pressure, 870.0)
    }

    #[test]
    fn test_all_in_range() {
        let breached = evaluate(&in_range_reading(), &RangeProfile::refrigerated());
        assert!(breached.is_empty());
    }

    #[test]
    fn test_above_max_is_breached() {
        let reading = in_range_reading().with(Parameter::Temperature, 8.4);
        let breached = evaluate(&reading, &RangeProfile::refrigerated());
        assert_eq!(breached.into_iter().collect::<Vec<_>>(), vec![Parameter::Temperature]);
    }

    #[test]
    fn test_bounds_are_not_breaches() {
        let reading = in_range_reading()
            .with(Parameter::Temperature, 8.0)
            .with(Parameter::Humidity, 30.0);
        assert!(evaluate(&reading, &RangeProfile::refrigerated()).is_empty());
    }

    #[test]
    fn test_absent_channels_are_ignored() {
        let mut reading = in_range_reading().with(Parameter::Light, 500.0);
        reading.set(Parameter::Temperature, None);
        let breached = evaluate(&reading, &RangeProfile::refrigerated());
        assert_eq!(breached.into_iter().collect::<Vec<_>>(), vec![Parameter::Light]);
    }

    #[test]
    fn test_multiple_breaches() {
        let reading = in_range_reading()
            .with(Parameter::Temperature, 1.0)
            .with(Parameter::Humidity, 65.0);
        let breached = evaluate(&reading, &RangeProfile::refrigerated());
        assert_eq!(breached.len(), 2);
        assert!(breached.contains(&Parameter::Temperature));
        assert!(breached.contains(&Parameter::Humidity));
    }

    proptest! {
        #[test]
        fn prop_values_within_bounds_never_breach(
            t in 2.0f64..=8.0,
            h in 30.0f64..=60.0,
            l in 0.0f64..=200.0,
            p in 500.0f64..=1100.0,
        ) {
            let reading = Reading::new(Utc::now())
                .with(Parameter::Temperature, t)
                .with(Parameter::Humidity, h)
                .with(Parameter::Light, l)
                .with(Parameter::Pressure, p);
            prop_assert!(evaluate(&reading, &RangeProfile::refrigerated()).is_empty());
        }

        #[test]
        fn prop_temperature_above_max_breaches(eps in 0.001f64..100.0) {
            let reading = in_range_reading().with(Parameter::Temperature, 8.0 + eps);
            let breached = evaluate(&reading, &RangeProfile::refrigerated());
            prop_assert!(breached.contains(&Parameter::Temperature));
            prop_assert_eq!(breached.len(), 1);
        }
    }
}
