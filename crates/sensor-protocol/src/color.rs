//! Indicator Colors

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status color decided for the indicator device
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    #[default]
    Green,
    Yellow,
    Red,
}

impl StatusColor {
    /// Lowercase wire name
    pub fn as_str(&self) -> &'static str {
        match self {
            StatusColor::Green => "green",
            StatusColor::Yellow => "yellow",
            StatusColor::Red => "red",
        }
    }

    /// Numeric encoding for gauges (0 green, 1 yellow, 2 red)
    pub fn as_gauge(&self) -> f64 {
        match self {
            StatusColor::Green => 0.0,
            StatusColor::Yellow => 1.0,
            StatusColor::Red => 2.0,
        }
    }
}

impl fmt::Display for StatusColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Command understood by the indicator device
///
/// `Off` and `Test` are operator commands; the status engine only produces colors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndicatorCommand {
    Green,
    Yellow,
    Red,
    Off,
    Test,
}

impl From<StatusColor> for IndicatorCommand {
    fn from(color: StatusColor) -> Self {
        match color {
            StatusColor::Green => IndicatorCommand::Green,
            StatusColor::Yellow => IndicatorCommand::Yellow,
            StatusColor::Red => IndicatorCommand::Red,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_color_wire_format() {
        assert_eq!(serde_json::to_string(&StatusColor::Yellow).unwrap(), "\"yellow\"");
        let color: StatusColor = serde_json::from_str("\"red\"").unwrap();
        assert_eq!(color, StatusColor::Red);
    }

    #[test]
    fn test_command_from_color() {
        assert_eq!(IndicatorCommand::from(StatusColor::Green), IndicatorCommand::Green);
        assert_eq!(serde_json::to_string(&IndicatorCommand::Off).unwrap(), "\"off\"");
    }
}
