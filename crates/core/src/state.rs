//! Detector state.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::status::StatusColor;

/// The classification of the signal.
///
/// `Undefined` is only ever an initial state: once the signal has been
/// classified the engine moves between `High` and `Low` exclusively.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum State {
    #[default]
    Undefined,
    High,
    Low,
}

impl State {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Undefined => "undefined",
            Self::High => "high",
            Self::Low => "low",
        }
    }

    /// Status colour for this state.
    pub fn color(self) -> StatusColor {
        match self {
            Self::Undefined => StatusColor::Grey,
            Self::High => StatusColor::Red,
            Self::Low => StatusColor::Blue,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for State {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "" | "undefined" => Ok(Self::Undefined),
            "high" => Ok(Self::High),
            "low" => Ok(Self::Low),
            other => Err(ConfigError::InvalidInitialState(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_undefined() {
        assert_eq!(State::default(), State::Undefined);
    }

    #[test]
    fn parses_config_strings() {
        assert_eq!("low".parse::<State>().unwrap(), State::Low);
        assert_eq!("high".parse::<State>().unwrap(), State::High);
        assert_eq!("undefined".parse::<State>().unwrap(), State::Undefined);
        assert_eq!("".parse::<State>().unwrap(), State::Undefined);
        assert!("medium".parse::<State>().is_err());
    }

    #[test]
    fn serializes_lowercase() {
        assert_eq!(serde_json::to_value(State::High).unwrap(), "high");
        let parsed: State = serde_json::from_value(serde_json::json!("low")).unwrap();
        assert_eq!(parsed, State::Low);
    }

    #[test]
    fn colour_mapping_is_fixed() {
        assert_eq!(State::Undefined.color(), StatusColor::Grey);
        assert_eq!(State::High.color(), StatusColor::Red);
        assert_eq!(State::Low.color(), StatusColor::Blue);
    }
}
