//! Status display updates published alongside state transitions.

use serde::{Deserialize, Serialize};

use crate::state::State;

/// Fill colour of a status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusColor {
    Grey,
    Red,
    Blue,
}

/// Shape of a status indicator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StatusShape {
    /// Normal operation.
    Dot,
    /// The node is not operational.
    Ring,
}

/// A status update for display. Fire-and-forget.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NodeStatus {
    pub fill: StatusColor,
    pub shape: StatusShape,
    pub text: String,
}

impl NodeStatus {
    /// Status reflecting the given detector state.
    pub fn for_state(state: State) -> Self {
        Self {
            fill: state.color(),
            shape: StatusShape::Dot,
            text: state.as_str().to_string(),
        }
    }

    /// Status shown when an output descriptor failed to prepare.
    pub fn invalid() -> Self {
        Self {
            fill: StatusColor::Red,
            shape: StatusShape::Ring,
            text: "invalid".to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_status_uses_dot_and_state_name() {
        let status = NodeStatus::for_state(State::Low);
        assert_eq!(status.fill, StatusColor::Blue);
        assert_eq!(status.shape, StatusShape::Dot);
        assert_eq!(status.text, "low");
    }

    #[test]
    fn serializes_for_display() {
        let json = serde_json::to_value(NodeStatus::for_state(State::High)).unwrap();
        assert_eq!(json, serde_json::json!({"fill": "red", "shape": "dot", "text": "high"}));
    }
}
