//! Error taxonomy for descriptor preparation, value resolution, and
//! per-event processing.

use serde_json::Value;

/// A property path that could not be parsed.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PathError {
    #[error("Property path is empty")]
    Empty,

    #[error("Invalid property path {path:?}: {reason} at position {position}")]
    Malformed {
        path: String,
        position: usize,
        reason: &'static str,
    },
}

/// A descriptor that failed to prepare at construction time.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("Invalid number: {0}")]
    InvalidNumber(String),

    #[error("Invalid JSON: {0}")]
    InvalidJson(String),

    #[error("Invalid buffer: {0}")]
    InvalidBinary(String),

    #[error(transparent)]
    InvalidPath(#[from] PathError),

    #[error("{message} at position {position}")]
    Expression { position: usize, message: String },

    #[error("Descriptor type '{0}' cannot be used here")]
    UnsupportedKind(&'static str),
}

/// A descriptor that could not be turned into a value for the current event.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ResolveError {
    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("{0}")]
    Expression(String),

    #[error("Value is not a number: {0}")]
    NotANumber(Value),

    #[error(transparent)]
    Prepare(#[from] ParseError),
}

/// Per-event failures. None of these change engine state.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum NodeError {
    #[error("Property is not a number")]
    NonNumericInput { value: Value },

    #[error("Invalid expression used as input: \"{0}\"")]
    InvalidInput(ResolveError),

    #[error("Invalid expression used as threshold: \"{0}\"")]
    InvalidThreshold(ResolveError),
}

/// Node configuration that cannot be loaded or is structurally unusable.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid node configuration: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid initial state '{0}' (expected undefined, high or low)")]
    InvalidInitialState(String),

    #[error("Unknown type '{kind}' for {field}")]
    UnknownKind { field: &'static str, kind: String },

    #[error("Invalid input property: {0}")]
    InvalidProperty(ParseError),

    #[error("Failed to read configuration file {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn non_numeric_input_message_is_stable() {
        let err = NodeError::NonNumericInput {
            value: Value::String("foo".into()),
        };
        assert_eq!(err.to_string(), "Property is not a number");
    }

    #[test]
    fn threshold_error_wraps_cause() {
        let err = NodeError::InvalidThreshold(ResolveError::UnresolvedReference(
            "flow.th_high".into(),
        ));
        assert_eq!(
            err.to_string(),
            "Invalid expression used as threshold: \"Unresolved reference: flow.th_high\""
        );
    }

    #[test]
    fn expression_parse_error_reports_position() {
        let err = ParseError::Expression {
            position: 10,
            message: "Unexpected end of expression".into(),
        };
        assert_eq!(err.to_string(), "Unexpected end of expression at position 10");
    }
}
