//! Outbound collaborators: where messages, status updates and log lines go.
//!
//! All three are fire-and-forget. A host wires them to its own transport; the
//! events crate provides a broadcast-backed implementation of the two sinks.

use std::sync::{Arc, Mutex, PoisonError};

use serde_json::Value;

use crate::status::NodeStatus;

/// Receives messages produced by transitions.
pub trait EventSink: Send + Sync {
    fn emit(&self, message: Value);
}

/// Receives status display updates.
pub trait StatusSink: Send + Sync {
    fn publish(&self, status: NodeStatus);
}

/// Node-level log channel for errors and warnings users need to see.
pub trait Logger: Send + Sync {
    fn error(&self, message: &str);

    fn warn(&self, message: &str);
}

/// [`Logger`] that forwards to `tracing`.
#[derive(Debug, Clone, Default)]
pub struct TracingLogger {
    node: Option<String>,
}

impl TracingLogger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach the node name to every line.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            node: Some(name.into()),
        }
    }
}

impl Logger for TracingLogger {
    fn error(&self, message: &str) {
        match &self.node {
            Some(node) => tracing::error!(node = %node, "{message}"),
            None => tracing::error!("{message}"),
        }
    }

    fn warn(&self, message: &str) {
        match &self.node {
            Some(node) => tracing::warn!(node = %node, "{message}"),
            None => tracing::warn!("{message}"),
        }
    }
}

/// A log line captured by [`RecordingSink`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogLine {
    Error(String),
    Warn(String),
}

/// Collects everything it receives. Cloning shares the underlying buffers.
#[derive(Debug, Clone, Default)]
pub struct RecordingSink {
    messages: Arc<Mutex<Vec<Value>>>,
    statuses: Arc<Mutex<Vec<NodeStatus>>>,
    logs: Arc<Mutex<Vec<LogLine>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<Value> {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn statuses(&self) -> Vec<NodeStatus> {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn logs(&self) -> Vec<LogLine> {
        self.logs.lock().unwrap_or_else(PoisonError::into_inner).clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.logs()
            .into_iter()
            .filter_map(|line| match line {
                LogLine::Error(msg) => Some(msg),
                LogLine::Warn(_) => None,
            })
            .collect()
    }

    pub fn warnings(&self) -> Vec<String> {
        self.logs()
            .into_iter()
            .filter_map(|line| match line {
                LogLine::Warn(msg) => Some(msg),
                LogLine::Error(_) => None,
            })
            .collect()
    }
}

impl EventSink for RecordingSink {
    fn emit(&self, message: Value) {
        self.messages.lock().unwrap_or_else(PoisonError::into_inner).push(message);
    }
}

impl StatusSink for RecordingSink {
    fn publish(&self, status: NodeStatus) {
        self.statuses.lock().unwrap_or_else(PoisonError::into_inner).push(status);
    }
}

impl Logger for RecordingSink {
    fn error(&self, message: &str) {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogLine::Error(message.to_string()));
    }

    fn warn(&self, message: &str) {
        self.logs
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(LogLine::Warn(message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::State;
    use serde_json::json;

    #[test]
    fn recording_sink_shares_buffers_between_clones() {
        let sink = RecordingSink::new();
        let handle = sink.clone();
        sink.emit(json!({"payload": true}));
        sink.publish(NodeStatus::for_state(State::High));
        sink.warn("Output could not be calculated");
        sink.error("Property is not a number");

        assert_eq!(handle.messages(), vec![json!({"payload": true})]);
        assert_eq!(handle.statuses(), vec![NodeStatus::for_state(State::High)]);
        assert_eq!(handle.warnings(), vec!["Output could not be calculated".to_string()]);
        assert_eq!(handle.errors(), vec!["Property is not a number".to_string()]);
    }
}
