//! In-process event bus backed by a `tokio::sync::broadcast` channel.
//!
//! [`EventBus`] fans node output and status updates out to any number of
//! subscribers. Nodes publish through a [`NodeEventSink`] obtained from
//! [`EventBus::sink_for`], which implements both core sink traits.

use bangbang_core::{EventSink, NodeStatus, StatusSink};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// NodeEvent
// ---------------------------------------------------------------------------

/// What a node published.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum NodeEventBody {
    /// A message sent on the output port.
    Output { message: Value },
    /// A status display update.
    Status { status: NodeStatus },
}

/// Envelope for everything a node publishes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeEvent {
    /// Name of the publishing node.
    pub node: String,

    #[serde(flatten)]
    pub body: NodeEventBody,

    /// When the event was published (UTC).
    pub timestamp: DateTime<Utc>,
}

impl NodeEvent {
    pub fn output(node: impl Into<String>, message: Value) -> Self {
        Self::new(node, NodeEventBody::Output { message })
    }

    pub fn status(node: impl Into<String>, status: NodeStatus) -> Self {
        Self::new(node, NodeEventBody::Status { status })
    }

    fn new(node: impl Into<String>, body: NodeEventBody) -> Self {
        Self {
            node: node.into(),
            body,
            timestamp: Utc::now(),
        }
    }

    /// The output message, if this is an output event.
    pub fn message(&self) -> Option<&Value> {
        match &self.body {
            NodeEventBody::Output { message } => Some(message),
            NodeEventBody::Status { .. } => None,
        }
    }
}

// ---------------------------------------------------------------------------
// EventBus
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// In-process fan-out event bus.
///
/// ```rust
/// use bangbang_events::bus::{EventBus, NodeEvent};
///
/// let bus = EventBus::default();
/// let mut rx = bus.subscribe();
///
/// bus.publish(NodeEvent::output("heater", serde_json::json!({"payload": true})));
/// ```
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<NodeEvent>,
}

impl EventBus {
    /// Create a bus with a specific channel capacity.
    ///
    /// When the buffer is full the oldest unconsumed events are dropped and
    /// slow receivers observe `RecvError::Lagged`.
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish an event to all current subscribers.
    ///
    /// With no active subscribers the event is dropped.
    pub fn publish(&self, event: NodeEvent) {
        if self.sender.send(event).is_err() {
            tracing::trace!("Dropped node event with no subscribers");
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<NodeEvent> {
        self.sender.subscribe()
    }

    /// A sink that tags everything it publishes with `node`.
    pub fn sink_for(&self, node: impl Into<String>) -> NodeEventSink {
        NodeEventSink {
            node: node.into(),
            bus: self.clone(),
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

// ---------------------------------------------------------------------------
// NodeEventSink
// ---------------------------------------------------------------------------

/// Publishes one node's output and status onto an [`EventBus`].
#[derive(Debug, Clone)]
pub struct NodeEventSink {
    node: String,
    bus: EventBus,
}

impl EventSink for NodeEventSink {
    fn emit(&self, message: Value) {
        self.bus.publish(NodeEvent::output(self.node.clone(), message));
    }
}

impl StatusSink for NodeEventSink {
    fn publish(&self, status: NodeStatus) {
        self.bus.publish(NodeEvent::status(self.node.clone(), status));
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
