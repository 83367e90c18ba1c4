//! Event fan-out for bang-bang nodes.
//!
//! - [`EventBus`]: in-process publish/subscribe hub backed by
//!   `tokio::sync::broadcast`.
//! - [`NodeEvent`]: the envelope for node output and status updates.
//! - [`NodeEventSink`]: per-node adapter implementing the core sink traits.

pub mod bus;

pub use bus::{EventBus, NodeEvent, NodeEventBody, NodeEventSink};
