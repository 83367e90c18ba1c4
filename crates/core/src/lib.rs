//! Two-threshold (Schmitt trigger) state detection.
//!
//! A stream of numeric samples is classified as high or low using a rising
//! and a falling threshold. Output is produced only when the state actually
//! changes.
//!
//! - [`BangBangNode`]: the node, wiring the pieces below to its collaborators.
//! - [`ThresholdEvaluator`]: resolves the sample and thresholds per event.
//! - [`HysteresisEngine`]: owns the [`State`] and applies the transition rule.
//! - [`resolve_output`]: maps the new state onto an [`Emission`].
//! - [`ValueResolver`] / [`DescriptorCompiler`]: the seams for value lookup
//!   and descriptor preparation.

pub mod compiler;
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod expression;
pub mod hysteresis;
pub mod node;
pub mod output;
pub mod path;
pub mod resolver;
pub mod sink;
pub mod state;
pub mod status;
pub mod threshold;
pub mod types;

pub use compiler::{DescriptorCompiler, StandardCompiler};
pub use config::NodeConfig;
pub use context::{ContextStore, MemoryContext};
pub use descriptor::{CompiledOutput, CompiledValue, ContextScope, Descriptor, DescriptorKind};
pub use error::{ConfigError, NodeError, ParseError, PathError, ResolveError};
pub use expression::Expression;
pub use hysteresis::{HysteresisEngine, Transition};
pub use node::{BangBangNode, Collaborators, Outcome};
pub use output::{resolve_output, Emission, OutputPair};
pub use path::PropertyPath;
pub use resolver::{StandardResolver, ValueResolver};
pub use sink::{EventSink, Logger, RecordingSink, StatusSink, TracingLogger};
pub use state::State;
pub use status::{NodeStatus, StatusColor, StatusShape};
pub use threshold::{ThresholdEvaluator, Thresholds};
