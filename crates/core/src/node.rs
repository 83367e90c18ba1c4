//! The bang-bang node: one hysteresis engine wired to its collaborators.

use std::sync::Arc;

use serde_json::Value;
use tokio::sync::Mutex;

use crate::compiler::{DescriptorCompiler, StandardCompiler};
use crate::config::NodeConfig;
use crate::error::{ConfigError, NodeError};
use crate::hysteresis::HysteresisEngine;
use crate::output::{resolve_output, Emission, OutputPair};
use crate::resolver::ValueResolver;
use crate::sink::{EventSink, Logger, StatusSink, TracingLogger};
use crate::state::State;
use crate::status::NodeStatus;
use crate::threshold::{ThresholdEvaluator, Thresholds};

/// Everything a node talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub resolver: Arc<dyn ValueResolver>,
    pub events: Arc<dyn EventSink>,
    pub status: Arc<dyn StatusSink>,
    pub logger: Arc<dyn Logger>,
}

impl Collaborators {
    /// Collaborators logging through `tracing`.
    pub fn new(
        resolver: Arc<dyn ValueResolver>,
        events: Arc<dyn EventSink>,
        status: Arc<dyn StatusSink>,
    ) -> Self {
        Self {
            resolver,
            events,
            status,
            logger: Arc::new(TracingLogger::new()),
        }
    }

    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = logger;
        self
    }
}

/// What happened to one inbound event.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// The node is invalid and ignores all input.
    Ignored,
    /// The event does not carry the input property.
    Skipped,
    /// The event was dropped with an error. State is unchanged.
    Rejected(NodeError),
    /// The sample was evaluated and the state did not change.
    Unchanged(State),
    /// The state changed.
    Transitioned { state: State, emission: Emission },
}

struct EngineState {
    engine: HysteresisEngine,
    /// Last degenerate band that was warned about, as raw bits.
    warned_band: Option<(u64, u64)>,
}

/// A two-threshold state detector.
///
/// Events are processed one at a time: the engine lock is held from reading
/// the sample until the output has been handed to the sink, so concurrent
/// callers observe transitions in lock order.
pub struct BangBangNode {
    name: String,
    evaluator: ThresholdEvaluator,
    /// `None` when an output descriptor failed to prepare.
    outputs: Option<OutputPair>,
    collaborators: Collaborators,
    inner: Mutex<EngineState>,
}

impl BangBangNode {
    pub fn new(config: &NodeConfig, collaborators: Collaborators) -> Result<Self, ConfigError> {
        Self::with_compiler(config, collaborators, &StandardCompiler)
    }

    /// Build a node, preparing every descriptor with `compiler`.
    ///
    /// Structural configuration problems (unknown type, bad initial state,
    /// unusable input property) are returned as errors. An output descriptor
    /// that fails to prepare is logged and leaves the node invalid instead.
    pub fn with_compiler(
        config: &NodeConfig,
        collaborators: Collaborators,
        compiler: &dyn DescriptorCompiler,
    ) -> Result<Self, ConfigError> {
        let initial = config.initial_state()?;
        let input = compiler
            .prepare_value(&config.input()?)
            .map_err(ConfigError::InvalidProperty)?;
        let evaluator = ThresholdEvaluator::new(
            input,
            compiler.prepare_value(&config.threshold_rising()?),
            compiler.prepare_value(&config.threshold_falling()?),
        );

        let high = compiler.prepare_output(&config.output_high()?);
        let low = compiler.prepare_output(&config.output_low()?);

        collaborators.status.publish(NodeStatus::for_state(initial));

        let logger = &collaborators.logger;
        let outputs = match (high, low) {
            (Ok(high), Ok(low)) => Some(OutputPair { high, low }),
            (high, low) => {
                if let Err(e) = high {
                    logger.error(&format!("Invalid output expression for rising edge \"{e}\""));
                }
                if let Err(e) = low {
                    logger.error(&format!("Invalid output expression for falling edge \"{e}\""));
                }
                collaborators.status.publish(NodeStatus::invalid());
                None
            }
        };

        Ok(Self {
            name: config.name.clone(),
            evaluator,
            outputs,
            collaborators,
            inner: Mutex::new(EngineState {
                engine: HysteresisEngine::new(initial),
                warned_band: None,
            }),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// `false` once an output descriptor failed to prepare.
    pub fn is_valid(&self) -> bool {
        self.outputs.is_some()
    }

    pub async fn state(&self) -> State {
        self.inner.lock().await.engine.state()
    }

    /// Re-initialize the state and publish the matching status.
    pub async fn reset(&self, initial: State) {
        let mut inner = self.inner.lock().await;
        inner.engine.reset(initial);
        inner.warned_band = None;
        self.collaborators.status.publish(NodeStatus::for_state(initial));
    }

    /// Process one inbound event.
    pub async fn apply_event(&self, event: &Value) -> Outcome {
        let Some(outputs) = &self.outputs else {
            return Outcome::Ignored;
        };
        let Collaborators {
            resolver,
            events,
            status,
            logger,
        } = &self.collaborators;

        let mut inner = self.inner.lock().await;

        let sample = match self.evaluator.read_sample(resolver.as_ref(), event).await {
            Ok(Some(sample)) => sample,
            Ok(None) => return Outcome::Skipped,
            Err(err) => return self.reject(err),
        };
        let thresholds = match self.evaluator.resolve_thresholds(resolver.as_ref(), event).await {
            Ok(thresholds) => thresholds,
            Err(err) => return self.reject(err),
        };

        tracing::debug!(
            node = %self.name,
            state = %inner.engine.state(),
            input = sample,
            rising = thresholds.rising,
            falling = thresholds.falling,
            "Evaluating sample"
        );
        self.check_band(&mut inner, thresholds);

        let Some(transition) = inner.engine.apply(sample, thresholds) else {
            return Outcome::Unchanged(inner.engine.state());
        };
        status.publish(NodeStatus::for_state(transition.to));

        let emission = resolve_output(transition.to, outputs, event, resolver.as_ref()).await;
        if let Some(msg) = emission.message() {
            events.emit(msg.clone());
        }
        match &emission {
            Emission::Unresolved => logger.warn("Output could not be calculated"),
            Emission::Failed(err) => {
                logger.error(&format!("Invalid expression used as output: \"{err}\""))
            }
            _ => {}
        }

        tracing::debug!(
            node = %self.name,
            from = %transition.from,
            to = %transition.to,
            "State changed"
        );

        Outcome::Transitioned {
            state: transition.to,
            emission,
        }
    }

    fn reject(&self, err: NodeError) -> Outcome {
        self.collaborators.logger.error(&err.to_string());
        Outcome::Rejected(err)
    }

    /// Warn once when a band of zero or negative width comes into use.
    fn check_band(&self, inner: &mut EngineState, thresholds: Thresholds) {
        if !thresholds.is_degenerate() {
            return;
        }
        let band = (thresholds.rising.to_bits(), thresholds.falling.to_bits());
        if inner.warned_band != Some(band) {
            tracing::warn!(
                node = %self.name,
                rising = thresholds.rising,
                falling = thresholds.falling,
                "Rising threshold is not above falling threshold"
            );
            inner.warned_band = Some(band);
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::{ContextStore, MemoryContext};
    use crate::descriptor::ContextScope;
    use crate::resolver::StandardResolver;
    use crate::sink::RecordingSink;
    use assert_matches::assert_matches;
    use serde_json::json;
    use std::sync::Mutex as StdMutex;
    use tracing_subscriber::layer::{Context, SubscriberExt};
    use tracing_subscriber::Layer;

    /// Collects the message of every `WARN` event.
    #[derive(Clone, Default)]
    struct WarnCapture(Arc<StdMutex<Vec<String>>>);

    impl WarnCapture {
        fn warnings(&self) -> Vec<String> {
            self.0.lock().unwrap().clone()
        }
    }

    impl<S: tracing::Subscriber> Layer<S> for WarnCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            let mut message = MessageField(String::new());
            event.record(&mut message);
            self.0.lock().unwrap().push(message.0);
        }
    }

    struct MessageField(String);

    impl tracing::field::Visit for MessageField {
        fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
            if field.name() == "message" {
                self.0 = format!("{value:?}");
            }
        }
    }

    /// Thresholds read from flow variables `th_high` and `th_low`.
    fn flow_band(context: &MemoryContext, rising: f64, falling: f64) {
        context.set(ContextScope::Flow, "th_high", json!(rising));
        context.set(ContextScope::Flow, "th_low", json!(falling));
    }

    fn flow_config() -> NodeConfig {
        NodeConfig {
            threshold_rising: json!("th_high"),
            threshold_rising_type: "flow".into(),
            threshold_falling: json!("th_low"),
            threshold_falling_type: "flow".into(),
            ..NodeConfig::default()
        }
    }

    fn node(config: NodeConfig) -> (BangBangNode, RecordingSink) {
        node_in(config, Arc::new(MemoryContext::new()))
    }

    fn node_in(config: NodeConfig, context: Arc<MemoryContext>) -> (BangBangNode, RecordingSink) {
        let sink = RecordingSink::new();
        let collaborators = Collaborators::new(
            Arc::new(StandardResolver::new(context)),
            Arc::new(sink.clone()),
            Arc::new(sink.clone()),
        )
        .with_logger(Arc::new(sink.clone()));
        (BangBangNode::new(&config, collaborators).unwrap(), sink)
    }

    fn band() -> NodeConfig {
        NodeConfig {
            threshold_rising: json!(10),
            threshold_falling: json!(8),
            ..NodeConfig::default()
        }
    }

    #[tokio::test]
    async fn construction_publishes_initial_status() {
        let (_, sink) = node(NodeConfig {
            initial_state: "low".into(),
            ..band()
        });
        assert_eq!(sink.statuses(), vec![NodeStatus::for_state(State::Low)]);
    }

    #[tokio::test]
    async fn transition_emits_and_publishes() {
        let (node, sink) = node(band());
        let outcome = node.apply_event(&json!({"payload": 11})).await;
        assert_eq!(
            outcome,
            Outcome::Transitioned {
                state: State::High,
                emission: Emission::Message(json!({"payload": true})),
            }
        );
        assert_eq!(node.state().await, State::High);
        assert_eq!(sink.messages(), vec![json!({"payload": true})]);
        assert_eq!(sink.statuses().last(), Some(&NodeStatus::for_state(State::High)));
    }

    #[tokio::test]
    async fn rejected_events_leave_state_alone() {
        let (node, sink) = node(band());
        assert_matches!(
            node.apply_event(&json!({"payload": "foo"})).await,
            Outcome::Rejected(NodeError::NonNumericInput { .. })
        );
        assert_eq!(node.apply_event(&json!({"topic": "x"})).await, Outcome::Skipped);
        assert_eq!(node.state().await, State::Undefined);
        assert_eq!(sink.errors(), vec!["Property is not a number".to_string()]);
    }

    #[tokio::test]
    async fn reset_returns_to_initial_state() {
        let (node, sink) = node(band());
        node.apply_event(&json!({"payload": 11})).await;
        node.reset(State::Undefined).await;
        assert_eq!(node.state().await, State::Undefined);
        assert_eq!(sink.statuses().last(), Some(&NodeStatus::for_state(State::Undefined)));
    }

    #[tokio::test]
    async fn invalid_output_disables_node() {
        let (node, sink) = node(NodeConfig {
            output_low: json!("{bad"),
            output_low_type: "json".into(),
            ..band()
        });
        assert!(!node.is_valid());
        assert_eq!(node.apply_event(&json!({"payload": "foo"})).await, Outcome::Ignored);
        assert_eq!(sink.errors().len(), 1);
        assert!(sink.errors()[0].starts_with("Invalid output expression for falling edge \""));
        assert_eq!(sink.statuses().last(), Some(&NodeStatus::invalid()));
    }

    // -----------------------------------------------------------------------
    // Degenerate band warnings
    // -----------------------------------------------------------------------

    const BAND_WARNING: &str = "Rising threshold is not above falling threshold";

    #[tokio::test]
    async fn inverted_band_warns_once_per_pair() {
        let capture = WarnCapture::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
        let context = Arc::new(MemoryContext::new());
        let (node, sink) = node_in(flow_config(), context.clone());

        flow_band(&context, 8.0, 10.0);
        for sample in [9, 12, 5] {
            node.apply_event(&json!({"payload": sample})).await;
        }
        assert_eq!(capture.warnings(), vec![BAND_WARNING.to_string()]);

        flow_band(&context, 7.0, 10.0);
        node.apply_event(&json!({"payload": 9})).await;
        node.apply_event(&json!({"payload": 9})).await;
        assert_eq!(capture.warnings(), vec![BAND_WARNING.to_string(); 2]);

        flow_band(&context, 10.0, 8.0);
        node.apply_event(&json!({"payload": 9})).await;
        assert_eq!(capture.warnings().len(), 2);
        assert!(sink.logs().is_empty());
    }

    #[tokio::test]
    async fn reset_rearms_band_warning() {
        let capture = WarnCapture::default();
        let _guard = tracing::subscriber::set_default(tracing_subscriber::registry().with(capture.clone()));
        let context = Arc::new(MemoryContext::new());
        let (node, _) = node_in(flow_config(), context.clone());

        flow_band(&context, 9.0, 9.0);
        node.apply_event(&json!({"payload": 9})).await;
        node.apply_event(&json!({"payload": 9})).await;
        assert_eq!(capture.warnings().len(), 1);

        node.reset(State::Undefined).await;
        node.apply_event(&json!({"payload": 9})).await;
        assert_eq!(capture.warnings(), vec![BAND_WARNING.to_string(); 2]);
    }

    #[tokio::test]
    async fn structural_config_errors_fail_construction() {
        let sink = RecordingSink::new();
        let collaborators = Collaborators::new(
            Arc::new(StandardResolver::new(Arc::new(MemoryContext::new()))),
            Arc::new(sink.clone()),
            Arc::new(sink.clone()),
        );
        let config = NodeConfig {
            property: "a..b".into(),
            ..band()
        };
        assert_matches!(
            BangBangNode::new(&config, collaborators).err(),
            Some(ConfigError::InvalidProperty(_))
        );
    }
}
