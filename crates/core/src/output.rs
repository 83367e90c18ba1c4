//! Output resolution for a committed transition.

use serde_json::{json, Value};

use crate::descriptor::CompiledOutput;
use crate::error::ResolveError;
use crate::resolver::ValueResolver;
use crate::state::State;

/// What a transition produced on the output port.
#[derive(Debug, Clone, PartialEq)]
pub enum Emission {
    /// A fresh message `{ "payload": value }`.
    Message(Value),
    /// The inbound event, unchanged.
    PassThrough(Value),
    /// The descriptor asked for nothing to be sent.
    Suppressed,
    /// The descriptor resolved to no value. Warned, nothing sent.
    Unresolved,
    /// Resolution failed outright. Logged, nothing sent.
    Failed(ResolveError),
}

impl Emission {
    /// The message to hand to the event sink, if any.
    pub fn message(&self) -> Option<&Value> {
        match self {
            Self::Message(msg) | Self::PassThrough(msg) => Some(msg),
            _ => None,
        }
    }
}

/// Prepared outputs for the rising (`high`) and falling (`low`) edges.
#[derive(Debug, Clone)]
pub struct OutputPair {
    pub high: CompiledOutput,
    pub low: CompiledOutput,
}

impl OutputPair {
    pub fn for_state(&self, state: State) -> Option<&CompiledOutput> {
        match state {
            State::High => Some(&self.high),
            State::Low => Some(&self.low),
            State::Undefined => None,
        }
    }
}

/// Resolve the output for the state just entered.
pub async fn resolve_output(
    state: State,
    outputs: &OutputPair,
    event: &Value,
    resolver: &dyn ValueResolver,
) -> Emission {
    let Some(output) = outputs.for_state(state) else {
        return Emission::Suppressed;
    };
    match output {
        CompiledOutput::PassThrough => Emission::PassThrough(event.clone()),
        CompiledOutput::Suppress => Emission::Suppressed,
        CompiledOutput::Value(value) => match resolver.resolve(value, event).await {
            Ok(Some(payload)) => Emission::Message(json!({ "payload": payload })),
            Ok(None) => Emission::Unresolved,
            Err(err) => Emission::Failed(err),
        },
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::compiler::{DescriptorCompiler, StandardCompiler};
    use crate::context::MemoryContext;
    use crate::descriptor::{Descriptor, DescriptorKind};
    use crate::resolver::StandardResolver;
    use assert_matches::assert_matches;

    fn output(kind: DescriptorKind, raw: Value) -> CompiledOutput {
        StandardCompiler
            .prepare_output(&Descriptor::new(kind, raw))
            .unwrap()
    }

    fn pair(high: (DescriptorKind, Value), low: (DescriptorKind, Value)) -> OutputPair {
        OutputPair {
            high: output(high.0, high.1),
            low: output(low.0, low.1),
        }
    }

    fn resolver() -> StandardResolver {
        StandardResolver::new(Arc::new(MemoryContext::new()))
    }

    #[tokio::test]
    async fn literal_outputs_wrap_payload() {
        let outputs = pair((DescriptorKind::Bool, json!(true)), (DescriptorKind::Num, json!("11")));
        let r = resolver();
        assert_eq!(
            resolve_output(State::High, &outputs, &json!({}), &r).await,
            Emission::Message(json!({"payload": true}))
        );
        assert_eq!(
            resolve_output(State::Low, &outputs, &json!({}), &r).await,
            Emission::Message(json!({"payload": 11}))
        );
    }

    #[tokio::test]
    async fn message_output_reads_inbound_event() {
        let outputs = pair((DescriptorKind::Msg, json!("prop1")), (DescriptorKind::Msg, json!("prop2")));
        let event = json!({"payload": 11, "prop1": "val1"});
        let r = resolver();
        assert_eq!(
            resolve_output(State::High, &outputs, &event, &r).await,
            Emission::Message(json!({"payload": "val1"}))
        );
        assert_eq!(resolve_output(State::Low, &outputs, &event, &r).await, Emission::Unresolved);
    }

    #[tokio::test]
    async fn pass_through_and_suppress() {
        let outputs = pair((DescriptorKind::PassThrough, Value::Null), (DescriptorKind::Suppress, Value::Null));
        let event = json!({"payload": 11, "topic": "t"});
        let r = resolver();
        let high = resolve_output(State::High, &outputs, &event, &r).await;
        assert_eq!(high, Emission::PassThrough(event.clone()));
        assert_eq!(high.message(), Some(&event));
        let low = resolve_output(State::Low, &outputs, &event, &r).await;
        assert_eq!(low, Emission::Suppressed);
        assert_eq!(low.message(), None);
    }

    #[tokio::test]
    async fn expression_failures_are_reported() {
        let outputs = pair(
            (DescriptorKind::Expression, json!("payload * 2")),
            (DescriptorKind::Expression, json!("payload + 1")),
        );
        let r = resolver();
        assert_eq!(
            resolve_output(State::High, &outputs, &json!({"payload": 11}), &r).await,
            Emission::Message(json!({"payload": 22}))
        );
        assert_matches!(
            resolve_output(State::Low, &outputs, &json!({"payload": "x"}), &r).await,
            Emission::Failed(ResolveError::Expression(_))
        );
    }

    #[tokio::test]
    async fn undefined_state_emits_nothing() {
        let outputs = pair((DescriptorKind::Bool, json!(true)), (DescriptorKind::Bool, json!(false)));
        assert_eq!(
            resolve_output(State::Undefined, &outputs, &json!({}), &resolver()).await,
            Emission::Suppressed
        );
    }
}
