//! Per-event value resolution.
//!
//! [`ValueResolver`] is the seam between the node and wherever values live.
//! Resolution is async so that implementations backed by remote stores can
//! be plugged in; [`StandardResolver`] resolves everything in-process.

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;

use crate::context::ContextStore;
use crate::descriptor::{CompiledValue, ContextScope};
use crate::error::ResolveError;
use crate::expression::Scope;
use crate::path::PropertyPath;

/// Resolves a compiled descriptor against an inbound event.
///
/// `Ok(None)` means the descriptor resolved to no value (an absent
/// property, an unset variable). `Err` means resolution itself failed.
#[async_trait]
pub trait ValueResolver: Send + Sync {
    async fn resolve(
        &self,
        value: &CompiledValue,
        event: &Value,
    ) -> Result<Option<Value>, ResolveError>;
}

/// In-process resolver backed by a [`ContextStore`] and the process
/// environment.
#[derive(Clone)]
pub struct StandardResolver {
    context: Arc<dyn ContextStore>,
}

impl StandardResolver {
    pub fn new(context: Arc<dyn ContextStore>) -> Self {
        Self { context }
    }

    fn resolve_now(&self, value: &CompiledValue, event: &Value) -> Result<Option<Value>, ResolveError> {
        match value {
            CompiledValue::Literal(literal) => Ok(Some(literal.clone())),
            CompiledValue::Message(path) => Ok(path.lookup(event).cloned()),
            CompiledValue::Context { scope, key } => Ok(self.context.get_path(*scope, key)),
            CompiledValue::Env(name) => Ok(Scope::env(self, name)),
            CompiledValue::Expression(expr) => expr.evaluate(event, self),
        }
    }
}

impl Scope for StandardResolver {
    fn context(&self, scope: ContextScope, key: &PropertyPath) -> Option<Value> {
        self.context.get_path(scope, key)
    }

    fn env(&self, name: &str) -> Option<Value> {
        std::env::var(name).ok().map(Value::String)
    }
}

#[async_trait]
impl ValueResolver for StandardResolver {
    async fn resolve(
        &self,
        value: &CompiledValue,
        event: &Value,
    ) -> Result<Option<Value>, ResolveError> {
        self.resolve_now(value, event)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
