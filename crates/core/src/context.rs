//! Persistent context variables scoped to a flow or the whole process.
//!
//! The store is shared by `Arc` between the host (which writes variables) and
//! the resolver (which reads them while processing events).

use std::collections::HashMap;
use std::sync::{PoisonError, RwLock};

use serde_json::Value;

use crate::descriptor::ContextScope;
use crate::path::{lookup_segments, PropertyPath};

/// Read/write access to flow and global variables.
pub trait ContextStore: Send + Sync {
    fn get(&self, scope: ContextScope, key: &str) -> Option<Value>;

    fn set(&self, scope: ContextScope, key: &str, value: Value);

    fn delete(&self, scope: ContextScope, key: &str) -> Option<Value>;

    /// Resolve a path whose head names a variable and whose tail navigates
    /// into the stored value, e.g. `limits.upper`.
    fn get_path(&self, scope: ContextScope, path: &PropertyPath) -> Option<Value> {
        let name = path.head()?;
        let root = self.get(scope, name)?;
        lookup_segments(&root, &path.segments()[1..]).cloned()
    }
}

/// In-memory [`ContextStore`]. Nothing is persisted across restarts.
#[derive(Debug, Default)]
pub struct MemoryContext {
    flow: RwLock<HashMap<String, Value>>,
    global: RwLock<HashMap<String, Value>>,
}

impl MemoryContext {
    pub fn new() -> Self {
        Self::default()
    }

    fn scope(&self, scope: ContextScope) -> &RwLock<HashMap<String, Value>> {
        match scope {
            ContextScope::Flow => &self.flow,
            ContextScope::Global => &self.global,
        }
    }

    /// Seed a scope from a JSON object. Non-object values are ignored.
    pub fn load(&self, scope: ContextScope, values: &Value) {
        if let Value::Object(map) = values {
            let mut vars = self.scope(scope).write().unwrap_or_else(PoisonError::into_inner);
            for (key, value) in map {
                vars.insert(key.clone(), value.clone());
            }
        }
    }
}

impl ContextStore for MemoryContext {
    fn get(&self, scope: ContextScope, key: &str) -> Option<Value> {
        self.scope(scope)
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned()
    }

    fn set(&self, scope: ContextScope, key: &str, value: Value) {
        self.scope(scope)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value);
    }

    fn delete(&self, scope: ContextScope, key: &str) -> Option<Value> {
        self.scope(scope)
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scopes_are_independent() {
        let ctx = MemoryContext::new();
        ctx.set(ContextScope::Flow, "th_low", json!(8));
        assert_eq!(ctx.get(ContextScope::Flow, "th_low"), Some(json!(8)));
        assert_eq!(ctx.get(ContextScope::Global, "th_low"), None);
    }

    #[test]
    fn delete_returns_previous_value() {
        let ctx = MemoryContext::new();
        ctx.set(ContextScope::Global, "var1", json!("val1"));
        assert_eq!(ctx.delete(ContextScope::Global, "var1"), Some(json!("val1")));
        assert_eq!(ctx.get(ContextScope::Global, "var1"), None);
    }

    #[test]
    fn get_path_navigates_into_stored_objects() {
        let ctx = MemoryContext::new();
        ctx.set(ContextScope::Flow, "limits", json!({"upper": 10, "list": [4, 5]}));

        let path = PropertyPath::parse("limits.upper").unwrap();
        assert_eq!(ctx.get_path(ContextScope::Flow, &path), Some(json!(10)));

        let path = PropertyPath::parse("limits.list[1]").unwrap();
        assert_eq!(ctx.get_path(ContextScope::Flow, &path), Some(json!(5)));

        let path = PropertyPath::parse("limits.missing").unwrap();
        assert_eq!(ctx.get_path(ContextScope::Flow, &path), None);
    }

    #[test]
    fn load_seeds_from_object() {
        let ctx = MemoryContext::new();
        ctx.load(ContextScope::Global, &json!({"a": 1, "b": "two"}));
        assert_eq!(ctx.get(ContextScope::Global, "a"), Some(json!(1)));
        assert_eq!(ctx.get(ContextScope::Global, "b"), Some(json!("two")));
    }
}
