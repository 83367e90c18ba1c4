//! Context seeding from the environment.

use bangbang_core::{ContextScope, MemoryContext};
use serde_json::Value;

/// Variable holding a JSON object of initial flow variables.
pub const FLOW_CONTEXT_VAR: &str = "BANGBANG_FLOW_CONTEXT";
/// Variable holding a JSON object of initial global variables.
pub const GLOBAL_CONTEXT_VAR: &str = "BANGBANG_GLOBAL_CONTEXT";

#[derive(Debug, thiserror::Error)]
#[error("{var} must be a JSON object: {reason}")]
pub struct ContextSeedError {
    pub var: &'static str,
    pub reason: String,
}

/// Build a [`MemoryContext`] seeded from [`FLOW_CONTEXT_VAR`] and
/// [`GLOBAL_CONTEXT_VAR`] as found by `lookup`.
pub fn seeded_context(
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<MemoryContext, ContextSeedError> {
    let context = MemoryContext::new();
    for (var, scope) in [
        (FLOW_CONTEXT_VAR, ContextScope::Flow),
        (GLOBAL_CONTEXT_VAR, ContextScope::Global),
    ] {
        let Some(text) = lookup(var).filter(|t| !t.trim().is_empty()) else {
            continue;
        };
        let values: Value = serde_json::from_str(&text).map_err(|e| ContextSeedError {
            var,
            reason: e.to_string(),
        })?;
        if !values.is_object() {
            return Err(ContextSeedError {
                var,
                reason: format!("got {values}"),
            });
        }
        context.load(scope, &values);
    }
    Ok(context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use bangbang_core::ContextStore;
    use serde_json::json;

    #[test]
    fn seeds_both_scopes() {
        let ctx = seeded_context(|var| match var {
            FLOW_CONTEXT_VAR => Some(r#"{"th_low": 8}"#.into()),
            GLOBAL_CONTEXT_VAR => Some(r#"{"th_high": 10}"#.into()),
            _ => None,
        })
        .unwrap();
        assert_eq!(ctx.get(ContextScope::Flow, "th_low"), Some(json!(8)));
        assert_eq!(ctx.get(ContextScope::Global, "th_high"), Some(json!(10)));
        assert_eq!(ctx.get(ContextScope::Flow, "th_high"), None);
    }

    #[test]
    fn unset_variables_leave_context_empty() {
        let ctx = seeded_context(|_| None).unwrap();
        assert_eq!(ctx.get(ContextScope::Flow, "anything"), None);
    }

    #[test]
    fn non_object_is_rejected() {
        let err = seeded_context(|var| (var == GLOBAL_CONTEXT_VAR).then(|| "[1, 2]".into()))
            .unwrap_err();
        assert_eq!(err.var, GLOBAL_CONTEXT_VAR);
    }
}
