//! A small JSONata-style query language evaluated against inbound events.
//!
//! Expressions are compiled once into a tree ([`Expression::compile`]) so
//! that syntax errors surface at configuration time. Evaluation yields
//! `Ok(None)` for an undefined result (a missing path, an unbound `$name`),
//! which is a normal outcome rather than an error.
//!
//! Supported syntax:
//!
//! | Form | Example |
//! |------|---------|
//! | Paths from the event | `payload.value`, `$.payload`, `items[0]`, `` `odd name` `` |
//! | Literals | `10`, `2.5`, `"text"`, `'text'`, `true`, `null` |
//! | Arithmetic | `+ - * / %`, unary `-` |
//! | Concatenation | `"id-" & payload.id` |
//! | Comparison | `= != < <= > >=` |
//! | Logic | `and`, `or` |
//! | Conditional | `payload > 10 ? "hot" : "cold"` |
//! | Functions | `$flowContext`, `$globalContext`, `$env`, `$number`, `$string`, `$boolean`, `$not`, `$abs`, `$round`, `$floor`, `$ceil`, `$exists` |

mod eval;
mod parse;

use serde_json::Value;

use crate::descriptor::ContextScope;
use crate::error::{ParseError, ResolveError};
use crate::path::PropertyPath;

/// External lookups available to an expression.
pub trait Scope {
    fn context(&self, scope: ContextScope, key: &PropertyPath) -> Option<Value>;

    fn env(&self, name: &str) -> Option<Value>;
}

/// A compiled expression.
#[derive(Debug, Clone)]
pub struct Expression {
    source: String,
    root: parse::Node,
}

impl Expression {
    pub fn compile(source: &str) -> Result<Self, ParseError> {
        let root = parse::parse(source)?;
        Ok(Self {
            source: source.to_string(),
            root,
        })
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn evaluate(&self, input: &Value, scope: &dyn Scope) -> Result<Option<Value>, ResolveError> {
        eval::evaluate(&self.root, input, scope)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
