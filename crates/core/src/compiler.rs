//! Descriptor preparation.
//!
//! Literal, structured, binary and expression descriptors are parsed once at
//! construction. Everything that depends on mutable external state (event
//! fields, context variables, environment) is only validated structurally
//! here and resolved per event.

use serde_json::Value;

use crate::descriptor::{CompiledOutput, CompiledValue, ContextScope, Descriptor, DescriptorKind};
use crate::error::{ParseError, PathError};
use crate::expression::Expression;
use crate::path::PropertyPath;
use crate::types::{number_value, parse_number};

/// Prepares descriptors before the node accepts input.
pub trait DescriptorCompiler: Send + Sync {
    /// Prepare a descriptor that must yield a value.
    fn prepare_value(&self, descriptor: &Descriptor) -> Result<CompiledValue, ParseError>;

    /// Prepare an output descriptor; adds pass-through and suppress.
    fn prepare_output(&self, descriptor: &Descriptor) -> Result<CompiledOutput, ParseError> {
        match descriptor.kind {
            DescriptorKind::PassThrough => Ok(CompiledOutput::PassThrough),
            DescriptorKind::Suppress => Ok(CompiledOutput::Suppress),
            _ => self.prepare_value(descriptor).map(CompiledOutput::Value),
        }
    }
}

/// The built-in compiler for every [`DescriptorKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct StandardCompiler;

impl DescriptorCompiler for StandardCompiler {
    fn prepare_value(&self, descriptor: &Descriptor) -> Result<CompiledValue, ParseError> {
        match descriptor.kind {
            DescriptorKind::Bool => Ok(CompiledValue::Literal(prepare_bool(&descriptor.raw))),
            DescriptorKind::Num => prepare_number(&descriptor.raw).map(CompiledValue::Literal),
            DescriptorKind::Str => Ok(CompiledValue::Literal(Value::String(descriptor.raw_text()))),
            DescriptorKind::Json => prepare_json(&descriptor.raw).map(CompiledValue::Literal),
            DescriptorKind::Bin => prepare_binary(&descriptor.raw).map(CompiledValue::Literal),
            DescriptorKind::Msg => Ok(CompiledValue::Message(PropertyPath::parse(
                &descriptor.raw_text(),
            )?)),
            DescriptorKind::Flow => prepare_context(ContextScope::Flow, descriptor),
            DescriptorKind::Global => prepare_context(ContextScope::Global, descriptor),
            DescriptorKind::Env => {
                let name = descriptor.raw_text().trim().to_string();
                if name.is_empty() {
                    return Err(ParseError::InvalidPath(PathError::Empty));
                }
                Ok(CompiledValue::Env(name))
            }
            DescriptorKind::Expression => Ok(CompiledValue::Expression(Expression::compile(
                &descriptor.raw_text(),
            )?)),
            DescriptorKind::PassThrough | DescriptorKind::Suppress => {
                Err(ParseError::UnsupportedKind(descriptor.kind.tag()))
            }
        }
    }
}

fn prepare_context(scope: ContextScope, descriptor: &Descriptor) -> Result<CompiledValue, ParseError> {
    let key = PropertyPath::parse(&descriptor.raw_text())?;
    if key.head().is_none() {
        return Err(ParseError::InvalidPath(PathError::Malformed {
            path: key.as_str().to_string(),
            position: 0,
            reason: "context key must start with a variable name",
        }));
    }
    Ok(CompiledValue::Context { scope, key })
}

/// Only a case-insensitive `true` is true. Anything else is false.
fn prepare_bool(raw: &Value) -> Value {
    let truthy = match raw {
        Value::Bool(b) => *b,
        Value::String(s) => s.trim().eq_ignore_ascii_case("true"),
        _ => false,
    };
    Value::Bool(truthy)
}

fn prepare_number(raw: &Value) -> Result<Value, ParseError> {
    let n = match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => parse_number(s),
        _ => None,
    };
    n.and_then(number_value)
        .ok_or_else(|| ParseError::InvalidNumber(raw.to_string()))
}

/// Structured literals arrive either as text to parse or as an
/// already-structured JSON value.
fn prepare_json(raw: &Value) -> Result<Value, ParseError> {
    match raw {
        Value::String(text) => {
            serde_json::from_str(text).map_err(|e| ParseError::InvalidJson(e.to_string()))
        }
        Value::Null => Err(ParseError::InvalidJson("empty".to_string())),
        other => Ok(other.clone()),
    }
}

/// Binary literals are a JSON array of byte values, e.g. `[1, 2, 255]`.
fn prepare_binary(raw: &Value) -> Result<Value, ParseError> {
    let parsed = prepare_json(raw).map_err(|e| ParseError::InvalidBinary(e.to_string()))?;
    let Value::Array(items) = parsed else {
        return Err(ParseError::InvalidBinary(format!(
            "expected an array of bytes, got {parsed}"
        )));
    };
    let bytes = items
        .iter()
        .map(|item| {
            item.as_u64()
                .and_then(|b| u8::try_from(b).ok())
                .ok_or_else(|| ParseError::InvalidBinary(format!("{item} is not a byte")))
        })
        .collect::<Result<Vec<u8>, _>>()?;
    Ok(Value::Array(bytes.into_iter().map(Value::from).collect()))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
