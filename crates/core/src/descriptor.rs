//! Typed value descriptors.
//!
//! A [`Descriptor`] is what configuration carries: a [`DescriptorKind`] plus a
//! raw JSON value. The compiler turns it into a [`CompiledValue`] (for things
//! that always produce a value) or a [`CompiledOutput`] (which adds the
//! pass-through and suppress outcomes available to outputs).

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::expression::Expression;
use crate::path::PropertyPath;

/// The source a descriptor draws its value from.
///
/// Serialized with the short type tags used in node configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DescriptorKind {
    #[serde(rename = "bool")]
    Bool,
    #[serde(rename = "num")]
    Num,
    #[serde(rename = "str")]
    Str,
    #[serde(rename = "json")]
    Json,
    #[serde(rename = "bin")]
    Bin,
    #[serde(rename = "msg")]
    Msg,
    #[serde(rename = "flow")]
    Flow,
    #[serde(rename = "global")]
    Global,
    #[serde(rename = "env")]
    Env,
    #[serde(rename = "jsonata")]
    Expression,
    /// Emit the inbound event unchanged.
    #[serde(rename = "pay")]
    PassThrough,
    /// Emit nothing.
    #[serde(rename = "nul")]
    Suppress,
}

impl DescriptorKind {
    pub fn tag(self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Num => "num",
            Self::Str => "str",
            Self::Json => "json",
            Self::Bin => "bin",
            Self::Msg => "msg",
            Self::Flow => "flow",
            Self::Global => "global",
            Self::Env => "env",
            Self::Expression => "jsonata",
            Self::PassThrough => "pay",
            Self::Suppress => "nul",
        }
    }
}

impl fmt::Display for DescriptorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for DescriptorKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        serde_json::from_value(Value::String(s.to_string()))
            .map_err(|_| format!("unknown descriptor type '{s}'"))
    }
}

/// Scope of a persistent context variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextScope {
    Flow,
    Global,
}

impl ContextScope {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Flow => "flow",
            Self::Global => "global",
        }
    }
}

/// A configured (kind, raw value) pair. Immutable once built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Descriptor {
    pub kind: DescriptorKind,
    pub raw: Value,
}

impl Descriptor {
    pub fn new(kind: DescriptorKind, raw: impl Into<Value>) -> Self {
        Self {
            kind,
            raw: raw.into(),
        }
    }

    /// The raw value as text. Strings are returned unquoted.
    pub fn raw_text(&self) -> String {
        match &self.raw {
            Value::String(s) => s.clone(),
            Value::Null => String::new(),
            other => other.to_string(),
        }
    }
}

/// A prepared descriptor that yields a value (or nothing) per event.
#[derive(Debug, Clone)]
pub enum CompiledValue {
    /// A literal fixed at construction (bool, num, str, json, bin).
    Literal(Value),
    /// A property of the inbound event.
    Message(PropertyPath),
    /// A persistent context variable.
    Context {
        scope: ContextScope,
        key: PropertyPath,
    },
    /// A process environment variable.
    Env(String),
    /// A pre-compiled expression evaluated against the inbound event.
    Expression(Expression),
}

impl CompiledValue {
    /// Human-readable reference used in error messages.
    pub fn describe(&self) -> String {
        match self {
            Self::Literal(value) => value.to_string(),
            Self::Message(path) => format!("msg.{path}"),
            Self::Context { scope, key } => format!("{}.{key}", scope.as_str()),
            Self::Env(name) => format!("env.{name}"),
            Self::Expression(expr) => expr.source().to_string(),
        }
    }
}

/// A prepared output descriptor.
#[derive(Debug, Clone)]
pub enum CompiledOutput {
    /// Resolve a value and emit it as `{ "payload": value }`.
    Value(CompiledValue),
    /// Emit the inbound event unchanged.
    PassThrough,
    /// Emit nothing.
    Suppress,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn kinds_parse_from_type_tags() {
        assert_eq!("num".parse::<DescriptorKind>(), Ok(DescriptorKind::Num));
        assert_eq!(
            "jsonata".parse::<DescriptorKind>(),
            Ok(DescriptorKind::Expression)
        );
        assert_eq!("pay".parse::<DescriptorKind>(), Ok(DescriptorKind::PassThrough));
        assert_eq!("nul".parse::<DescriptorKind>(), Ok(DescriptorKind::Suppress));
        assert!("date".parse::<DescriptorKind>().is_err());
    }

    #[test]
    fn tag_matches_serialized_form() {
        for kind in [
            DescriptorKind::Bool,
            DescriptorKind::Num,
            DescriptorKind::Str,
            DescriptorKind::Json,
            DescriptorKind::Bin,
            DescriptorKind::Msg,
            DescriptorKind::Flow,
            DescriptorKind::Global,
            DescriptorKind::Env,
            DescriptorKind::Expression,
            DescriptorKind::PassThrough,
            DescriptorKind::Suppress,
        ] {
            assert_eq!(serde_json::to_value(kind).unwrap(), json!(kind.tag()));
        }
    }

    #[test]
    fn raw_text_unquotes_strings() {
        assert_eq!(Descriptor::new(DescriptorKind::Msg, "payload").raw_text(), "payload");
        assert_eq!(Descriptor::new(DescriptorKind::Num, 10).raw_text(), "10");
        assert_eq!(Descriptor::new(DescriptorKind::Num, Value::Null).raw_text(), "");
    }
}
