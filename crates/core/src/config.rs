//! Node configuration.
//!
//! The field names match the node-config keys (`thresholdRising`,
//! `outputHighType`, ...). Empty or missing fields fall back to the same
//! defaults an unconfigured node gets.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::descriptor::{Descriptor, DescriptorKind};
use crate::error::ConfigError;
use crate::state::State;

/// Configuration of one bang-bang node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct NodeConfig {
    /// Display name used in log lines.
    pub name: String,
    /// Where the input sample is read from (default: `payload`).
    pub property: String,
    pub property_type: String,
    pub threshold_rising: Value,
    pub threshold_rising_type: String,
    pub threshold_falling: Value,
    pub threshold_falling_type: String,
    /// Output for the rising edge (default: `true`).
    pub output_high: Value,
    pub output_high_type: String,
    /// Output for the falling edge (default: `false`).
    pub output_low: Value,
    pub output_low_type: String,
    /// `undefined`, `high` or `low` (default: `undefined`).
    pub initial_state: String,
}

impl Default for NodeConfig {
    fn default() -> Self {
        Self {
            name: String::new(),
            property: "payload".into(),
            property_type: DescriptorKind::Msg.tag().into(),
            threshold_rising: Value::Null,
            threshold_rising_type: DescriptorKind::Num.tag().into(),
            threshold_falling: Value::Null,
            threshold_falling_type: DescriptorKind::Num.tag().into(),
            output_high: Value::Bool(true),
            output_high_type: DescriptorKind::Bool.tag().into(),
            output_low: Value::Bool(false),
            output_low_type: DescriptorKind::Bool.tag().into(),
            initial_state: State::Undefined.as_str().into(),
        }
    }
}

impl NodeConfig {
    /// Parse a JSON node configuration.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a JSON node configuration from a file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_json(&text)
    }

    /// Load configuration from environment variables.
    ///
    /// `BANGBANG_CONFIG` names a JSON file and takes precedence over
    /// everything else. Otherwise each field is read from its own variable:
    ///
    /// | Env Var                            | Default     |
    /// |------------------------------------|-------------|
    /// | `BANGBANG_NAME`                    | (empty)     |
    /// | `BANGBANG_PROPERTY`                | `payload`   |
    /// | `BANGBANG_PROPERTY_TYPE`           | `msg`       |
    /// | `BANGBANG_THRESHOLD_RISING`        | (unset)     |
    /// | `BANGBANG_THRESHOLD_RISING_TYPE`   | `num`       |
    /// | `BANGBANG_THRESHOLD_FALLING`       | (unset)     |
    /// | `BANGBANG_THRESHOLD_FALLING_TYPE`  | `num`       |
    /// | `BANGBANG_OUTPUT_HIGH`             | `true`      |
    /// | `BANGBANG_OUTPUT_HIGH_TYPE`        | `bool`      |
    /// | `BANGBANG_OUTPUT_LOW`              | `false`     |
    /// | `BANGBANG_OUTPUT_LOW_TYPE`         | `bool`      |
    /// | `BANGBANG_INITIAL_STATE`           | `undefined` |
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// [`from_env`](Self::from_env) over an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        if let Some(path) = lookup("BANGBANG_CONFIG").filter(|p| !p.trim().is_empty()) {
            return Self::from_file(path.trim());
        }

        let mut config = Self::default();
        let text = |key: &str, target: &mut String| {
            if let Some(value) = lookup(key) {
                *target = value;
            }
        };
        let value = |key: &str, target: &mut Value| {
            if let Some(v) = lookup(key) {
                *target = Value::String(v);
            }
        };

        text("BANGBANG_NAME", &mut config.name);
        text("BANGBANG_PROPERTY", &mut config.property);
        text("BANGBANG_PROPERTY_TYPE", &mut config.property_type);
        value("BANGBANG_THRESHOLD_RISING", &mut config.threshold_rising);
        text("BANGBANG_THRESHOLD_RISING_TYPE", &mut config.threshold_rising_type);
        value("BANGBANG_THRESHOLD_FALLING", &mut config.threshold_falling);
        text("BANGBANG_THRESHOLD_FALLING_TYPE", &mut config.threshold_falling_type);
        value("BANGBANG_OUTPUT_HIGH", &mut config.output_high);
        text("BANGBANG_OUTPUT_HIGH_TYPE", &mut config.output_high_type);
        value("BANGBANG_OUTPUT_LOW", &mut config.output_low);
        text("BANGBANG_OUTPUT_LOW_TYPE", &mut config.output_low_type);
        text("BANGBANG_INITIAL_STATE", &mut config.initial_state);
        Ok(config)
    }

    pub fn initial_state(&self) -> Result<State, ConfigError> {
        self.initial_state.parse()
    }

    /// Descriptor for the input sample. An empty property means `payload`.
    pub fn input(&self) -> Result<Descriptor, ConfigError> {
        let property = if self.property.trim().is_empty() {
            "payload"
        } else {
            self.property.as_str()
        };
        Ok(Descriptor::new(
            kind("propertyType", &self.property_type, DescriptorKind::Msg)?,
            property,
        ))
    }

    pub fn threshold_rising(&self) -> Result<Descriptor, ConfigError> {
        Ok(Descriptor::new(
            kind("thresholdRisingType", &self.threshold_rising_type, DescriptorKind::Num)?,
            self.threshold_rising.clone(),
        ))
    }

    pub fn threshold_falling(&self) -> Result<Descriptor, ConfigError> {
        Ok(Descriptor::new(
            kind("thresholdFallingType", &self.threshold_falling_type, DescriptorKind::Num)?,
            self.threshold_falling.clone(),
        ))
    }

    pub fn output_high(&self) -> Result<Descriptor, ConfigError> {
        Ok(Descriptor::new(
            kind("outputHighType", &self.output_high_type, DescriptorKind::Bool)?,
            or_default(&self.output_high, Value::Bool(true)),
        ))
    }

    pub fn output_low(&self) -> Result<Descriptor, ConfigError> {
        Ok(Descriptor::new(
            kind("outputLowType", &self.output_low_type, DescriptorKind::Bool)?,
            or_default(&self.output_low, Value::Bool(false)),
        ))
    }
}

fn kind(field: &'static str, tag: &str, default: DescriptorKind) -> Result<DescriptorKind, ConfigError> {
    let tag = tag.trim();
    if tag.is_empty() {
        return Ok(default);
    }
    tag.parse().map_err(|_| ConfigError::UnknownKind {
        field,
        kind: tag.to_string(),
    })
}

fn or_default(value: &Value, default: Value) -> Value {
    match value {
        Value::Null => default,
        Value::String(s) if s.is_empty() => default,
        other => other.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
