//! Input sample and threshold resolution.
//!
//! Pure with respect to engine state: nothing here mutates the node, it only
//! produces a validated `(sample, thresholds)` pair or the reason the event
//! must be dropped.

use serde::Serialize;
use serde_json::Value;

use crate::descriptor::CompiledValue;
use crate::error::{NodeError, ParseError, ResolveError};
use crate::resolver::ValueResolver;
use crate::types::to_number;

/// The resolved rising (upper) and falling (lower) thresholds for one event.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Thresholds {
    pub rising: f64,
    pub falling: f64,
}

impl Thresholds {
    pub fn new(rising: f64, falling: f64) -> Self {
        Self { rising, falling }
    }

    /// `true` when the band has zero or negative width.
    pub fn is_degenerate(&self) -> bool {
        self.rising <= self.falling
    }
}

/// Threshold descriptors keep their preparation result: a descriptor that
/// failed to prepare is reported on every event rather than disabling the
/// node.
#[derive(Debug, Clone)]
pub struct ThresholdEvaluator {
    input: CompiledValue,
    rising: Result<CompiledValue, ParseError>,
    falling: Result<CompiledValue, ParseError>,
}

impl ThresholdEvaluator {
    pub fn new(
        input: CompiledValue,
        rising: Result<CompiledValue, ParseError>,
        falling: Result<CompiledValue, ParseError>,
    ) -> Self {
        Self {
            input,
            rising,
            falling,
        }
    }

    /// Read the input sample from the event.
    ///
    /// - `Ok(None)`: the event does not carry the property; skip it silently.
    /// - `Err(NonNumericInput)`: present but not convertible to a number.
    pub async fn read_sample(
        &self,
        resolver: &dyn ValueResolver,
        event: &Value,
    ) -> Result<Option<f64>, NodeError> {
        let value = resolver
            .resolve(&self.input, event)
            .await
            .map_err(NodeError::InvalidInput)?;
        match value {
            None => Ok(None),
            Some(value) => match to_number(&value) {
                Some(n) => Ok(Some(n)),
                None => Err(NodeError::NonNumericInput { value }),
            },
        }
    }

    /// Resolve both thresholds. The first failure aborts.
    pub async fn resolve_thresholds(
        &self,
        resolver: &dyn ValueResolver,
        event: &Value,
    ) -> Result<Thresholds, NodeError> {
        let rising = resolve_threshold(&self.rising, resolver, event).await;
        let falling = resolve_threshold(&self.falling, resolver, event).await;
        match (rising, falling) {
            (Ok(rising), Ok(falling)) => Ok(Thresholds { rising, falling }),
            (Err(err), _) | (_, Err(err)) => Err(NodeError::InvalidThreshold(err)),
        }
    }
}

async fn resolve_threshold(
    descriptor: &Result<CompiledValue, ParseError>,
    resolver: &dyn ValueResolver,
    event: &Value,
) -> Result<f64, ResolveError> {
    let compiled = descriptor.as_ref().map_err(|e| ResolveError::Prepare(e.clone()))?;
    let value = resolver
        .resolve(compiled, event)
        .await?
        .ok_or_else(|| ResolveError::UnresolvedReference(compiled.describe()))?;
    to_number(&value).ok_or(ResolveError::NotANumber(value))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
