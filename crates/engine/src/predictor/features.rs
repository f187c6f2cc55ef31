//! Feature validation and normalization
//!
//! Turns a named record into the fixed-length vector both classifiers were
//! fit on: every declared feature must be present and coercible to its
//! declared type, components are laid out in feature-spec order and then
//! standardized with the bundle's scaler. Values are never clamped.

use crate::artifacts::Scaler;
use crate::error::ValidationError;
use crate::models::{FeatureSpec, FeatureType, InferenceRecord};
use serde_json::Value;

/// Validates records against a feature spec and scales them
#[derive(Debug, Clone, Copy)]
pub struct FeatureNormalizer<'a> {
    spec: &'a [FeatureSpec],
    scaler: &'a Scaler,
}

impl<'a> FeatureNormalizer<'a> {
    pub fn new(spec: &'a [FeatureSpec], scaler: &'a Scaler) -> Self {
        debug_assert_eq!(spec.len(), scaler.len());
        Self { spec, scaler }
    }

    /// Validate, order and scale one record
    pub fn normalize(&self, record: &InferenceRecord) -> Result<Vec<f64>, ValidationError> {
        let raw = self.extract(record)?;
        let scaled = self.scaler.transform(&raw);
        // Finite raw values can still overflow once divided by a small scale
        if let Some(i) = scaled.iter().position(|x| !x.is_finite()) {
            return Err(ValidationError::OutOfRange(self.spec[i].name.clone()));
        }
        Ok(scaled)
    }

    /// Validate and order one record without scaling
    pub fn extract(&self, record: &InferenceRecord) -> Result<Vec<f64>, ValidationError> {
        if let Some(missing) = self.spec.iter().find(|f| record.get(&f.name).is_none()) {
            return Err(ValidationError::FeatureMissing(missing.name.clone()));
        }

        self.spec
            .iter()
            .map(|f| {
                let value = record
                    .get(&f.name)
                    .ok_or_else(|| ValidationError::FeatureMissing(f.name.clone()))?;
                coerce(&f.name, value, f.expected_type)
            })
            .collect()
    }
}

/// Coerce one JSON value to the numeric form of `expected`
pub fn coerce(name: &str, value: &Value, expected: FeatureType) -> Result<f64, ValidationError> {
    let mismatch = |got: String| ValidationError::TypeMismatch {
        name: name.to_string(),
        got,
        expected: expected.to_string(),
    };

    let number = match value {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok(),
        Value::Bool(b) if expected == FeatureType::Binary => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
    .ok_or_else(|| mismatch(json_type(value).to_string()))?;

    if !number.is_finite() {
        return Err(mismatch("non-finite number".to_string()));
    }

    match expected {
        FeatureType::Float => Ok(number),
        FeatureType::Integer if number.fract() == 0.0 => Ok(number),
        FeatureType::Integer => Err(mismatch(format!("fractional number {}", number))),
        FeatureType::Binary if number == 0.0 || number == 1.0 => Ok(number),
        FeatureType::Binary => Err(mismatch(format!("number {}", number))),
    }
}

fn json_type(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
