use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::schema::{
    feature_index, FeatureKind, FeatureSpec, Imputation, FEATURE_COUNT, FEATURE_SCHEMA,
};
use super::vector::CustomerFeatures;
use crate::credit::domain::CustomerId;

/// Loosely typed value as delivered by upstream customer sources.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RawValue {
    Null,
    Bool(bool),
    Number(f64),
    Text(String),
}

impl RawValue {
    fn is_missing(&self) -> bool {
        match self {
            RawValue::Null => true,
            RawValue::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }
}

impl fmt::Display for RawValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RawValue::Null => write!(f, "null"),
            RawValue::Bool(value) => write!(f, "{value}"),
            RawValue::Number(value) => write!(f, "{value}"),
            RawValue::Text(value) => write!(f, "{value}"),
        }
    }
}

impl From<f64> for RawValue {
    fn from(value: f64) -> Self {
        RawValue::Number(value)
    }
}

impl From<bool> for RawValue {
    fn from(value: bool) -> Self {
        RawValue::Bool(value)
    }
}

impl From<&str> for RawValue {
    fn from(value: &str) -> Self {
        RawValue::Text(value.to_string())
    }
}

/// Customer record keyed by arbitrary source field names.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawCustomerRecord {
    pub customer_id: CustomerId,
    #[serde(default)]
    pub fields: BTreeMap<String, RawValue>,
}

impl RawCustomerRecord {
    pub fn new(customer_id: impl Into<CustomerId>) -> Self {
        Self {
            customer_id: customer_id.into(),
            fields: BTreeMap::new(),
        }
    }

    /// Builder-style field insertion.
    pub fn with(mut self, field: impl Into<String>, value: impl Into<RawValue>) -> Self {
        self.fields.insert(field.into(), value.into());
        self
    }

    pub fn set(&mut self, field: impl Into<String>, value: impl Into<RawValue>) {
        self.fields.insert(field.into(), value.into());
    }

    pub fn remove(&mut self, field: &str) -> Option<RawValue> {
        self.fields.remove(field)
    }

    fn lookup(&self, spec: &FeatureSpec) -> Option<&RawValue> {
        std::iter::once(spec.name)
            .chain(spec.aliases.iter().copied())
            .filter_map(|key| self.fields.get(key))
            .find(|value| !value.is_missing())
    }
}

/// Raised when a raw record cannot be mapped onto the feature schema.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SchemaError {
    #[error("required feature `{feature}` is missing and has no imputation rule")]
    MissingField { feature: &'static str },
    #[error("feature `{feature}` has unrecognised category `{value}` (expected one of: {expected})")]
    UnknownCategory {
        feature: &'static str,
        value: String,
        expected: String,
    },
    #[error("feature `{feature}` cannot interpret value `{value}`")]
    InvalidValue { feature: &'static str, value: String },
    #[error("feature `{feature}` value {value} is outside its valid range")]
    OutOfRange { feature: &'static str, value: f64 },
    #[error("feature `{feature}` must be a finite number")]
    NonFinite { feature: &'static str },
    #[error("`{feature}` is not part of the scoring schema")]
    UnknownFeature { feature: String },
    #[error("expected {expected} feature values, got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Maps raw customer records onto the 40-field scoring schema.
#[derive(Debug, Clone, Copy, Default)]
pub struct FeatureVectorBuilder;

impl FeatureVectorBuilder {
    pub fn new() -> Self {
        Self
    }

    pub fn build(&self, record: &RawCustomerRecord) -> Result<CustomerFeatures, SchemaError> {
        let mut values = [0.0; FEATURE_COUNT];

        for (index, spec) in FEATURE_SCHEMA.iter().enumerate() {
            values[index] = match record.lookup(spec) {
                Some(raw) => convert(spec, raw)?,
                None => impute(spec, &values)?,
            };
        }

        Ok(CustomerFeatures::from_array(values))
    }
}

fn convert(spec: &FeatureSpec, raw: &RawValue) -> Result<f64, SchemaError> {
    match spec.kind {
        FeatureKind::Numeric(domain) => {
            let value = match raw {
                RawValue::Number(value) => *value,
                RawValue::Text(text) => {
                    text.trim()
                        .parse::<f64>()
                        .map_err(|_| SchemaError::InvalidValue {
                            feature: spec.name,
                            value: text.clone(),
                        })?
                }
                other => {
                    return Err(SchemaError::InvalidValue {
                        feature: spec.name,
                        value: other.to_string(),
                    })
                }
            };
            if !value.is_finite() {
                return Err(SchemaError::NonFinite { feature: spec.name });
            }
            if !domain.contains(value) {
                return Err(SchemaError::OutOfRange {
                    feature: spec.name,
                    value,
                });
            }
            Ok(value)
        }
        FeatureKind::Flag => parse_flag(raw).ok_or_else(|| SchemaError::InvalidValue {
            feature: spec.name,
            value: raw.to_string(),
        }),
        FeatureKind::Category(labels) => {
            let normalized = match raw {
                RawValue::Text(text) => text.trim().to_ascii_lowercase(),
                other => other.to_string(),
            };
            labels
                .iter()
                .position(|label| *label == normalized)
                .map(|position| position as f64)
                .ok_or_else(|| SchemaError::UnknownCategory {
                    feature: spec.name,
                    value: normalized,
                    expected: labels.join(", "),
                })
        }
    }
}

fn parse_flag(raw: &RawValue) -> Option<f64> {
    let flag = match raw {
        RawValue::Bool(value) => *value,
        RawValue::Number(value) if *value == 0.0 => false,
        RawValue::Number(value) if *value == 1.0 => true,
        RawValue::Text(text) => match text.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "y" | "1" => true,
            "false" | "no" | "n" | "0" => false,
            _ => return None,
        },
        _ => return None,
    };
    Some(if flag { 1.0 } else { 0.0 })
}

fn impute(spec: &FeatureSpec, built: &[f64; FEATURE_COUNT]) -> Result<f64, SchemaError> {
    match spec.imputation {
        Some(Imputation::Constant(value)) => Ok(value),
        Some(Imputation::Scaled { source, factor }) => {
            let index = feature_index(source).ok_or(SchemaError::MissingField {
                feature: spec.name,
            })?;
            Ok(built[index] * factor)
        }
        None => Err(SchemaError::MissingField { feature: spec.name }),
    }
}
