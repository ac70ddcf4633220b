use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::interaction::InteractionLogisticModel;
use super::logistic::LogisticModel;
use super::stumps::BoostedStumpsModel;
use super::{CreditModel, ModelKind};
use crate::credit::features::{feature_index, FEATURE_COUNT, FEATURE_SCHEMA};

/// Format tag every artifact must carry.
pub const ARTIFACT_FORMAT: &str = "paygo-credit-model";
/// Artifact layout version written by current tooling.
pub const CURRENT_ARTIFACT_VERSION: u32 = 2;
/// Oldest artifact layout the engine accepts unless configured otherwise.
pub const DEFAULT_MINIMUM_VERSION: u32 = 2;

/// Serialized, versioned model parameter set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub format: String,
    pub version: u32,
    pub model_version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
    pub feature_names: Vec<String>,
    pub model: ModelParameters,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelParameters {
    Logistic(LogisticParameters),
    BoostedStumps(StumpParameters),
    InteractionLogistic(InteractionParameters),
}

/// Standardised linear logit: `intercept + Σ coef · (x − center) / scale`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogisticParameters {
    pub intercept: f64,
    pub coefficients: Vec<f64>,
    pub centers: Vec<f64>,
    pub scales: Vec<f64>,
}

/// Gradient-boosted depth-one trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StumpParameters {
    pub base_score: f64,
    pub stumps: Vec<Stump>,
}

/// Single split: `left` when the feature is below `threshold`, `right` otherwise.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Stump {
    pub feature: String,
    pub threshold: f64,
    pub left: f64,
    pub right: f64,
    /// Fraction of training rows routed left.
    pub left_cover: f64,
}

/// Standardised linear logit with pairwise interaction terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionParameters {
    pub linear: LogisticParameters,
    pub interactions: Vec<InteractionTerm>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InteractionTerm {
    pub left: String,
    pub right: String,
    pub weight: f64,
}

/// Raised when an artifact cannot be read or fails validation.
#[derive(Debug, thiserror::Error)]
pub enum ModelLoadError {
    #[error("failed to read model artifact {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("model artifact is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("unrecognised artifact format `{0}`")]
    Format(String),
    #[error("artifact version {found} is older than the minimum supported version {minimum}")]
    UnsupportedVersion { found: u32, minimum: u32 },
    #[error("artifact feature layout does not match the scoring schema: {0}")]
    FeatureLayout(String),
    #[error("invalid model parameters: {0}")]
    Parameters(String),
}

impl ModelArtifact {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelLoadError> {
        let path = path.as_ref();
        let raw = fs::read_to_string(path).map_err(|source| ModelLoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&raw)
    }

    pub fn from_json(raw: &str) -> Result<Self, ModelLoadError> {
        Ok(serde_json::from_str(raw)?)
    }

    pub fn to_json_pretty(&self) -> Result<String, ModelLoadError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn kind(&self) -> ModelKind {
        match self.model {
            ModelParameters::Logistic(_) => ModelKind::Logistic,
            ModelParameters::BoostedStumps(_) => ModelKind::BoostedStumps,
            ModelParameters::InteractionLogistic(_) => ModelKind::InteractionLogistic,
        }
    }

    /// Check the envelope (format tag, version, feature layout).
    pub fn validate(&self, minimum_version: u32) -> Result<(), ModelLoadError> {
        if self.format != ARTIFACT_FORMAT {
            return Err(ModelLoadError::Format(self.format.clone()));
        }
        if self.version < minimum_version {
            return Err(ModelLoadError::UnsupportedVersion {
                found: self.version,
                minimum: minimum_version,
            });
        }
        if self.feature_names.len() != FEATURE_COUNT {
            return Err(ModelLoadError::FeatureLayout(format!(
                "expected {FEATURE_COUNT} features, artifact lists {}",
                self.feature_names.len()
            )));
        }
        for (position, (declared, spec)) in
            self.feature_names.iter().zip(&FEATURE_SCHEMA).enumerate()
        {
            if declared != spec.name {
                return Err(ModelLoadError::FeatureLayout(format!(
                    "position {position} is `{declared}`, schema expects `{}`",
                    spec.name
                )));
            }
        }
        Ok(())
    }

    /// Validate and turn the parameters into an executable model.
    pub fn compile(&self, minimum_version: u32) -> Result<Box<dyn CreditModel>, ModelLoadError> {
        self.validate(minimum_version)?;

        let model: Box<dyn CreditModel> = match &self.model {
            ModelParameters::Logistic(params) => Box::new(LogisticModel::compile(params)?),
            ModelParameters::BoostedStumps(params) => {
                Box::new(BoostedStumpsModel::compile(params)?)
            }
            ModelParameters::InteractionLogistic(params) => {
                Box::new(InteractionLogisticModel::compile(params)?)
            }
        };
        Ok(model)
    }
}

pub(super) fn check_finite(label: &str, value: f64) -> Result<(), ModelLoadError> {
    if value.is_finite() {
        Ok(())
    } else {
        Err(ModelLoadError::Parameters(format!("{label} must be finite")))
    }
}

pub(super) fn to_array(
    label: &str,
    values: &[f64],
) -> Result<[f64; FEATURE_COUNT], ModelLoadError> {
    if values.len() != FEATURE_COUNT {
        return Err(ModelLoadError::Parameters(format!(
            "{label} has {} entries, expected {FEATURE_COUNT}",
            values.len()
        )));
    }
    let mut array = [0.0; FEATURE_COUNT];
    for (index, (slot, value)) in array.iter_mut().zip(values).enumerate() {
        check_finite(&format!("{label}[{index}]"), *value)?;
        *slot = *value;
    }
    Ok(array)
}

pub(super) fn resolve_feature(name: &str) -> Result<usize, ModelLoadError> {
    feature_index(name)
        .ok_or_else(|| ModelLoadError::Parameters(format!("unknown feature `{name}`")))
}
