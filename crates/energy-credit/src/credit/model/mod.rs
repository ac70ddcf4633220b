//! Model artifacts, the model kinds they compile into, and the engine holding the active one.

mod artifact;
mod engine;
mod interaction;
mod logistic;
mod stumps;

pub use artifact::{
    InteractionParameters, InteractionTerm, LogisticParameters, ModelArtifact, ModelLoadError,
    ModelParameters, Stump, StumpParameters, ARTIFACT_FORMAT, CURRENT_ARTIFACT_VERSION,
    DEFAULT_MINIMUM_VERSION,
};
pub use engine::{ActiveModel, ModelMetadata, ModelStatus, ScoringEngine, ScoringError};

use serde::{Deserialize, Serialize};

use super::features::{CustomerFeatures, FEATURE_COUNT};

/// Concrete parameterisation behind a loaded artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Logistic,
    BoostedStumps,
    InteractionLogistic,
}

impl ModelKind {
    pub const fn label(self) -> &'static str {
        match self {
            ModelKind::Logistic => "logistic",
            ModelKind::BoostedStumps => "boosted_stumps",
            ModelKind::InteractionLogistic => "interaction_logistic",
        }
    }
}

/// Binary default-risk model over the fixed feature schema.
pub trait CreditModel: Send + Sync {
    fn kind(&self) -> ModelKind;

    /// Pre-probability score (log-odds).
    fn raw_score(&self, features: &CustomerFeatures) -> f64;

    fn probability(&self, features: &CustomerFeatures) -> f64 {
        sigmoid(self.raw_score(features))
    }

    /// Additive attribution, when the model can decompose its raw score per feature.
    fn attribution(&self) -> Option<&dyn FeatureAttribution> {
        None
    }
}

/// Per-feature decomposition of a model's raw score.
pub trait FeatureAttribution {
    /// `baseline + impacts.sum()` must equal the model's raw score for `features`.
    fn attribute(&self, features: &CustomerFeatures) -> Attribution;
}

/// Baseline term plus one signed impact per schema feature.
#[derive(Debug, Clone, PartialEq)]
pub struct Attribution {
    pub baseline: f64,
    pub impacts: [f64; FEATURE_COUNT],
}

impl Attribution {
    pub fn reconstructed_score(&self) -> f64 {
        self.baseline + self.impacts.iter().sum::<f64>()
    }
}

/// Logistic link, stable for large magnitudes.
pub fn sigmoid(raw: f64) -> f64 {
    if raw >= 0.0 {
        1.0 / (1.0 + (-raw).exp())
    } else {
        let exp = raw.exp();
        exp / (1.0 + exp)
    }
}
