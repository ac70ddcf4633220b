use std::cmp::Ordering;

use serde::Serialize;

use super::domain::FactorImpact;
use super::features::{CustomerFeatures, FEATURE_COUNT, FEATURE_SCHEMA};
use super::model::{CreditModel, ModelKind};

/// Number of factors reported when no explicit top-K is configured.
pub const DEFAULT_TOP_K: usize = 5;

/// Maximum tolerated gap between a supplied probability and the model's own.
const PROBABILITY_TOLERANCE: f64 = 1e-9;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ExplanationError {
    #[error("{} models do not support feature attribution", kind.label())]
    Unsupported { kind: ModelKind },
    #[error("probability {supplied} does not match the model output {expected}")]
    ProbabilityMismatch { supplied: f64, expected: f64 },
}

/// Full additive decomposition of one prediction.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Explanation {
    pub baseline: f64,
    pub raw_score: f64,
    /// One entry per schema feature, in schema order.
    pub impacts: Vec<FactorImpact>,
    /// Largest absolute impacts first.
    pub top_factors: Vec<FactorImpact>,
}

impl Explanation {
    pub fn reconstructed_score(&self) -> f64 {
        self.baseline + self.impacts.iter().map(|factor| factor.impact).sum::<f64>()
    }
}

/// Produces ranked feature attributions for scored customers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExplanationGenerator {
    top_k: usize,
}

impl Default for ExplanationGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_TOP_K)
    }
}

impl ExplanationGenerator {
    /// `top_k` is clamped to `1..=FEATURE_COUNT`.
    pub fn new(top_k: usize) -> Self {
        Self {
            top_k: top_k.clamp(1, FEATURE_COUNT),
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    pub fn explain(
        &self,
        model: &dyn CreditModel,
        features: &CustomerFeatures,
        probability: f64,
    ) -> Result<Explanation, ExplanationError> {
        let attribution = model
            .attribution()
            .ok_or(ExplanationError::Unsupported { kind: model.kind() })?;

        let expected = model.probability(features);
        if !((probability - expected).abs() <= PROBABILITY_TOLERANCE) {
            return Err(ExplanationError::ProbabilityMismatch {
                supplied: probability,
                expected,
            });
        }

        let attribution = attribution.attribute(features);
        let impacts: Vec<FactorImpact> = FEATURE_SCHEMA
            .iter()
            .zip(attribution.impacts.iter())
            .map(|(spec, impact)| FactorImpact {
                feature: spec.name.to_string(),
                impact: *impact,
            })
            .collect();

        Ok(Explanation {
            baseline: attribution.baseline,
            raw_score: model.raw_score(features),
            top_factors: rank(&impacts, self.top_k),
            impacts,
        })
    }
}

/// Descending absolute impact; the stable sort keeps schema order among ties.
fn rank(impacts: &[FactorImpact], top_k: usize) -> Vec<FactorImpact> {
    let mut ranked = impacts.to_vec();
    ranked.sort_by(|a, b| {
        b.impact
            .abs()
            .partial_cmp(&a.impact.abs())
            .unwrap_or(Ordering::Equal)
    });
    ranked.truncate(top_k);
    ranked
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::features::feature_names;
    use crate::credit::model::{
        InteractionParameters, LogisticParameters, ModelArtifact, ModelParameters,
        ARTIFACT_FORMAT, CURRENT_ARTIFACT_VERSION, DEFAULT_MINIMUM_VERSION,
    };

    fn logistic() -> LogisticParameters {
        let coefficients = (0..FEATURE_COUNT)
            .map(|index| {
                let sign = if index % 2 == 0 { 0.1 } else { -0.05 };
                sign * (index as f64 + 1.0)
            })
            .collect();
        LogisticParameters {
            intercept: -0.8,
            coefficients,
            centers: vec![0.5; FEATURE_COUNT],
            scales: vec![0.5; FEATURE_COUNT],
        }
    }

    fn compile(model: ModelParameters) -> Box<dyn CreditModel> {
        ModelArtifact {
            format: ARTIFACT_FORMAT.to_string(),
            version: CURRENT_ARTIFACT_VERSION,
            model_version: "explain-test".to_string(),
            trained_at: None,
            feature_names: feature_names().map(str::to_string).collect(),
            model,
        }
        .compile(DEFAULT_MINIMUM_VERSION)
        .expect("compiles")
    }

    fn features() -> CustomerFeatures {
        let values: Vec<f64> = (0..FEATURE_COUNT).map(|i| (i % 7) as f64 * 0.3).collect();
        CustomerFeatures::from_values(&values).expect("valid")
    }

    #[test]
    fn ranks_by_absolute_impact_and_truncates() {
        let model = compile(ModelParameters::Logistic(logistic()));
        let features = features();
        let probability = model.probability(&features);

        let explanation = ExplanationGenerator::new(7)
            .explain(model.as_ref(), &features, probability)
            .expect("explains");

        assert_eq!(explanation.impacts.len(), FEATURE_COUNT);
        assert_eq!(explanation.top_factors.len(), 7);
        for pair in explanation.top_factors.windows(2) {
            assert!(pair[0].impact.abs() >= pair[1].impact.abs());
        }
        let smallest_top = explanation.top_factors[6].impact.abs();
        let beyond = explanation
            .impacts
            .iter()
            .filter(|factor| {
                !explanation
                    .top_factors
                    .iter()
                    .any(|top| top.feature == factor.feature)
            })
            .all(|factor| factor.impact.abs() <= smallest_top);
        assert!(beyond);
    }

    #[test]
    fn impacts_reconstruct_raw_score() {
        let model = compile(ModelParameters::Logistic(logistic()));
        let features = features();
        let explanation = ExplanationGenerator::default()
            .explain(model.as_ref(), &features, model.probability(&features))
            .expect("explains");

        assert!((explanation.reconstructed_score() - explanation.raw_score).abs() < 1e-9);
        assert!((explanation.raw_score - model.raw_score(&features)).abs() < 1e-12);
    }

    #[test]
    fn interaction_models_cannot_be_explained() {
        let model = compile(ModelParameters::InteractionLogistic(InteractionParameters {
            linear: logistic(),
            interactions: Vec::new(),
        }));
        let features = features();

        let err = ExplanationGenerator::default()
            .explain(model.as_ref(), &features, model.probability(&features))
            .expect_err("unsupported");
        assert_eq!(
            err,
            ExplanationError::Unsupported {
                kind: ModelKind::InteractionLogistic
            }
        );
    }

    #[test]
    fn mismatched_probability_is_rejected() {
        let model = compile(ModelParameters::Logistic(logistic()));
        let features = features();
        let probability = model.probability(&features);
        let shifted = if probability > 0.5 {
            probability - 0.1
        } else {
            probability + 0.1
        };

        let err = ExplanationGenerator::default()
            .explain(model.as_ref(), &features, shifted)
            .expect_err("mismatch");
        assert!(matches!(err, ExplanationError::ProbabilityMismatch { .. }));
    }

    #[test]
    fn top_k_is_clamped() {
        assert_eq!(ExplanationGenerator::new(0).top_k(), 1);
        assert_eq!(ExplanationGenerator::new(500).top_k(), FEATURE_COUNT);
    }
}
