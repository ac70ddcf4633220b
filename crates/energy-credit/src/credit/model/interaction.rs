use super::artifact::{check_finite, resolve_feature, InteractionParameters, ModelLoadError};
use super::logistic::LogisticModel;
use super::{CreditModel, ModelKind};
use crate::credit::features::CustomerFeatures;

#[derive(Debug, Clone, PartialEq)]
struct CompiledInteraction {
    left: usize,
    right: usize,
    weight: f64,
}

/// Linear logit plus products of standardised feature pairs.
///
/// Interaction terms are shared between two features, so the model offers no per-feature
/// attribution.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct InteractionLogisticModel {
    linear: LogisticModel,
    interactions: Vec<CompiledInteraction>,
}

impl InteractionLogisticModel {
    pub(crate) fn compile(params: &InteractionParameters) -> Result<Self, ModelLoadError> {
        let linear = LogisticModel::compile(&params.linear)?;
        let mut interactions = Vec::with_capacity(params.interactions.len());
        for (index, term) in params.interactions.iter().enumerate() {
            check_finite(&format!("interactions[{index}].weight"), term.weight)?;
            let left = resolve_feature(&term.left)?;
            let right = resolve_feature(&term.right)?;
            if left == right {
                return Err(ModelLoadError::Parameters(format!(
                    "interactions[{index}] pairs `{}` with itself",
                    term.left
                )));
            }
            interactions.push(CompiledInteraction {
                left,
                right,
                weight: term.weight,
            });
        }

        Ok(Self {
            linear,
            interactions,
        })
    }
}

impl CreditModel for InteractionLogisticModel {
    fn kind(&self) -> ModelKind {
        ModelKind::InteractionLogistic
    }

    fn raw_score(&self, features: &CustomerFeatures) -> f64 {
        let linear = self.linear.intercept() + self.linear.terms(features).iter().sum::<f64>();
        self.interactions.iter().fold(linear, |score, term| {
            score
                + term.weight
                    * self.linear.standardized(features, term.left)
                    * self.linear.standardized(features, term.right)
        })
    }
}
