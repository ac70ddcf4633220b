use super::artifact::{check_finite, to_array, LogisticParameters, ModelLoadError};
use super::{Attribution, CreditModel, FeatureAttribution, ModelKind};
use crate::credit::features::{CustomerFeatures, FEATURE_COUNT};

/// Compiled standardised linear logit.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct LogisticModel {
    intercept: f64,
    coefficients: [f64; FEATURE_COUNT],
    centers: [f64; FEATURE_COUNT],
    scales: [f64; FEATURE_COUNT],
}

impl LogisticModel {
    pub(crate) fn compile(params: &LogisticParameters) -> Result<Self, ModelLoadError> {
        check_finite("intercept", params.intercept)?;
        let coefficients = to_array("coefficients", &params.coefficients)?;
        let centers = to_array("centers", &params.centers)?;
        let scales = to_array("scales", &params.scales)?;
        if let Some(index) = scales.iter().position(|scale| *scale <= 0.0) {
            return Err(ModelLoadError::Parameters(format!(
                "scales[{index}] must be positive"
            )));
        }

        Ok(Self {
            intercept: params.intercept,
            coefficients,
            centers,
            scales,
        })
    }

    pub(crate) fn standardized(&self, features: &CustomerFeatures, index: usize) -> f64 {
        (features.values()[index] - self.centers[index]) / self.scales[index]
    }

    pub(crate) fn terms(&self, features: &CustomerFeatures) -> [f64; FEATURE_COUNT] {
        let mut terms = [0.0; FEATURE_COUNT];
        for (index, term) in terms.iter_mut().enumerate() {
            *term = self.coefficients[index] * self.standardized(features, index);
        }
        terms
    }

    pub(crate) fn intercept(&self) -> f64 {
        self.intercept
    }
}

impl CreditModel for LogisticModel {
    fn kind(&self) -> ModelKind {
        ModelKind::Logistic
    }

    fn raw_score(&self, features: &CustomerFeatures) -> f64 {
        self.intercept + self.terms(features).iter().sum::<f64>()
    }

    fn attribution(&self) -> Option<&dyn FeatureAttribution> {
        Some(self)
    }
}

impl FeatureAttribution for LogisticModel {
    fn attribute(&self, features: &CustomerFeatures) -> Attribution {
        Attribution {
            baseline: self.intercept,
            impacts: self.terms(features),
        }
    }
}
