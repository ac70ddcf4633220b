use super::artifact::{check_finite, resolve_feature, ModelLoadError, StumpParameters};
use super::{Attribution, CreditModel, FeatureAttribution, ModelKind};
use crate::credit::features::{CustomerFeatures, FEATURE_COUNT};

#[derive(Debug, Clone, PartialEq)]
struct CompiledStump {
    feature: usize,
    threshold: f64,
    left: f64,
    right: f64,
    /// Cover-weighted mean leaf value over the training data.
    expected: f64,
}

impl CompiledStump {
    fn leaf(&self, features: &CustomerFeatures) -> f64 {
        if features.values()[self.feature] < self.threshold {
            self.left
        } else {
            self.right
        }
    }
}

/// Gradient-boosted depth-one trees summed in artifact order.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct BoostedStumpsModel {
    base_score: f64,
    stumps: Vec<CompiledStump>,
}

impl BoostedStumpsModel {
    pub(crate) fn compile(params: &StumpParameters) -> Result<Self, ModelLoadError> {
        check_finite("base_score", params.base_score)?;
        if params.stumps.is_empty() {
            return Err(ModelLoadError::Parameters(
                "boosted model has no stumps".to_string(),
            ));
        }

        let mut stumps = Vec::with_capacity(params.stumps.len());
        for (index, stump) in params.stumps.iter().enumerate() {
            let feature = resolve_feature(&stump.feature)?;
            check_finite(&format!("stumps[{index}].threshold"), stump.threshold)?;
            check_finite(&format!("stumps[{index}].left"), stump.left)?;
            check_finite(&format!("stumps[{index}].right"), stump.right)?;
            if !(0.0..=1.0).contains(&stump.left_cover) {
                return Err(ModelLoadError::Parameters(format!(
                    "stumps[{index}].left_cover must lie in [0, 1]"
                )));
            }
            stumps.push(CompiledStump {
                feature,
                threshold: stump.threshold,
                left: stump.left,
                right: stump.right,
                expected: stump.left_cover * stump.left + (1.0 - stump.left_cover) * stump.right,
            });
        }

        Ok(Self {
            base_score: params.base_score,
            stumps,
        })
    }
}

impl CreditModel for BoostedStumpsModel {
    fn kind(&self) -> ModelKind {
        ModelKind::BoostedStumps
    }

    fn raw_score(&self, features: &CustomerFeatures) -> f64 {
        self.stumps
            .iter()
            .fold(self.base_score, |score, stump| score + stump.leaf(features))
    }

    fn attribution(&self) -> Option<&dyn FeatureAttribution> {
        Some(self)
    }
}

impl FeatureAttribution for BoostedStumpsModel {
    // A stump depends on one feature, so leaf minus its expectation is that feature's exact
    // contribution and the expectations fold into the baseline.
    fn attribute(&self, features: &CustomerFeatures) -> Attribution {
        let mut impacts = [0.0; FEATURE_COUNT];
        let mut baseline = self.base_score;
        for stump in &self.stumps {
            baseline += stump.expected;
            impacts[stump.feature] += stump.leaf(features) - stump.expected;
        }
        Attribution { baseline, impacts }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::model::Stump;

    fn params() -> StumpParameters {
        StumpParameters {
            base_score: -1.2,
            stumps: vec![
                Stump {
                    feature: "on_time_ratio".to_string(),
                    threshold: 0.7,
                    left: 0.9,
                    right: -0.4,
                    left_cover: 0.3,
                },
                Stump {
                    feature: "days_since_last_payment".to_string(),
                    threshold: 14.0,
                    left: -0.2,
                    right: 0.8,
                    left_cover: 0.8,
                },
                Stump {
                    feature: "on_time_ratio".to_string(),
                    threshold: 0.9,
                    left: 0.1,
                    right: -0.3,
                    left_cover: 0.6,
                },
            ],
        }
    }

    fn features(on_time: f64, days_since: f64) -> CustomerFeatures {
        let base = CustomerFeatures::from_values(&[1.0; FEATURE_COUNT]).expect("valid");
        base.with_value("on_time_ratio", on_time)
            .and_then(|f| f.with_value("days_since_last_payment", days_since))
            .expect("known features")
    }

    #[test]
    fn sums_leaves_over_base_score() {
        let model = BoostedStumpsModel::compile(&params()).expect("compiles");
        let raw = model.raw_score(&features(0.5, 20.0));
        assert!((raw - (-1.2 + 0.9 + 0.8 + 0.1)).abs() < 1e-12);
    }

    #[test]
    fn attribution_is_exact_and_sparse() {
        let model = BoostedStumpsModel::compile(&params()).expect("compiles");
        let sample = features(0.95, 3.0);
        let attribution = model.attribute(&sample);

        assert!((attribution.reconstructed_score() - model.raw_score(&sample)).abs() < 1e-12);
        let nonzero = attribution
            .impacts
            .iter()
            .filter(|impact| **impact != 0.0)
            .count();
        assert_eq!(nonzero, 2);
        assert!(attribution.impacts[0] < 0.0);
    }

    #[test]
    fn rejects_unknown_split_feature() {
        let mut bad = params();
        bad.stumps[1].feature = "credit_bureau_score".to_string();
        assert!(matches!(
            BoostedStumpsModel::compile(&bad),
            Err(ModelLoadError::Parameters(message)) if message.contains("credit_bureau_score")
        ));
    }
}
