use serde::{Deserialize, Serialize};

/// Probabilities strictly below this value are low risk.
pub const LOW_RISK_CEILING: f64 = 0.30;
/// Probabilities at or above this value are high risk.
pub const HIGH_RISK_FLOOR: f64 = 0.60;

/// Discretised default-risk band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RiskCategory {
    Low,
    Medium,
    High,
}

impl RiskCategory {
    pub const fn label(self) -> &'static str {
        match self {
            RiskCategory::Low => "Low",
            RiskCategory::Medium => "Medium",
            RiskCategory::High => "High",
        }
    }

    pub const fn recommended_action(self) -> &'static str {
        match self {
            RiskCategory::Low => "Approve - Low Risk",
            RiskCategory::Medium => "Review - Medium Risk",
            RiskCategory::High => "Detailed Review - High Risk",
        }
    }
}

/// Category and action derived from a default probability.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Decision {
    pub category: RiskCategory,
    pub recommendation: &'static str,
}

/// A probability outside `[0, 1]` reached the decision policy.
#[derive(Debug, Clone, Copy, PartialEq, thiserror::Error)]
#[error("probability {value} is outside the closed interval [0, 1]")]
pub struct InvalidProbability {
    pub value: f64,
}

pub fn decide(probability: f64) -> Result<Decision, InvalidProbability> {
    if !(0.0..=1.0).contains(&probability) {
        return Err(InvalidProbability { value: probability });
    }

    let category = if probability < LOW_RISK_CEILING {
        RiskCategory::Low
    } else if probability < HIGH_RISK_FLOOR {
        RiskCategory::Medium
    } else {
        RiskCategory::High
    };

    Ok(Decision {
        category,
        recommendation: category.recommended_action(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn category(probability: f64) -> RiskCategory {
        decide(probability).expect("valid probability").category
    }

    #[test]
    fn boundaries_fall_into_the_upper_band() {
        assert_eq!(category(0.2999), RiskCategory::Low);
        assert_eq!(category(0.3), RiskCategory::Medium);
        assert_eq!(category(0.5999), RiskCategory::Medium);
        assert_eq!(category(0.6), RiskCategory::High);
    }

    #[test]
    fn extremes_are_accepted() {
        assert_eq!(category(0.0), RiskCategory::Low);
        assert_eq!(category(1.0), RiskCategory::High);
    }

    #[test]
    fn actions_match_categories() {
        assert_eq!(
            decide(0.1).expect("valid").recommendation,
            "Approve - Low Risk"
        );
        assert_eq!(
            decide(0.45).expect("valid").recommendation,
            "Review - Medium Risk"
        );
        assert_eq!(
            decide(0.8).expect("valid").recommendation,
            "Detailed Review - High Risk"
        );
    }

    #[test]
    fn out_of_range_probabilities_are_rejected() {
        assert_eq!(decide(-0.01), Err(InvalidProbability { value: -0.01 }));
        assert_eq!(decide(1.5), Err(InvalidProbability { value: 1.5 }));
        assert!(decide(f64::NAN).is_err());
    }
}
