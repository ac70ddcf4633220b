use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::policy::RiskCategory;

/// Identifier wrapper for PAYG customer accounts.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CustomerId(pub String);

impl fmt::Display for CustomerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CustomerId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for CustomerId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Signed contribution of one feature to a prediction.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactorImpact {
    pub feature: String,
    pub impact: f64,
}

/// Outcome of a single scoring call. Built once and never mutated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoreResult {
    pub customer_id: CustomerId,
    pub probability: f64,
    pub risk_category: RiskCategory,
    pub recommendation: String,
    #[serde(default)]
    pub top_factors: Vec<FactorImpact>,
    pub model_version: String,
    #[serde(rename = "timestamp")]
    pub generated_at: DateTime<Utc>,
}
