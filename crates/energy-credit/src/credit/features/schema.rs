use serde::{Deserialize, Serialize};

/// Number of fields in the scoring feature vector.
pub const FEATURE_COUNT: usize = 40;

/// Vocabulary accepted for `location_type`, in encoding order (urban = 0, rural = 1).
pub const LOCATION_TYPES: &[&str] = &["urban", "rural"];

/// Semantic grouping of the feature schema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FeatureFamily {
    PaymentBehavior,
    UsagePattern,
    Demographic,
    Temporal,
}

impl FeatureFamily {
    pub const fn label(self) -> &'static str {
        match self {
            FeatureFamily::PaymentBehavior => "payment_behavior",
            FeatureFamily::UsagePattern => "usage_pattern",
            FeatureFamily::Demographic => "demographic",
            FeatureFamily::Temporal => "temporal",
        }
    }
}

/// Accepted numeric range for a feature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueDomain {
    Unbounded,
    NonNegative,
    UnitInterval,
    Percentage,
}

impl ValueDomain {
    pub fn contains(self, value: f64) -> bool {
        match self {
            ValueDomain::Unbounded => value.is_finite(),
            ValueDomain::NonNegative => value.is_finite() && value >= 0.0,
            ValueDomain::UnitInterval => (0.0..=1.0).contains(&value),
            ValueDomain::Percentage => (0.0..=100.0).contains(&value),
        }
    }
}

/// How a raw value is interpreted before it lands in the vector.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FeatureKind {
    Numeric(ValueDomain),
    /// Boolean encoded as 0.0 / 1.0.
    Flag,
    /// Closed vocabulary encoded as the index of the matched label.
    Category(&'static [&'static str]),
}

/// Rule applied when the raw record does not carry a feature.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Imputation {
    Constant(f64),
    /// Multiply an earlier schema feature by `factor`.
    Scaled {
        source: &'static str,
        factor: f64,
    },
}

/// Static description of one field in the scoring schema.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeatureSpec {
    pub name: &'static str,
    pub family: FeatureFamily,
    pub kind: FeatureKind,
    pub aliases: &'static [&'static str],
    pub imputation: Option<Imputation>,
}

impl FeatureSpec {
    const fn numeric(name: &'static str, family: FeatureFamily, domain: ValueDomain) -> Self {
        Self {
            name,
            family,
            kind: FeatureKind::Numeric(domain),
            aliases: &[],
            imputation: None,
        }
    }

    const fn flag(name: &'static str, family: FeatureFamily) -> Self {
        Self {
            name,
            family,
            kind: FeatureKind::Flag,
            aliases: &[],
            imputation: None,
        }
    }

    const fn category(
        name: &'static str,
        family: FeatureFamily,
        labels: &'static [&'static str],
    ) -> Self {
        Self {
            name,
            family,
            kind: FeatureKind::Category(labels),
            aliases: &[],
            imputation: None,
        }
    }

    const fn aliases(mut self, aliases: &'static [&'static str]) -> Self {
        self.aliases = aliases;
        self
    }

    const fn impute(mut self, value: f64) -> Self {
        self.imputation = Some(Imputation::Constant(value));
        self
    }

    const fn derive_from(mut self, source: &'static str, factor: f64) -> Self {
        self.imputation = Some(Imputation::Scaled { source, factor });
        self
    }
}

use FeatureFamily::{Demographic, PaymentBehavior, Temporal, UsagePattern};
use ValueDomain::{NonNegative, Percentage, Unbounded, UnitInterval};

const DAYS_PER_MONTH: f64 = 30.44;

/// Ordered scoring schema. Artifacts must list exactly these names in this order.
pub const FEATURE_SCHEMA: [FeatureSpec; FEATURE_COUNT] = [
    // payment behaviour
    FeatureSpec::numeric("on_time_ratio", PaymentBehavior, UnitInterval)
        .aliases(&["on_time_payment_ratio"]),
    FeatureSpec::numeric("payment_frequency", PaymentBehavior, NonNegative)
        .aliases(&["payments_per_month"]),
    FeatureSpec::numeric("days_since_last_payment", PaymentBehavior, NonNegative),
    FeatureSpec::numeric("avg_payment_amount", PaymentBehavior, NonNegative)
        .aliases(&["average_payment_kes"]),
    FeatureSpec::numeric("payment_amount_std", PaymentBehavior, NonNegative).impute(0.0),
    FeatureSpec::numeric("missed_payments_90d", PaymentBehavior, NonNegative).impute(0.0),
    FeatureSpec::numeric("max_days_late", PaymentBehavior, NonNegative).impute(0.0),
    FeatureSpec::numeric("late_payment_count", PaymentBehavior, NonNegative).impute(0.0),
    FeatureSpec::numeric("avg_days_late", PaymentBehavior, NonNegative).impute(0.0),
    FeatureSpec::numeric("total_paid_to_date", PaymentBehavior, NonNegative),
    FeatureSpec::numeric("outstanding_balance", PaymentBehavior, NonNegative),
    FeatureSpec::numeric("balance_to_price_ratio", PaymentBehavior, UnitInterval),
    FeatureSpec::numeric("topup_count_30d", PaymentBehavior, NonNegative).impute(0.0),
    FeatureSpec::numeric("prepayment_ratio", PaymentBehavior, UnitInterval).impute(0.0),
    FeatureSpec::numeric("payment_streak_days", PaymentBehavior, NonNegative).impute(0.0),
    // usage pattern
    FeatureSpec::numeric("avg_daily_usage_kwh", UsagePattern, NonNegative),
    FeatureSpec::numeric("usage_std_kwh", UsagePattern, NonNegative).impute(0.0),
    FeatureSpec::numeric("peak_usage_kwh", UsagePattern, NonNegative)
        .derive_from("avg_daily_usage_kwh", 1.0),
    FeatureSpec::numeric("usage_trend_30d", UsagePattern, Unbounded).impute(0.0),
    FeatureSpec::numeric("active_days_ratio", UsagePattern, UnitInterval),
    FeatureSpec::numeric("lockout_events_90d", UsagePattern, NonNegative).impute(0.0),
    FeatureSpec::numeric("days_locked_out_90d", UsagePattern, NonNegative).impute(0.0),
    FeatureSpec::numeric("appliance_count", UsagePattern, NonNegative).impute(1.0),
    FeatureSpec::numeric("avg_session_hours", UsagePattern, NonNegative).impute(4.0),
    FeatureSpec::numeric("evening_usage_share", UsagePattern, UnitInterval).impute(0.5),
    FeatureSpec::numeric("battery_health_pct", UsagePattern, Percentage).impute(100.0),
    FeatureSpec::numeric("device_tamper_events", UsagePattern, NonNegative).impute(0.0),
    // demographic
    FeatureSpec::category("location_type", Demographic, LOCATION_TYPES).aliases(&["location"]),
    FeatureSpec::numeric("household_size", Demographic, NonNegative).impute(4.0),
    FeatureSpec::numeric("distance_to_agent_km", Demographic, NonNegative).impute(10.0),
    FeatureSpec::flag("has_mobile_money", Demographic)
        .aliases(&["mobile_money"])
        .impute(1.0),
    FeatureSpec::numeric("income_source_count", Demographic, NonNegative).impute(1.0),
    FeatureSpec::flag("primary_income_agriculture", Demographic),
    FeatureSpec::flag("grid_access_nearby", Demographic).impute(0.0),
    FeatureSpec::numeric("county_poverty_index", Demographic, UnitInterval),
    // temporal
    FeatureSpec::numeric("tenure_days", Temporal, NonNegative).aliases(&["days_since_signup"]),
    FeatureSpec::numeric("months_since_signup", Temporal, NonNegative)
        .derive_from("tenure_days", 1.0 / DAYS_PER_MONTH),
    FeatureSpec::numeric("days_to_next_harvest", Temporal, NonNegative).impute(90.0),
    FeatureSpec::numeric("payment_seasonality_index", Temporal, UnitInterval).impute(0.0),
    FeatureSpec::numeric("days_since_last_lockout", Temporal, NonNegative)
        .derive_from("tenure_days", 1.0),
];

/// Position of a feature in the schema.
pub fn feature_index(name: &str) -> Option<usize> {
    FEATURE_SCHEMA.iter().position(|spec| spec.name == name)
}

/// Schema feature names in vector order.
pub fn feature_names() -> impl Iterator<Item = &'static str> {
    FEATURE_SCHEMA.iter().map(|spec| spec.name)
}
