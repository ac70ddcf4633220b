use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::response::Response;
use serde_json::Value;

use crate::credit::domain::CustomerId;
use crate::credit::features::{feature_names, RawCustomerRecord};
use crate::credit::model::{
    InteractionParameters, InteractionTerm, LogisticParameters, ModelArtifact, ModelParameters,
    ScoringEngine, Stump, StumpParameters, ARTIFACT_FORMAT, CURRENT_ARTIFACT_VERSION,
};
use crate::credit::repository::{CustomerRepository, RepositoryError};
use crate::credit::service::{CreditScoringService, ScoringOptions};

pub(super) const TYPICAL_ID: &str = "KE-NRB-000112";
pub(super) const LOW_RISK_ID: &str = "KE-KSM-004410";
pub(super) const HIGH_RISK_ID: &str = "KE-MCH-007731";

/// Values sitting on the reference artifact's centers.
const TYPICAL_VALUES: [(&str, f64); 36] = [
    ("on_time_ratio", 0.80),
    ("payment_frequency", 8.0),
    ("days_since_last_payment", 7.0),
    ("avg_payment_amount", 450.0),
    ("payment_amount_std", 120.0),
    ("missed_payments_90d", 1.5),
    ("max_days_late", 10.0),
    ("late_payment_count", 3.0),
    ("avg_days_late", 4.0),
    ("total_paid_to_date", 12_000.0),
    ("outstanding_balance", 9_000.0),
    ("balance_to_price_ratio", 0.5),
    ("topup_count_30d", 6.0),
    ("prepayment_ratio", 0.1),
    ("payment_streak_days", 20.0),
    ("avg_daily_usage_kwh", 0.35),
    ("usage_std_kwh", 0.12),
    ("peak_usage_kwh", 0.8),
    ("usage_trend_30d", 0.0),
    ("active_days_ratio", 0.75),
    ("lockout_events_90d", 1.2),
    ("days_locked_out_90d", 4.0),
    ("appliance_count", 3.0),
    ("avg_session_hours", 5.0),
    ("evening_usage_share", 0.55),
    ("battery_health_pct", 90.0),
    ("device_tamper_events", 0.1),
    ("household_size", 4.5),
    ("distance_to_agent_km", 12.0),
    ("income_source_count", 1.6),
    ("county_poverty_index", 0.4),
    ("tenure_days", 420.0),
    ("months_since_signup", 14.0),
    ("days_to_next_harvest", 90.0),
    ("payment_seasonality_index", 0.3),
    ("days_since_last_lockout", 120.0),
];

pub(super) fn reference_artifact_path() -> PathBuf {
    PathBuf::from(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../models/paygo-credit-logistic.json"
    ))
}

pub(super) fn stumps_artifact_path() -> PathBuf {
    PathBuf::from(concat!(
        env!("CARGO_MANIFEST_DIR"),
        "/../../models/paygo-credit-stumps.json"
    ))
}

pub(super) fn reference_artifact() -> ModelArtifact {
    ModelArtifact::load(reference_artifact_path()).expect("reference artifact loads")
}

/// Every field populated; scores Medium (p ≈ 0.31) on the reference artifact.
pub(super) fn typical_record(id: &str) -> RawCustomerRecord {
    let mut record = RawCustomerRecord::new(id)
        .with("location", " Rural ")
        .with("has_mobile_money", "yes")
        .with("primary_income_agriculture", true)
        .with("grid_access_nearby", 0.0);
    for (field, value) in TYPICAL_VALUES {
        record.set(field, value);
    }
    record
}

/// Punctual, frequent payer; scores Low on the reference artifact.
pub(super) fn low_risk_record(id: &str) -> RawCustomerRecord {
    typical_record(id)
        .with("on_time_ratio", 0.95)
        .with("payment_frequency", 12.0)
        .with("days_since_last_payment", 2.0)
}

/// Lapsed payer with repeated lockouts; scores High on every bundled artifact.
pub(super) fn high_risk_record(id: &str) -> RawCustomerRecord {
    typical_record(id)
        .with("on_time_ratio", 0.4)
        .with("days_since_last_payment", 30.0)
        .with("missed_payments_90d", 5.0)
        .with("lockout_events_90d", 4.0)
}

pub(super) fn artifact_with(model_version: &str, model: ModelParameters) -> ModelArtifact {
    ModelArtifact {
        format: ARTIFACT_FORMAT.to_string(),
        version: CURRENT_ARTIFACT_VERSION,
        model_version: model_version.to_string(),
        trained_at: None,
        feature_names: feature_names().map(str::to_string).collect(),
        model,
    }
}

pub(super) fn interaction_artifact() -> ModelArtifact {
    let ModelParameters::Logistic(linear) = reference_artifact().model else {
        panic!("reference artifact is logistic");
    };
    artifact_with(
        "interaction-test",
        ModelParameters::InteractionLogistic(InteractionParameters {
            linear,
            interactions: vec![InteractionTerm {
                left: "on_time_ratio".to_string(),
                right: "lockout_events_90d".to_string(),
                weight: -0.2,
            }],
        }),
    )
}

pub(super) fn flat_logistic(model_version: &str, intercept: f64) -> ModelArtifact {
    let count = feature_names().count();
    artifact_with(
        model_version,
        ModelParameters::Logistic(LogisticParameters {
            intercept,
            coefficients: vec![0.0; count],
            centers: vec![0.0; count],
            scales: vec![1.0; count],
        }),
    )
}

pub(super) fn single_stump(model_version: &str) -> ModelArtifact {
    artifact_with(
        model_version,
        ModelParameters::BoostedStumps(StumpParameters {
            base_score: -1.0,
            stumps: vec![Stump {
                feature: "on_time_ratio".to_string(),
                threshold: 0.7,
                left: 1.5,
                right: -0.5,
                left_cover: 0.25,
            }],
        }),
    )
}

#[derive(Default)]
pub(super) struct MemoryRepository {
    records: Mutex<HashMap<CustomerId, RawCustomerRecord>>,
}

impl MemoryRepository {
    pub(super) fn with_records(records: impl IntoIterator<Item = RawCustomerRecord>) -> Self {
        let repository = Self::default();
        for record in records {
            repository.insert(record);
        }
        repository
    }

    pub(super) fn insert(&self, record: RawCustomerRecord) {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .insert(record.customer_id.clone(), record);
    }
}

impl CustomerRepository for MemoryRepository {
    fn fetch(&self, id: &CustomerId) -> Result<Option<RawCustomerRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

pub(super) struct UnavailableRepository;

impl CustomerRepository for UnavailableRepository {
    fn fetch(&self, _id: &CustomerId) -> Result<Option<RawCustomerRecord>, RepositoryError> {
        Err(RepositoryError::Unavailable("warehouse offline".to_string()))
    }
}

/// Stalls every lookup, used to trip request timeouts.
pub(super) struct SlowRepository {
    delay: Duration,
    fetches: Arc<AtomicUsize>,
}

impl SlowRepository {
    pub(super) fn new(delay: Duration) -> Self {
        Self {
            delay,
            fetches: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Shared count of lookups started so far.
    pub(super) fn fetches(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.fetches)
    }
}

impl CustomerRepository for SlowRepository {
    fn fetch(&self, id: &CustomerId) -> Result<Option<RawCustomerRecord>, RepositoryError> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        std::thread::sleep(self.delay);
        Ok(Some(typical_record(&id.0)))
    }
}

pub(super) fn seeded_repository() -> MemoryRepository {
    MemoryRepository::with_records([
        typical_record(TYPICAL_ID),
        low_risk_record(LOW_RISK_ID),
        high_risk_record(HIGH_RISK_ID),
    ])
}

pub(super) fn options() -> ScoringOptions {
    ScoringOptions {
        model_path: Some(reference_artifact_path()),
        ..ScoringOptions::default()
    }
}

/// Service over the seeded repository with the reference artifact loaded.
pub(super) fn build_service() -> Arc<CreditScoringService<MemoryRepository>> {
    build_service_with(seeded_repository(), options())
}

pub(super) fn build_service_with<R>(
    repository: R,
    options: ScoringOptions,
) -> Arc<CreditScoringService<R>>
where
    R: CustomerRepository + 'static,
{
    let engine = Arc::new(ScoringEngine::default());
    engine
        .install(&reference_artifact())
        .expect("reference artifact installs");
    Arc::new(CreditScoringService::new(
        Arc::new(repository),
        engine,
        options,
    ))
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}
