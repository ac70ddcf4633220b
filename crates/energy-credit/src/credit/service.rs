use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use tokio::sync::{AcquireError, Semaphore};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use super::domain::{CustomerId, ScoreResult};
use super::explain::{ExplanationError, ExplanationGenerator, DEFAULT_TOP_K};
use super::features::{CustomerFeatures, FeatureVectorBuilder, RawCustomerRecord, SchemaError};
use super::model::{
    ActiveModel, ModelLoadError, ModelMetadata, ModelStatus, ScoringEngine, ScoringError,
};
use super::policy::{self, InvalidProbability};
use super::repository::{CustomerRepository, RepositoryError};

/// Tunables for the scoring service.
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringOptions {
    pub explanation_top_k: usize,
    pub score_timeout: Duration,
    /// Artifact reloaded when a reload request names no path.
    pub model_path: Option<PathBuf>,
    /// Upper bound on customers of one batch scored at the same time.
    pub batch_concurrency: usize,
}

/// Default cap on concurrently scored batch entries.
pub const DEFAULT_BATCH_CONCURRENCY: usize = 8;

impl Default for ScoringOptions {
    fn default() -> Self {
        Self {
            explanation_top_k: DEFAULT_TOP_K,
            score_timeout: Duration::from_secs(2),
            model_path: None,
            batch_concurrency: DEFAULT_BATCH_CONCURRENCY,
        }
    }
}

/// Per-customer outcome within a batch.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum BatchEntry {
    Scored(ScoreResult),
    Failed {
        customer_id: CustomerId,
        kind: &'static str,
        error: String,
    },
}

/// Service composing the feature builder, scoring engine, explainer, and decision policy.
pub struct CreditScoringService<R> {
    repository: Arc<R>,
    engine: Arc<ScoringEngine>,
    builder: FeatureVectorBuilder,
    explainer: ExplanationGenerator,
    options: ScoringOptions,
}

impl<R> CreditScoringService<R>
where
    R: CustomerRepository + 'static,
{
    pub fn new(repository: Arc<R>, engine: Arc<ScoringEngine>, options: ScoringOptions) -> Self {
        Self {
            repository,
            engine,
            builder: FeatureVectorBuilder::new(),
            explainer: ExplanationGenerator::new(options.explanation_top_k),
            options,
        }
    }

    pub fn engine(&self) -> &Arc<ScoringEngine> {
        &self.engine
    }

    pub fn options(&self) -> &ScoringOptions {
        &self.options
    }

    /// Score an already built feature vector.
    pub fn score_features(
        &self,
        customer_id: CustomerId,
        features: &CustomerFeatures,
        include_explanation: bool,
    ) -> Result<ScoreResult, CreditServiceError> {
        let model = self.engine.snapshot()?;
        self.score_against(&model, customer_id, features, include_explanation)
    }

    /// Build the feature vector for a raw record and score it.
    pub fn score_record(
        &self,
        record: &RawCustomerRecord,
        include_explanation: bool,
    ) -> Result<ScoreResult, CreditServiceError> {
        let model = self.engine.snapshot()?;
        let features = self.builder.build(record)?;
        self.score_against(
            &model,
            record.customer_id.clone(),
            &features,
            include_explanation,
        )
    }

    /// Fetch the customer from the repository and score it.
    pub fn score_customer(
        &self,
        customer_id: &CustomerId,
        include_explanation: bool,
    ) -> Result<ScoreResult, CreditServiceError> {
        let model = self.engine.snapshot()?;
        self.score_customer_against(&model, customer_id, include_explanation)
    }

    /// [`Self::score_customer`] bounded by `timeout`; nothing is returned once it expires.
    pub async fn score_customer_within(
        self: &Arc<Self>,
        customer_id: CustomerId,
        include_explanation: bool,
        timeout: Duration,
    ) -> Result<ScoreResult, CreditServiceError> {
        let service = Arc::clone(self);
        run_bounded(timeout, move || {
            service.score_customer(&customer_id, include_explanation)
        })
        .await
    }

    /// [`Self::score_record`] on the blocking pool, bounded by `timeout`.
    pub async fn score_record_within(
        self: &Arc<Self>,
        record: RawCustomerRecord,
        include_explanation: bool,
        timeout: Duration,
    ) -> Result<ScoreResult, CreditServiceError> {
        let service = Arc::clone(self);
        run_bounded(timeout, move || {
            service.score_record(&record, include_explanation)
        })
        .await
    }

    /// Score many customers in parallel against a single model snapshot.
    ///
    /// Entries come back in input order. Per-customer failures are reported inline; a missing
    /// model or an expired timeout fails the whole batch. At most `batch_concurrency` customers
    /// are scored at once, and entries still queued when the batch fails are cancelled.
    pub async fn score_batch(
        self: &Arc<Self>,
        customer_ids: Vec<CustomerId>,
        include_explanation: bool,
        timeout: Duration,
    ) -> Result<Vec<BatchEntry>, CreditServiceError> {
        let model = self.engine.snapshot()?;
        let permits = Arc::new(Semaphore::new(self.options.batch_concurrency.max(1)));

        let mut handles: Vec<JoinHandle<Result<BatchEntry, CreditServiceError>>> = customer_ids
            .into_iter()
            .map(|customer_id| {
                let service = Arc::clone(self);
                let model = Arc::clone(&model);
                let permits = Arc::clone(&permits);
                tokio::spawn(async move {
                    let permit = permits.acquire_owned().await?;
                    let entry = tokio::task::spawn_blocking(move || {
                        let _permit = permit;
                        let outcome = service.score_customer_against(
                            &model,
                            &customer_id,
                            include_explanation,
                        );
                        match outcome {
                            Ok(result) => BatchEntry::Scored(result),
                            Err(err) => BatchEntry::Failed {
                                customer_id,
                                kind: err.kind(),
                                error: err.to_string(),
                            },
                        }
                    })
                    .await?;
                    Ok::<_, CreditServiceError>(entry)
                })
            })
            .collect();

        let collect = async {
            let mut entries = Vec::with_capacity(handles.len());
            for handle in handles.iter_mut() {
                entries.push(handle.await??);
            }
            Ok::<_, CreditServiceError>(entries)
        };

        let outcome = match tokio::time::timeout(timeout, collect).await {
            Ok(entries) => entries,
            Err(_) => Err(CreditServiceError::Timeout(timeout)),
        };
        if let Err(err) = &outcome {
            let pending = handles.iter().filter(|handle| !handle.is_finished()).count();
            for handle in &handles {
                handle.abort();
            }
            warn!(error = %err, pending, "batch abandoned");
        }
        outcome
    }

    /// Load an artifact, falling back to the configured path.
    pub fn reload_model(&self, path: Option<&Path>) -> Result<ModelMetadata, CreditServiceError> {
        let path = path
            .or(self.options.model_path.as_deref())
            .ok_or(CreditServiceError::NoModelPath)?;
        let active = self.engine.load(path)?;
        Ok(active.metadata().clone())
    }

    /// [`Self::reload_model`] on the blocking pool, keeping file reads off async workers.
    pub async fn reload_model_in_background(
        self: &Arc<Self>,
        path: Option<PathBuf>,
    ) -> Result<ModelMetadata, CreditServiceError> {
        let service = Arc::clone(self);
        tokio::task::spawn_blocking(move || service.reload_model(path.as_deref())).await?
    }

    pub fn unload_model(&self) -> Option<ModelMetadata> {
        self.engine
            .unload()
            .map(|previous| previous.metadata().clone())
    }

    pub fn model_status(&self) -> ModelStatus {
        self.engine.status()
    }

    fn score_customer_against(
        &self,
        model: &ActiveModel,
        customer_id: &CustomerId,
        include_explanation: bool,
    ) -> Result<ScoreResult, CreditServiceError> {
        let record = self
            .repository
            .fetch(customer_id)?
            .ok_or_else(|| RepositoryError::NotFound(customer_id.clone()))?;
        let features = self.builder.build(&record)?;
        self.score_against(model, customer_id.clone(), &features, include_explanation)
    }

    fn score_against(
        &self,
        model: &ActiveModel,
        customer_id: CustomerId,
        features: &CustomerFeatures,
        include_explanation: bool,
    ) -> Result<ScoreResult, CreditServiceError> {
        let probability = model.score(features)?;
        let decision = policy::decide(probability)?;

        let top_factors = if include_explanation {
            self.explainer
                .explain(model.model(), features, probability)?
                .top_factors
        } else {
            Vec::new()
        };

        debug!(
            customer_id = %customer_id,
            probability,
            category = decision.category.label(),
            model_version = %model.metadata().model_version,
            "customer scored"
        );

        Ok(ScoreResult {
            customer_id,
            probability,
            risk_category: decision.category,
            recommendation: decision.recommendation.to_string(),
            top_factors,
            model_version: model.metadata().model_version.clone(),
            generated_at: Utc::now(),
        })
    }
}

/// Run blocking scoring work off the async workers, giving up once `timeout` expires.
async fn run_bounded<T, F>(timeout: Duration, work: F) -> Result<T, CreditServiceError>
where
    F: FnOnce() -> Result<T, CreditServiceError> + Send + 'static,
    T: Send + 'static,
{
    let task = tokio::task::spawn_blocking(work);
    match tokio::time::timeout(timeout, task).await {
        Ok(joined) => joined?,
        Err(_) => Err(CreditServiceError::Timeout(timeout)),
    }
}

/// Error raised by the credit scoring service.
#[derive(Debug, thiserror::Error)]
pub enum CreditServiceError {
    #[error(transparent)]
    Schema(#[from] SchemaError),
    #[error(transparent)]
    Scoring(#[from] ScoringError),
    #[error(transparent)]
    ModelLoad(#[from] ModelLoadError),
    #[error(transparent)]
    Explanation(#[from] ExplanationError),
    #[error(transparent)]
    Policy(#[from] InvalidProbability),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("scoring did not finish within {0:?}")]
    Timeout(Duration),
    #[error("scoring worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
    #[error("batch worker pool closed: {0}")]
    WorkerPool(#[from] AcquireError),
    #[error("no model path supplied and none configured")]
    NoModelPath,
}

impl CreditServiceError {
    /// Stable machine-readable error class.
    pub fn kind(&self) -> &'static str {
        match self {
            CreditServiceError::Schema(_) => "schema_error",
            CreditServiceError::Scoring(ScoringError::ModelNotLoaded) => "model_not_loaded",
            CreditServiceError::Scoring(ScoringError::NonFiniteScore { .. }) => "scoring_error",
            CreditServiceError::ModelLoad(_) | CreditServiceError::NoModelPath => {
                "model_load_error"
            }
            CreditServiceError::Explanation(_) => "explanation_error",
            CreditServiceError::Policy(_) => "invalid_probability",
            CreditServiceError::Repository(RepositoryError::NotFound(_)) => "customer_not_found",
            CreditServiceError::Repository(RepositoryError::Unavailable(_)) => {
                "repository_unavailable"
            }
            CreditServiceError::Timeout(_) => "timeout",
            CreditServiceError::Worker(_) | CreditServiceError::WorkerPool(_) => {
                "internal_error"
            }
        }
    }
}
