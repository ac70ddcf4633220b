use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::{info, warn};

use super::artifact::{ModelArtifact, ModelLoadError, DEFAULT_MINIMUM_VERSION};
use super::{sigmoid, CreditModel, ModelKind};
use crate::credit::features::CustomerFeatures;

/// Failure while producing a probability.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ScoringError {
    #[error("no model artifact is loaded")]
    ModelNotLoaded,
    #[error("model produced a non-finite raw score ({raw})")]
    NonFiniteScore { raw: f64 },
}

/// Descriptive data about the artifact behind an [`ActiveModel`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelMetadata {
    pub model_version: String,
    pub artifact_version: u32,
    pub kind: ModelKind,
    pub supports_explanation: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trained_at: Option<DateTime<Utc>>,
    pub loaded_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<PathBuf>,
    pub generation: u64,
}

/// Immutable, fully validated model published by the engine.
pub struct ActiveModel {
    model: Box<dyn CreditModel>,
    metadata: ModelMetadata,
}

impl ActiveModel {
    pub fn metadata(&self) -> &ModelMetadata {
        &self.metadata
    }

    pub fn model(&self) -> &dyn CreditModel {
        self.model.as_ref()
    }

    pub fn raw_score(&self, features: &CustomerFeatures) -> Result<f64, ScoringError> {
        let raw = self.model.raw_score(features);
        if raw.is_nan() {
            return Err(ScoringError::NonFiniteScore { raw });
        }
        Ok(raw)
    }

    pub fn score(&self, features: &CustomerFeatures) -> Result<f64, ScoringError> {
        self.raw_score(features).map(sigmoid)
    }
}

impl std::fmt::Debug for ActiveModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ActiveModel")
            .field("metadata", &self.metadata)
            .finish_non_exhaustive()
    }
}

/// Snapshot of the engine lifecycle for status endpoints.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ModelStatus {
    pub loaded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<ModelMetadata>,
}

/// Owner of the single active model artifact.
///
/// Readers clone the current `Arc<ActiveModel>` and score without holding any lock. Loads are
/// serialised by `load_lock`, validated off to the side, and only then swapped in, so callers
/// observe either the previous model or the new one.
pub struct ScoringEngine {
    active: RwLock<Option<Arc<ActiveModel>>>,
    load_lock: Mutex<()>,
    generation: AtomicU64,
    minimum_version: u32,
}

impl Default for ScoringEngine {
    fn default() -> Self {
        Self::new(DEFAULT_MINIMUM_VERSION)
    }
}

impl ScoringEngine {
    pub fn new(minimum_version: u32) -> Self {
        Self {
            active: RwLock::new(None),
            load_lock: Mutex::new(()),
            generation: AtomicU64::new(0),
            minimum_version,
        }
    }

    pub fn minimum_version(&self) -> u32 {
        self.minimum_version
    }

    /// Read, validate and publish the artifact at `path`.
    pub fn load(&self, path: impl AsRef<Path>) -> Result<Arc<ActiveModel>, ModelLoadError> {
        let path = path.as_ref();
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let artifact = ModelArtifact::load(path).map_err(|err| {
            warn!(path = %path.display(), error = %err, "model artifact rejected");
            err
        })?;
        self.publish(&artifact, Some(path.to_path_buf()))
    }

    /// Validate and publish an in-memory artifact.
    pub fn install(&self, artifact: &ModelArtifact) -> Result<Arc<ActiveModel>, ModelLoadError> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        self.publish(artifact, None)
    }

    /// Drop the active model. Calls already holding a snapshot finish against it.
    pub fn unload(&self) -> Option<Arc<ActiveModel>> {
        let _guard = self.load_lock.lock().unwrap_or_else(PoisonError::into_inner);
        let previous = self
            .active
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(model) = &previous {
            info!(
                model_version = %model.metadata.model_version,
                generation = model.metadata.generation,
                "model unloaded"
            );
        }
        previous
    }

    pub fn snapshot(&self) -> Result<Arc<ActiveModel>, ScoringError> {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
            .ok_or(ScoringError::ModelNotLoaded)
    }

    pub fn is_loaded(&self) -> bool {
        self.active
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    pub fn score(&self, features: &CustomerFeatures) -> Result<f64, ScoringError> {
        self.snapshot()?.score(features)
    }

    pub fn status(&self) -> ModelStatus {
        match self.snapshot() {
            Ok(model) => ModelStatus {
                loaded: true,
                model: Some(model.metadata.clone()),
            },
            Err(_) => ModelStatus {
                loaded: false,
                model: None,
            },
        }
    }

    fn publish(
        &self,
        artifact: &ModelArtifact,
        source: Option<PathBuf>,
    ) -> Result<Arc<ActiveModel>, ModelLoadError> {
        let model = artifact.compile(self.minimum_version).map_err(|err| {
            warn!(
                model_version = %artifact.model_version,
                error = %err,
                "model artifact rejected"
            );
            err
        })?;

        let generation = self.generation.fetch_add(1, Ordering::Relaxed) + 1;
        let active = Arc::new(ActiveModel {
            metadata: ModelMetadata {
                model_version: artifact.model_version.clone(),
                artifact_version: artifact.version,
                kind: model.kind(),
                supports_explanation: model.attribution().is_some(),
                trained_at: artifact.trained_at,
                loaded_at: Utc::now(),
                source,
                generation,
            },
            model,
        });

        *self.active.write().unwrap_or_else(PoisonError::into_inner) = Some(Arc::clone(&active));

        info!(
            model_version = %active.metadata.model_version,
            kind = active.metadata.kind.label(),
            generation,
            "model artifact activated"
        );
        Ok(active)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::credit::features::{feature_names, FEATURE_COUNT};
    use crate::credit::model::{
        LogisticParameters, ModelParameters, ARTIFACT_FORMAT, CURRENT_ARTIFACT_VERSION,
    };

    fn artifact(version: &str, intercept: f64) -> ModelArtifact {
        ModelArtifact {
            format: ARTIFACT_FORMAT.to_string(),
            version: CURRENT_ARTIFACT_VERSION,
            model_version: version.to_string(),
            trained_at: None,
            feature_names: feature_names().map(str::to_string).collect(),
            model: ModelParameters::Logistic(LogisticParameters {
                intercept,
                coefficients: vec![0.0; FEATURE_COUNT],
                centers: vec![0.0; FEATURE_COUNT],
                scales: vec![1.0; FEATURE_COUNT],
            }),
        }
    }

    fn features() -> CustomerFeatures {
        CustomerFeatures::from_values(&[1.0; FEATURE_COUNT]).expect("valid")
    }

    #[test]
    fn scoring_requires_a_loaded_model() {
        let engine = ScoringEngine::default();
        assert_eq!(engine.score(&features()), Err(ScoringError::ModelNotLoaded));
        assert!(!engine.status().loaded);
    }

    #[test]
    fn install_then_unload_walks_the_lifecycle() {
        let engine = ScoringEngine::default();
        engine.install(&artifact("v1", 0.0)).expect("installs");
        assert!(engine.is_loaded());
        assert_eq!(engine.score(&features()), Ok(0.5));

        let previous = engine.unload().expect("was loaded");
        assert_eq!(previous.metadata().model_version, "v1");
        assert_eq!(engine.score(&features()), Err(ScoringError::ModelNotLoaded));
    }

    #[test]
    fn rejected_artifact_keeps_previous_model() {
        let engine = ScoringEngine::default();
        engine.install(&artifact("v1", 0.0)).expect("installs");

        let mut broken = artifact("v2", 0.0);
        broken.version = 1;
        assert!(engine.install(&broken).is_err());

        let status = engine.status();
        assert_eq!(status.model.expect("still loaded").model_version, "v1");
    }

    #[test]
    fn held_snapshot_survives_swap() {
        let engine = ScoringEngine::default();
        engine.install(&artifact("v1", 0.0)).expect("installs");
        let snapshot = engine.snapshot().expect("loaded");

        engine.install(&artifact("v2", 2.0)).expect("installs");

        assert_eq!(snapshot.score(&features()), Ok(0.5));
        assert_eq!(snapshot.metadata().generation, 1);
        let current = engine.snapshot().expect("loaded");
        assert_eq!(current.metadata().model_version, "v2");
        assert_eq!(current.metadata().generation, 2);
        assert!(current.score(&features()).expect("scores") > 0.5);
    }
}
