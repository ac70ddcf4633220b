//! PAYG customer credit scoring: feature schema, model engine, explanations, decision policy,
//! and the service and HTTP surface composed from them.

pub mod domain;
pub mod explain;
pub mod features;
pub mod import;
pub mod model;
pub mod policy;
pub mod repository;
pub mod router;
pub mod service;

#[cfg(test)]
mod tests;

pub use domain::{CustomerId, FactorImpact, ScoreResult};
pub use explain::{Explanation, ExplanationError, ExplanationGenerator, DEFAULT_TOP_K};
pub use features::{
    CustomerFeatures, FeatureVectorBuilder, RawCustomerRecord, RawValue, SchemaError,
    FEATURE_COUNT,
};
pub use import::{read_customer_records, read_customer_records_from_path, CustomerImportError};
pub use model::{
    ActiveModel, CreditModel, ModelArtifact, ModelKind, ModelLoadError, ModelMetadata,
    ModelStatus, ScoringEngine, ScoringError,
};
pub use policy::{decide, Decision, InvalidProbability, RiskCategory};
pub use repository::{CustomerRepository, RepositoryError};
pub use router::credit_router;
pub use service::{
    BatchEntry, CreditScoringService, CreditServiceError, ScoringOptions, DEFAULT_BATCH_CONCURRENCY,
};
