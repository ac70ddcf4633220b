use super::domain::CustomerId;
use super::features::RawCustomerRecord;

/// Source of raw customer records (warehouse, feature store, CSV snapshot, ...).
pub trait CustomerRepository: Send + Sync {
    fn fetch(&self, id: &CustomerId) -> Result<Option<RawCustomerRecord>, RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum RepositoryError {
    #[error("customer {0} not found")]
    NotFound(CustomerId),
    #[error("customer repository unavailable: {0}")]
    Unavailable(String),
}
