use energy_credit::credit::{
    read_customer_records_from_path, CustomerId, CustomerImportError, CustomerRepository,
    RawCustomerRecord, RepositoryError, ScoringEngine,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
    pub(crate) engine: Arc<ScoringEngine>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryCustomerRepository {
    records: Arc<Mutex<HashMap<CustomerId, RawCustomerRecord>>>,
}

impl InMemoryCustomerRepository {
    pub(crate) fn from_records(records: impl IntoIterator<Item = RawCustomerRecord>) -> Self {
        let repository = Self::default();
        for record in records {
            repository.insert(record);
        }
        repository
    }

    pub(crate) fn from_csv(path: impl AsRef<Path>) -> Result<Self, CustomerImportError> {
        let records = read_customer_records_from_path(path)?;
        Ok(Self::from_records(records))
    }

    /// Insert or replace the record for its customer id.
    pub(crate) fn insert(&self, record: RawCustomerRecord) {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(record.customer_id.clone(), record);
    }

    pub(crate) fn len(&self) -> usize {
        self.records.lock().expect("repository mutex poisoned").len()
    }
}

impl CustomerRepository for InMemoryCustomerRepository {
    fn fetch(&self, id: &CustomerId) -> Result<Option<RawCustomerRecord>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use energy_credit::credit::RawValue;

    #[test]
    fn later_rows_replace_earlier_ones() {
        let repository = InMemoryCustomerRepository::from_records([
            RawCustomerRecord::new("KE-1").with("on_time_ratio", 0.5),
            RawCustomerRecord::new("KE-1").with("on_time_ratio", 0.9),
            RawCustomerRecord::new("KE-2"),
        ]);

        assert_eq!(repository.len(), 2);
        let record = repository
            .fetch(&CustomerId::from("KE-1"))
            .expect("fetch succeeds")
            .expect("record present");
        assert_eq!(record.fields["on_time_ratio"], RawValue::Number(0.9));
        assert!(repository
            .fetch(&CustomerId::from("KE-3"))
            .expect("fetch succeeds")
            .is_none());
    }

    #[test]
    fn loads_bundled_customer_export() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/../../data/customers.csv");
        let repository = InMemoryCustomerRepository::from_csv(path).expect("export parses");
        assert_eq!(repository.len(), 4);
    }
}
