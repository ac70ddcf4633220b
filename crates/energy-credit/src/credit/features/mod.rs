//! Fixed 40-field scoring schema and the builder that maps raw customer records onto it.

mod builder;
pub mod schema;
mod vector;

pub use builder::{FeatureVectorBuilder, RawCustomerRecord, RawValue, SchemaError};
pub use schema::{
    feature_index, feature_names, FeatureFamily, FeatureKind, FeatureSpec, Imputation,
    ValueDomain, FEATURE_COUNT, FEATURE_SCHEMA, LOCATION_TYPES,
};
pub use vector::CustomerFeatures;
