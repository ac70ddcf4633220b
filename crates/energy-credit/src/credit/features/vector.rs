use std::collections::BTreeMap;

use serde::ser::SerializeMap;
use serde::{Serialize, Serializer};

use super::builder::SchemaError;
use super::schema::{feature_index, FEATURE_COUNT, FEATURE_SCHEMA};

/// Fully populated feature vector in schema order.
///
/// Every value is finite; construction goes through [`CustomerFeatures::from_values`] or the
/// feature vector builder, both of which enforce the schema.
#[derive(Debug, Clone, PartialEq)]
pub struct CustomerFeatures {
    values: [f64; FEATURE_COUNT],
}

impl CustomerFeatures {
    pub fn from_values(values: &[f64]) -> Result<Self, SchemaError> {
        if values.len() != FEATURE_COUNT {
            return Err(SchemaError::WrongLength {
                expected: FEATURE_COUNT,
                actual: values.len(),
            });
        }

        let mut vector = [0.0; FEATURE_COUNT];
        for (index, (slot, value)) in vector.iter_mut().zip(values).enumerate() {
            if !value.is_finite() {
                return Err(SchemaError::NonFinite {
                    feature: FEATURE_SCHEMA[index].name,
                });
            }
            *slot = *value;
        }

        Ok(Self { values: vector })
    }

    pub(crate) fn from_array(values: [f64; FEATURE_COUNT]) -> Self {
        Self { values }
    }

    pub fn values(&self) -> &[f64; FEATURE_COUNT] {
        &self.values
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        feature_index(name).map(|index| self.values[index])
    }

    /// Return a copy with one feature replaced.
    pub fn with_value(&self, name: &str, value: f64) -> Result<Self, SchemaError> {
        let index = feature_index(name).ok_or_else(|| SchemaError::UnknownFeature {
            feature: name.to_string(),
        })?;
        if !value.is_finite() {
            return Err(SchemaError::NonFinite {
                feature: FEATURE_SCHEMA[index].name,
            });
        }
        let mut values = self.values;
        values[index] = value;
        Ok(Self { values })
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, f64)> + '_ {
        FEATURE_SCHEMA
            .iter()
            .zip(self.values.iter())
            .map(|(spec, value)| (spec.name, *value))
    }

    pub fn to_map(&self) -> BTreeMap<&'static str, f64> {
        self.iter().collect()
    }
}

impl Serialize for CustomerFeatures {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(FEATURE_COUNT))?;
        for (name, value) in self.iter() {
            map.serialize_entry(name, &value)?;
        }
        map.end()
    }
}
