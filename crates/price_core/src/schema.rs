//! Frozen feature schema and the inference-time aligner
//!
//! The schema is the ordered list of column names the regressor was trained
//! on. Queries are encoded into named columns and then reindexed against it
//! by name, never by position: columns the query did not produce are filled
//! with zero, columns the schema does not know are discarded.

use crate::errors::{PriceError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

pub const BRAND_ENCODED: &str = "brand_encoded";
pub const MODEL_ENCODED: &str = "model_encoded";
pub const FUEL_PREFIX: &str = "fuel_";
pub const GEAR_PREFIX: &str = "gear_";

/// Named fixed-point feature values produced by the encoder for one row
pub type NamedFeatures = BTreeMap<String, i64>;

/// Name of the indicator column for a one-hot category
pub fn one_hot_column(prefix: &str, value: &str) -> String {
    format!("{prefix}{value}")
}

/// Ordered, duplicate-free list of training column names
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FeatureSchema {
    columns: Vec<String>,
}

impl FeatureSchema {
    pub fn new(columns: Vec<String>) -> Result<Self> {
        Self::try_from(columns).map_err(PriceError::Training)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn len(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    pub fn contains(&self, column: &str) -> bool {
        self.columns.iter().any(|c| c == column)
    }

    /// Reindex named features to this schema.
    ///
    /// The result always has `self.len()` entries in schema order; absent
    /// columns are `0`.
    pub fn align(&self, features: &NamedFeatures) -> Vec<i64> {
        let aligned: Vec<i64> = self
            .columns
            .iter()
            .map(|column| features.get(column).copied().unwrap_or(0))
            .collect();

        for name in features.keys().filter(|name| !self.contains(name)) {
            debug!(column = %name, "discarding column absent from training schema");
        }

        aligned
    }

    /// Reject vectors whose length disagrees with the schema
    pub fn check_vector(&self, len: usize) -> Result<()> {
        if len != self.columns.len() {
            return Err(PriceError::SchemaMismatch {
                expected: self.columns.len(),
                actual: len,
            });
        }
        Ok(())
    }
}

impl TryFrom<Vec<String>> for FeatureSchema {
    type Error = String;

    fn try_from(columns: Vec<String>) -> std::result::Result<Self, Self::Error> {
        let mut seen = HashSet::with_capacity(columns.len());
        for column in &columns {
            if !seen.insert(column.as_str()) {
                return Err(format!("duplicate schema column: {column}"));
            }
        }
        Ok(Self { columns })
    }
}

impl From<FeatureSchema> for Vec<String> {
    fn from(schema: FeatureSchema) -> Self {
        schema.columns
    }
}
