//! Trained model artifact: regressor, vocabularies and schema as one unit
//!
//! The artifact is created once by the trainer and is read-only afterwards.
//! Everything that influences a prediction is inside it and is integer-only,
//! so a save/load cycle reproduces predictions bit for bit.

use crate::encoder::FittedEncoder;
use crate::errors::{PriceError, Result};
use crate::fixed;
use crate::model::RegressorModel;
use crate::record::CarQuery;
use crate::serde_canon::hash_canonical_hex;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

/// Provenance recorded alongside the trained state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ArtifactMetadata {
    pub created_at: DateTime<Utc>,

    /// BLAKE3 digest of the dataset file the artifact was trained on
    pub dataset_fingerprint: String,

    /// Encoding and delimiter the dataset was read with
    pub encoding: String,
    pub delimiter: String,

    pub rows_trained: usize,
    pub rows_holdout: usize,

    /// Rows discarded by the encoder for missing values
    pub rows_dropped: usize,

    pub duplicates_removed: usize,
    pub seed: i64,

    /// Tree parameters as given to the trainer
    pub training_params: BTreeMap<String, String>,

    /// Evaluation metrics in fixed-point micro units (e.g. `r2_holdout`)
    pub metrics: BTreeMap<String, i64>,
}

/// Regressor plus everything needed to reproduce its input encoding
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelArtifact {
    pub regressor: RegressorModel,
    pub encoder: FittedEncoder,
    pub metadata: ArtifactMetadata,
}

impl ModelArtifact {
    pub fn new(
        regressor: RegressorModel,
        encoder: FittedEncoder,
        metadata: ArtifactMetadata,
    ) -> Result<Self> {
        let artifact = Self {
            regressor,
            encoder,
            metadata,
        };
        artifact
            .validate()
            .map_err(|e| PriceError::Training(format!("inconsistent artifact: {e}")))?;
        Ok(artifact)
    }

    /// Check the bundle is complete and internally consistent
    pub fn validate(&self) -> std::result::Result<(), String> {
        self.regressor.validate()?;
        self.encoder.validate()?;
        if self.encoder.schema.len() != self.regressor.feature_count {
            return Err(format!(
                "schema has {} columns but regressor expects {}",
                self.encoder.schema.len(),
                self.regressor.feature_count
            ));
        }
        Ok(())
    }

    /// Predict a fixed-point price for a query
    pub fn predict_fixed(&self, query: &CarQuery) -> Result<i64> {
        let aligned = self.encoder.encode(query)?;
        self.encoder.schema.check_vector(aligned.len())?;
        let price = self.regressor.predict(&aligned)?;
        debug!(brand = %query.brand, model = %query.model, price, "predicted");
        Ok(price)
    }

    /// Predict a price in BRL for a query
    pub fn predict(&self, query: &CarQuery) -> Result<f64> {
        self.predict_fixed(query).map(fixed::to_f64)
    }

    /// BLAKE3 hex digest of the canonical JSON form
    pub fn hash_hex(&self) -> Result<String> {
        Ok(hash_canonical_hex(self)?)
    }
}

#[cfg(test)]
pub(crate) mod test_support {
    use super::*;
    use crate::encoder;
    use crate::record::RawRecord;
    use crate::tree::{Node, Tree};

    pub fn records() -> Vec<RawRecord> {
        let row = |brand: &str, model: &str, fuel: &str, price: f64| RawRecord {
            year_of_reference: Some(2023),
            brand: Some(brand.into()),
            model: Some(model.into()),
            fuel: Some(fuel.into()),
            gear: Some("manual".into()),
            engine_size: Some(1.0),
            year_model: Some(2019),
            avg_price_brl: Some(price),
        };
        vec![
            row("A", "A1", "Flex", 30_000.0),
            row("B", "B1", "Flex", 60_000.0),
        ]
    }

    /// Stump splitting on `brand_encoded` at 0.5
    pub fn artifact() -> ModelArtifact {
        let encoded = encoder::fit(&records()).unwrap();
        let brand_idx = encoded
            .encoder
            .schema
            .columns()
            .iter()
            .position(|c| c == "brand_encoded")
            .unwrap() as i32;
        let tree = Tree::new(vec![
            Node::internal(0, brand_idx, fixed::SCALE / 2, 1, 2).with_samples(2),
            Node::leaf(1, encoded.targets[0]).with_samples(1),
            Node::leaf(2, encoded.targets[1]).with_samples(1),
        ]);
        let regressor = RegressorModel::new(tree, encoded.encoder.schema.len());
        let metadata = ArtifactMetadata {
            created_at: Utc::now(),
            dataset_fingerprint: "00".repeat(32),
            encoding: "windows-1252".to_string(),
            delimiter: ",".to_string(),
            rows_trained: 2,
            rows_holdout: 0,
            rows_dropped: 0,
            duplicates_removed: 0,
            seed: 42,
            training_params: BTreeMap::new(),
            metrics: BTreeMap::from([("r2_train".to_string(), 1_000_000)]),
        };
        ModelArtifact::new(regressor, encoded.encoder, metadata).unwrap()
    }
}
