//! Regression tree trainer
//!
//! Encodes a deduplicated dataset, holds out a seeded fraction of the rows
//! for evaluation, fits one CART tree on the rest and bundles the result
//! into a [`ModelArtifact`].

use chrono::Utc;
use fipe_price_core::{
    encoder, ArtifactMetadata, Dataset, ModelArtifact, RegressorModel, Result,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use crate::cart::{CartBuilder, TreeConfig};
use crate::metrics::RegressionMetrics;
use crate::split::{select, HoldoutSplit};

/// Default seed for the holdout shuffle
pub const DEFAULT_SEED: i64 = 42;

/// Default share of rows held out for evaluation
pub const DEFAULT_HOLDOUT_FRACTION: f64 = 0.2;

/// Training configuration
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainingParams {
    pub tree: TreeConfig,
    pub seed: i64,
    /// Share of rows held out, in `[0, 1)`; `0.0` trains on every row
    pub holdout_fraction: f64,
}

impl Default for TrainingParams {
    fn default() -> Self {
        Self {
            tree: TreeConfig::default(),
            seed: DEFAULT_SEED,
            holdout_fraction: DEFAULT_HOLDOUT_FRACTION,
        }
    }
}

impl TrainingParams {
    /// Parameters as recorded in artifact metadata, seed excluded
    pub fn to_metadata(&self) -> BTreeMap<String, String> {
        let mut params = self.tree.to_params();
        params.insert(
            "holdout_fraction".to_string(),
            self.holdout_fraction.to_string(),
        );
        params
    }
}

/// Single-tree regression trainer
pub struct Trainer {
    params: TrainingParams,
}

impl Trainer {
    pub fn new(params: TrainingParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &TrainingParams {
        &self.params
    }

    /// Train an artifact on the given dataset
    pub fn train(&self, dataset: &Dataset) -> Result<ModelArtifact> {
        let encoded = encoder::fit(&dataset.records())?;
        let split = HoldoutSplit::new(&encoded.features, self.params.holdout_fraction, self.params.seed);

        let (train_x, train_y) = select(&encoded.features, &encoded.targets, &split.train);

        info!(
            rows_trained = split.train.len(),
            rows_holdout = split.holdout.len(),
            features = encoded.encoder.schema.len(),
            seed = self.params.seed,
            "training regression tree"
        );

        let tree = CartBuilder::new(&train_x, &train_y, self.params.tree.clone())?.build();
        let regressor = RegressorModel::new(tree, encoded.encoder.schema.len());

        let mut metrics = BTreeMap::new();
        if let Some(m) = RegressionMetrics::evaluate(&regressor.tree, &train_x, &train_y) {
            metrics.insert("r2_train".to_string(), m.r2);
            metrics.insert("mae_train".to_string(), m.mae);
            info!(r2 = m.r2_f64(), mae = m.mae_f64(), "train metrics");
        }
        if split.has_holdout() {
            let (test_x, test_y) = select(&encoded.features, &encoded.targets, &split.holdout);
            if let Some(m) = RegressionMetrics::evaluate(&regressor.tree, &test_x, &test_y) {
                metrics.insert("r2_holdout".to_string(), m.r2);
                metrics.insert("mae_holdout".to_string(), m.mae);
                info!(r2 = m.r2_f64(), mae = m.mae_f64(), "holdout metrics");
            }
        }

        let metadata = ArtifactMetadata {
            created_at: Utc::now(),
            dataset_fingerprint: dataset.fingerprint().to_string(),
            encoding: dataset.encoding().to_string(),
            delimiter: char::from(dataset.delimiter()).to_string(),
            rows_trained: split.train.len(),
            rows_holdout: split.holdout.len(),
            rows_dropped: encoded.rows_dropped,
            duplicates_removed: dataset.duplicates_removed(),
            seed: self.params.seed,
            training_params: self.params.to_metadata(),
            metrics,
        };

        info!(
            depth = regressor.tree.depth(),
            leaves = regressor.tree.leaf_count(),
            "training complete"
        );

        ModelArtifact::new(regressor, encoded.encoder, metadata)
    }
}
