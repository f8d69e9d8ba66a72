//! Train-or-load price estimator
//!
//! [`PriceEstimator::initialize`] loads the dataset, reuses the stored
//! artifact when it was trained on the same dataset file with the same
//! settings, and trains and persists a fresh one otherwise. After
//! initialization the estimator is read-only.

use fipe_price_core::{
    CarQuery, ChoiceLists, Dataset, ModelArtifact, ModelStore, PriceError, Result as CoreResult,
};
use tracing::{info, warn};

use crate::config::EstimatorConfig;
use crate::errors::Result;
use crate::trainer::{Trainer, TrainingParams};

/// How the artifact in use was obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArtifactSource {
    Loaded,
    Trained,
}

/// Load the stored artifact for `dataset`, training and saving a new one
/// when it is missing, corrupt, stale or `force` is set.
pub fn ensure_artifact(
    dataset: &Dataset,
    store: &ModelStore,
    params: &TrainingParams,
    force: bool,
) -> CoreResult<(ModelArtifact, ArtifactSource)> {
    if !force {
        match store.load() {
            Ok(artifact) => match stale_reason(&artifact, dataset, params) {
                None => {
                    info!(path = %store.path().display(), "using stored model artifact");
                    return Ok((artifact, ArtifactSource::Loaded));
                }
                Some(reason) => {
                    warn!(%reason, "model artifact is out of date; retraining");
                }
            },
            Err(PriceError::ArtifactNotFound(path)) => {
                info!(path = %path.display(), "no model artifact found; training");
            }
            Err(err @ PriceError::ArtifactCorrupt(_)) => {
                warn!(error = %err, "discarding model artifact; retraining");
            }
            Err(err) => return Err(err),
        }
    }

    let artifact = Trainer::new(params.clone()).train(dataset)?;
    store.save(&artifact)?;
    Ok((artifact, ArtifactSource::Trained))
}

/// Why a stored artifact no longer matches the dataset or the training
/// settings, if it does not
fn stale_reason(
    artifact: &ModelArtifact,
    dataset: &Dataset,
    params: &TrainingParams,
) -> Option<String> {
    let metadata = &artifact.metadata;
    let delimiter = char::from(dataset.delimiter()).to_string();

    if metadata.dataset_fingerprint != dataset.fingerprint() {
        Some(format!(
            "trained on dataset {}, current dataset is {}",
            metadata.dataset_fingerprint,
            dataset.fingerprint()
        ))
    } else if metadata.encoding != dataset.encoding() {
        Some(format!(
            "trained with encoding {}, dataset read as {}",
            metadata.encoding,
            dataset.encoding()
        ))
    } else if metadata.delimiter != delimiter {
        Some(format!(
            "trained with delimiter {:?}, dataset read with {:?}",
            metadata.delimiter, delimiter
        ))
    } else if metadata.seed != params.seed {
        Some(format!("trained with seed {}, configured {}", metadata.seed, params.seed))
    } else if metadata.training_params != params.to_metadata() {
        Some(format!(
            "trained with {:?}, configured {:?}",
            metadata.training_params,
            params.to_metadata()
        ))
    } else {
        None
    }
}

/// Inference API over a trained artifact and the dataset's choice lists
pub struct PriceEstimator {
    dataset: Dataset,
    artifact: ModelArtifact,
    source: ArtifactSource,
}

impl PriceEstimator {
    /// Load the dataset and obtain an artifact as configured
    pub fn initialize(config: &EstimatorConfig) -> Result<Self> {
        Self::initialize_with(config, false)
    }

    /// Like [`initialize`](Self::initialize), optionally forcing retraining
    pub fn initialize_with(config: &EstimatorConfig, force: bool) -> Result<Self> {
        let dataset = config.dataset_loader()?.load(&config.dataset_path)?;
        let store = ModelStore::new(&config.artifact_path);
        let (artifact, source) =
            ensure_artifact(&dataset, &store, &config.training_params(), force)?;
        Ok(Self {
            dataset,
            artifact,
            source,
        })
    }

    pub fn choice_lists(&self) -> ChoiceLists {
        self.dataset.choice_lists()
    }

    pub fn models_for_brand(&self, brand: &str) -> Vec<String> {
        self.dataset.models_for_brand(brand)
    }

    /// Estimated price in BRL
    pub fn predict(&self, query: &CarQuery) -> CoreResult<f64> {
        self.artifact.predict(query)
    }

    pub fn artifact(&self) -> &ModelArtifact {
        &self.artifact
    }

    pub fn source(&self) -> ArtifactSource {
        self.source
    }
}
