//! Estimator configuration
//!
//! Layered with the `config` crate: built-in defaults, then an optional TOML
//! file, then `FIPE__*` environment variables (e.g. `FIPE__TREE__MAX_DEPTH`).

use config::{Config, Environment, File as ConfigFile};
use fipe_price_core::dataset::DEFAULT_ENCODING;
use fipe_price_core::DatasetLoader;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::cart::TreeConfig;
use crate::errors::{Result, TrainerError};
use crate::trainer::{TrainingParams, DEFAULT_HOLDOUT_FRACTION, DEFAULT_SEED};

/// Config file picked up from the working directory when `--config` is not given
pub const DEFAULT_CONFIG_FILE: &str = "fipe-price.toml";

/// Environment variable prefix
pub const ENV_PREFIX: &str = "FIPE";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Pretty,
    Compact,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimatorConfig {
    pub dataset_path: PathBuf,
    pub artifact_path: PathBuf,
    /// WHATWG encoding label of the dataset file
    pub encoding: String,
    pub delimiter: String,
    pub seed: i64,
    pub holdout_fraction: f64,
    pub tree: TreeConfig,
    pub log_level: String,
    pub log_format: LogFormat,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            dataset_path: PathBuf::from("dataset/fipe_cars.csv"),
            artifact_path: PathBuf::from("models/car_price_model.json"),
            encoding: DEFAULT_ENCODING.to_string(),
            delimiter: ",".to_string(),
            seed: DEFAULT_SEED,
            holdout_fraction: DEFAULT_HOLDOUT_FRACTION,
            tree: TreeConfig::default(),
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
        }
    }
}

impl EstimatorConfig {
    /// Load configuration from defaults, file and environment.
    ///
    /// An explicit `config_path` must exist; otherwise `fipe-price.toml` is
    /// used only when present.
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let resolved_path = match config_path {
            Some(path) if !path.exists() => {
                return Err(TrainerError::InvalidConfig(format!(
                    "configuration file {} not found",
                    path.display()
                )));
            }
            Some(path) => Some(path.to_path_buf()),
            None => Some(PathBuf::from(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
        };

        let mut builder = Config::builder().add_source(Config::try_from(&Self::default())?);

        if let Some(path) = &resolved_path {
            builder = builder.add_source(ConfigFile::from(path.as_path()));
        }

        builder = builder.add_source(
            Environment::with_prefix(ENV_PREFIX)
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(0.0..1.0).contains(&self.holdout_fraction) {
            return Err(TrainerError::InvalidConfig(format!(
                "holdout_fraction must be in [0, 1), got {}",
                self.holdout_fraction
            )));
        }
        self.tree.validate().map_err(TrainerError::InvalidConfig)?;
        self.delimiter_byte()?;
        self.dataset_loader()?;
        Ok(())
    }

    pub fn delimiter_byte(&self) -> Result<u8> {
        match self.delimiter.as_bytes() {
            [byte] => Ok(*byte),
            _ => Err(TrainerError::InvalidConfig(format!(
                "delimiter must be a single byte, got {:?}",
                self.delimiter
            ))),
        }
    }

    pub fn dataset_loader(&self) -> Result<DatasetLoader> {
        let delimiter = self.delimiter_byte()?;
        DatasetLoader::new(&self.encoding, delimiter)
            .map_err(|e| TrainerError::InvalidConfig(e.to_string()))
    }

    pub fn training_params(&self) -> TrainingParams {
        TrainingParams {
            tree: self.tree.clone(),
            seed: self.seed,
            holdout_fraction: self.holdout_fraction,
        }
    }
}
