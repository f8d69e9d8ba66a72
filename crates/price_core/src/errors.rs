//! Error types for the pricing core

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading data, encoding queries or handling artifacts
#[derive(Error, Debug)]
pub enum PriceError {
    /// Dataset file does not exist; training cannot proceed
    #[error("dataset not found: {}", .0.display())]
    DatasetNotFound(PathBuf),

    /// Dataset exists but is malformed
    #[error("dataset error: {0}")]
    Dataset(String),

    /// Categorical value absent from the fitted vocabulary
    #[error("unknown {field}: {value:?} was not seen during training")]
    UnknownCategory { field: &'static str, value: String },

    /// No artifact at the expected path
    #[error("model artifact not found: {}", .0.display())]
    ArtifactNotFound(PathBuf),

    /// Artifact exists but is partial, inconsistent or fails its hash check
    #[error("model artifact corrupt: {0}")]
    ArtifactCorrupt(String),

    /// Query field cannot be represented as a model input
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Feature vector disagrees with the frozen schema
    #[error("schema mismatch: expected {expected} features, got {actual}")]
    SchemaMismatch { expected: usize, actual: usize },

    /// Training could not produce a model
    #[error("training error: {0}")]
    Training(String),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// CSV parsing error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PriceError {
    /// Whether the store should fall back to retraining on this error
    pub fn is_missing_or_corrupt_artifact(&self) -> bool {
        matches!(
            self,
            PriceError::ArtifactNotFound(_) | PriceError::ArtifactCorrupt(_)
        )
    }
}

/// Result type for pricing core operations
pub type Result<T> = std::result::Result<T, PriceError>;
