//! FIPE price trainer - deterministic offline regression tree trainer
//!
//! Fits a single CART regression tree on the encoded FIPE table, evaluates
//! it on a seeded holdout and exposes the train-or-load [`PriceEstimator`].

pub mod cart;
pub mod config;
pub mod deterministic;
pub mod errors;
pub mod estimator;
pub mod metrics;
pub mod split;
pub mod trainer;

pub use cart::{CartBuilder, TreeConfig};
pub use crate::config::{EstimatorConfig, LogFormat};
pub use deterministic::SplitTieBreaker;
pub use errors::TrainerError;
pub use estimator::{ensure_artifact, ArtifactSource, PriceEstimator};
pub use metrics::RegressionMetrics;
pub use split::HoldoutSplit;
pub use trainer::{Trainer, TrainingParams};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
