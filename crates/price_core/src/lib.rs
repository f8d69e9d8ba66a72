//! Deterministic pricing core for FIPE used-car estimates
//!
//! Turns raw FIPE rows into a fixed numeric feature schema, evaluates a
//! regression tree on aligned vectors, and persists the trained state as one
//! hash-verified artifact.
//!
//! Modules:
//! - `dataset`: Encoding-aware CSV loading and exact deduplication
//! - `encoder`: Fit/transform of label and one-hot encodings
//! - `vocabulary`: Immutable first-seen label vocabularies
//! - `schema`: Frozen column schema and name-based alignment
//! - `tree` / `model`: Integer-only regression tree inference
//! - `artifact` / `store`: Bundled trained state and atomic persistence

pub mod artifact;
pub mod dataset;
pub mod encoder;
pub mod errors;
pub mod fixed;
pub mod model;
pub mod record;
pub mod schema;
pub mod serde_canon;
pub mod store;
pub mod tree;
pub mod vocabulary;

pub use artifact::{ArtifactMetadata, ModelArtifact};
pub use dataset::{ChoiceLists, Dataset, DatasetLoader};
pub use encoder::{EncodedDataset, FittedEncoder};
pub use errors::{PriceError, Result};
pub use fixed::SCALE;
pub use model::RegressorModel;
pub use record::{CarQuery, RawRecord};
pub use schema::{FeatureSchema, NamedFeatures};
pub use store::ModelStore;
pub use tree::{Node, Tree};
pub use vocabulary::Vocabulary;

/// Crate version string for artifact metadata
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
