//! Decision-tree regressor with deterministic integer inference

use crate::errors::{PriceError, Result};
use crate::fixed::SCALE;
use crate::tree::Tree;
use serde::{Deserialize, Serialize};

/// Current regressor format version
pub const MODEL_VERSION: i32 = 1;

/// Trained regression tree plus the input width it expects
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct RegressorModel {
    /// Model format version
    pub version: i32,

    /// Fixed-point scale of inputs, thresholds and leaf values
    pub scale: i64,

    /// Length of the aligned feature vector
    pub feature_count: usize,

    /// The fitted tree
    pub tree: Tree,
}

impl RegressorModel {
    pub fn new(tree: Tree, feature_count: usize) -> Self {
        Self {
            version: MODEL_VERSION,
            scale: SCALE,
            feature_count,
            tree,
        }
    }

    /// Validate model structure
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.version != MODEL_VERSION {
            return Err(format!("Unsupported model version: {}", self.version));
        }
        if self.scale != SCALE {
            return Err(format!("Unsupported scale: {}", self.scale));
        }
        self.tree
            .validate(self.feature_count)
            .map_err(|e| format!("Tree validation failed: {e}"))
    }

    /// Predict a fixed-point value for an aligned feature vector
    pub fn predict(&self, features: &[i64]) -> Result<i64> {
        if features.len() != self.feature_count {
            return Err(PriceError::SchemaMismatch {
                expected: self.feature_count,
                actual: features.len(),
            });
        }
        self.tree.evaluate(features).ok_or_else(|| {
            PriceError::ArtifactCorrupt("tree traversal did not reach a leaf".to_string())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::Node;

    fn create_test_model() -> RegressorModel {
        let tree = Tree::new(vec![
            Node::internal(0, 0, 50 * SCALE, 1, 2),
            Node::leaf(1, 100 * SCALE),
            Node::internal(2, 1, 30 * SCALE, 3, 4),
            Node::leaf(3, -50 * SCALE),
            Node::leaf(4, 50 * SCALE),
        ]);
        RegressorModel::new(tree, 2)
    }

    #[test]
    fn test_model_inference() {
        let model = create_test_model();
        assert!(model.validate().is_ok());
        assert_eq!(model.predict(&[30 * SCALE, 0]).unwrap(), 100 * SCALE);
        assert_eq!(model.predict(&[60 * SCALE, 20 * SCALE]).unwrap(), -50 * SCALE);
        assert_eq!(model.predict(&[60 * SCALE, 40 * SCALE]).unwrap(), 50 * SCALE);
    }

    #[test]
    fn test_wrong_vector_length_is_schema_mismatch() {
        let model = create_test_model();
        assert!(matches!(
            model.predict(&[1, 2, 3]),
            Err(PriceError::SchemaMismatch {
                expected: 2,
                actual: 3
            })
        ));
    }

    #[test]
    fn test_model_validation() {
        let mut invalid = create_test_model();
        invalid.version = 999;
        assert!(invalid.validate().is_err());

        let mut narrow = create_test_model();
        narrow.feature_count = 1;
        assert!(narrow.validate().is_err());
    }

    #[test]
    fn test_json_roundtrip_is_exact() {
        let model = create_test_model();
        let json = serde_json::to_string(&model).unwrap();
        let restored: RegressorModel = serde_json::from_str(&json).unwrap();
        assert_eq!(model, restored);
    }
}
