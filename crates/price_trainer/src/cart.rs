//! CART (Classification and Regression Tree) builder
//!
//! Deterministic exact-greedy regression tree construction with fixed-point
//! arithmetic only. Splits minimise the summed squared error of the children;
//! candidate thresholds are midpoints between consecutive distinct values of
//! a feature, and `value <= threshold` goes left.
//!
//! Each feature column is sorted once up front. A node carries, per feature,
//! its samples in that feature's order, and splitting partitions those lists
//! stably, so no node ever re-sorts.

use fipe_price_core::fixed;
use fipe_price_core::{Node, PriceError, Result, Tree};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::deterministic::SplitTieBreaker;

/// Training parameters for the tree
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct TreeConfig {
    /// Maximum depth; `None` grows until leaves are pure or too small
    pub max_depth: Option<usize>,
    /// Minimum samples a node needs to be considered for splitting
    pub min_samples_split: usize,
    /// Minimum samples on each side of a split
    pub min_samples_leaf: usize,
}

impl Default for TreeConfig {
    fn default() -> Self {
        Self {
            max_depth: None,
            min_samples_split: 2,
            min_samples_leaf: 1,
        }
    }
}

impl TreeConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.min_samples_leaf == 0 {
            return Err("min_samples_leaf must be at least 1".to_string());
        }
        if self.min_samples_split < 2 {
            return Err("min_samples_split must be at least 2".to_string());
        }
        Ok(())
    }

    /// Parameters as recorded in artifact metadata
    pub fn to_params(&self) -> BTreeMap<String, String> {
        BTreeMap::from([
            (
                "max_depth".to_string(),
                self.max_depth
                    .map_or_else(|| "none".to_string(), |d| d.to_string()),
            ),
            (
                "min_samples_split".to_string(),
                self.min_samples_split.to_string(),
            ),
            (
                "min_samples_leaf".to_string(),
                self.min_samples_leaf.to_string(),
            ),
        ])
    }
}

/// Split candidate with score and tie-breaker
#[derive(Debug, Clone)]
struct SplitCandidate {
    feature_idx: usize,
    threshold: i64,
    /// Σ_left² / n_left + Σ_right² / n_right; larger means lower squared error
    score: i128,
    tie_breaker: SplitTieBreaker,
}

impl SplitCandidate {
    fn new(feature_idx: usize, threshold: i64, score: i128) -> Self {
        Self {
            feature_idx,
            threshold,
            score,
            tie_breaker: SplitTieBreaker::new(feature_idx, threshold),
        }
    }

    fn beats(&self, other: &SplitCandidate) -> bool {
        self.score > other.score
            || (self.score == other.score && self.tie_breaker < other.tie_breaker)
    }
}

/// Node awaiting construction
struct PendingNode {
    node_id: usize,
    depth: usize,
    /// Per feature, this node's samples in ascending feature order
    sorted: Vec<Vec<usize>>,
}

/// Build a regression tree using the exact-greedy CART algorithm
pub struct CartBuilder<'a> {
    config: TreeConfig,
    features: &'a [Vec<i64>],
    targets: &'a [i64],
    feature_count: usize,
}

impl<'a> CartBuilder<'a> {
    pub fn new(features: &'a [Vec<i64>], targets: &'a [i64], config: TreeConfig) -> Result<Self> {
        if features.is_empty() {
            return Err(PriceError::Training("cannot fit a tree on zero rows".into()));
        }
        if features.len() != targets.len() {
            return Err(PriceError::Training(format!(
                "{} feature rows but {} targets",
                features.len(),
                targets.len()
            )));
        }

        let feature_count = features[0].len();
        if feature_count == 0 {
            return Err(PriceError::Training("cannot fit a tree without features".into()));
        }
        if let Some(row) = features.iter().find(|row| row.len() != feature_count) {
            return Err(PriceError::SchemaMismatch {
                expected: feature_count,
                actual: row.len(),
            });
        }

        config.validate().map_err(PriceError::Training)?;

        Ok(Self {
            config,
            features,
            targets,
            feature_count,
        })
    }

    /// Build tree and return nodes
    pub fn build(&self) -> Tree {
        let n = self.features.len();
        let sorted: Vec<Vec<usize>> = (0..self.feature_count)
            .map(|f| {
                let mut order: Vec<usize> = (0..n).collect();
                order.sort_by_key(|&i| (self.features[i][f], i));
                order
            })
            .collect();

        // `goes_left` is scratch space shared by all nodes; only the current
        // node's samples are read after being written.
        let mut goes_left = vec![false; n];
        let mut nodes = vec![Node::leaf(0, 0)];
        let mut stack = vec![PendingNode {
            node_id: 0,
            depth: 0,
            sorted,
        }];

        while let Some(pending) = stack.pop() {
            let samples = self.node_samples(&pending);
            let count = samples.len();
            let leaf_value = fixed::mean(samples.iter().map(|&i| self.targets[i])).unwrap_or(0);

            let split = if self.can_split(count, pending.depth) {
                self.find_best_split(&pending.sorted)
            } else {
                None
            };

            let Some(split) = split else {
                nodes[pending.node_id] =
                    Node::leaf(pending.node_id as i32, leaf_value).with_samples(count as u64);
                continue;
            };

            for &i in samples {
                goes_left[i] = self.features[i][split.feature_idx] <= split.threshold;
            }

            let (left_sorted, right_sorted): (Vec<Vec<usize>>, Vec<Vec<usize>>) = pending
                .sorted
                .iter()
                .map(|order| order.iter().copied().partition(|&i| goes_left[i]))
                .unzip();

            let left_id = nodes.len();
            let right_id = left_id + 1;
            nodes.push(Node::leaf(left_id as i32, 0));
            nodes.push(Node::leaf(right_id as i32, 0));

            nodes[pending.node_id] = Node::internal(
                pending.node_id as i32,
                split.feature_idx as i32,
                split.threshold,
                left_id as i32,
                right_id as i32,
            )
            .with_samples(count as u64);

            // Left subtree is popped first
            stack.push(PendingNode {
                node_id: right_id,
                depth: pending.depth + 1,
                sorted: right_sorted,
            });
            stack.push(PendingNode {
                node_id: left_id,
                depth: pending.depth + 1,
                sorted: left_sorted,
            });
        }

        Tree::new(nodes)
    }

    fn node_samples<'p>(&self, pending: &'p PendingNode) -> &'p [usize] {
        pending.sorted.first().map(Vec::as_slice).unwrap_or(&[])
    }

    fn can_split(&self, count: usize, depth: usize) -> bool {
        self.config.max_depth.map_or(true, |max| depth < max)
            && count >= self.config.min_samples_split
            && count >= 2 * self.config.min_samples_leaf
    }

    /// Find the split with the lowest children squared error
    ///
    /// Returns `None` when no split strictly improves on the parent, which
    /// includes nodes whose targets are all equal.
    fn find_best_split(&self, sorted: &[Vec<usize>]) -> Option<SplitCandidate> {
        let samples = sorted.first()?;
        let n = samples.len();
        let total: i128 = samples.iter().map(|&i| i128::from(self.targets[i])).sum();
        let parent_score = total * total / n as i128;
        let min_leaf = self.config.min_samples_leaf;

        let mut best: Option<SplitCandidate> = None;

        for (feature_idx, order) in sorted.iter().enumerate() {
            let mut left_sum: i128 = 0;

            for pos in 0..n - 1 {
                let i = order[pos];
                left_sum += i128::from(self.targets[i]);

                let value = self.features[i][feature_idx];
                let next = self.features[order[pos + 1]][feature_idx];
                if value == next {
                    continue;
                }

                let left_n = pos + 1;
                let right_n = n - left_n;
                if left_n < min_leaf || right_n < min_leaf {
                    continue;
                }

                let right_sum = total - left_sum;
                let score =
                    left_sum * left_sum / left_n as i128 + right_sum * right_sum / right_n as i128;
                if score <= parent_score {
                    continue;
                }

                let threshold = value + (next - value) / 2;
                let candidate = SplitCandidate::new(feature_idx, threshold, score);
                if best.as_ref().map_or(true, |b| candidate.beats(b)) {
                    best = Some(candidate);
                }
            }
        }

        best
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fipe_price_core::SCALE;

    #[test]
    fn test_perfect_fit_on_separable_data() {
        let features = vec![
            vec![1 * SCALE, 0],
            vec![2 * SCALE, 0],
            vec![3 * SCALE, SCALE],
            vec![4 * SCALE, SCALE],
        ];
        let targets = vec![10 * SCALE, 10 * SCALE, 50 * SCALE, 50 * SCALE];

        let tree = CartBuilder::new(&features, &targets, TreeConfig::default())
            .unwrap()
            .build();

        assert!(tree.validate(2).is_ok());
        assert_eq!(tree.leaf_count(), 2);
        // feature 0 and feature 1 separate equally well; lower index wins
        assert_eq!(tree.nodes[0].feature_idx, 0);
        assert_eq!(tree.nodes[0].threshold, 2 * SCALE + SCALE / 2);
        for (row, &target) in features.iter().zip(&targets) {
            assert_eq!(tree.evaluate(row), Some(target));
        }
    }

    #[test]
    fn test_unlimited_depth_memorises_training_rows() {
        let features: Vec<Vec<i64>> = (0..32).map(|i| vec![i * SCALE, (i % 4) * SCALE]).collect();
        let targets: Vec<i64> = (0..32).map(|i| (i * i % 17) * SCALE).collect();

        let tree = CartBuilder::new(&features, &targets, TreeConfig::default())
            .unwrap()
            .build();

        assert!(tree.validate(2).is_ok());
        for (row, &target) in features.iter().zip(&targets) {
            assert_eq!(tree.evaluate(row), Some(target));
        }
    }

    #[test]
    fn test_max_depth_and_leaf_mean() {
        let features = vec![vec![0], vec![1], vec![2], vec![3]];
        let targets = vec![1, 2, 3, 4];
        let config = TreeConfig {
            max_depth: Some(0),
            ..TreeConfig::default()
        };

        let tree = CartBuilder::new(&features, &targets, config).unwrap().build();
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(3)); // mean 2.5 rounds away from zero
        assert_eq!(tree.nodes[0].samples, 4);
    }

    #[test]
    fn test_min_samples_leaf_respected() {
        let features: Vec<Vec<i64>> = (0..10).map(|i| vec![i]).collect();
        let targets: Vec<i64> = (0..10).map(|i| if i == 0 { 1000 } else { 0 }).collect();
        let config = TreeConfig {
            min_samples_leaf: 3,
            ..TreeConfig::default()
        };

        let tree = CartBuilder::new(&features, &targets, config).unwrap().build();
        for node in tree.nodes.iter().filter(|n| n.is_leaf()) {
            assert!(node.samples >= 3, "leaf {} has {} samples", node.id, node.samples);
        }
    }

    #[test]
    fn test_constant_targets_give_single_leaf() {
        let features = vec![vec![1], vec![2], vec![3]];
        let targets = vec![7, 7, 7];
        let tree = CartBuilder::new(&features, &targets, TreeConfig::default())
            .unwrap()
            .build();
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(7));
    }

    #[test]
    fn test_identical_features_cannot_split() {
        let features = vec![vec![5], vec![5]];
        let targets = vec![1, 9];
        let tree = CartBuilder::new(&features, &targets, TreeConfig::default())
            .unwrap()
            .build();
        assert_eq!(tree.nodes.len(), 1);
        assert_eq!(tree.nodes[0].leaf, Some(5));
    }

    #[test]
    fn test_deterministic_build() {
        let features: Vec<Vec<i64>> = (0..40).map(|i| vec![i % 7, i % 5, i % 3]).collect();
        let targets: Vec<i64> = (0..40).map(|i| (i * 31 % 11) * SCALE).collect();

        let a = CartBuilder::new(&features, &targets, TreeConfig::default())
            .unwrap()
            .build();
        let b = CartBuilder::new(&features, &targets, TreeConfig::default())
            .unwrap()
            .build();
        assert_eq!(a, b);
    }

    #[test]
    fn test_rejects_bad_input() {
        assert!(CartBuilder::new(&[], &[], TreeConfig::default()).is_err());
        assert!(CartBuilder::new(&[vec![1]], &[1, 2], TreeConfig::default()).is_err());
        assert!(CartBuilder::new(&[vec![1], vec![1, 2]], &[1, 2], TreeConfig::default()).is_err());

        let bad = TreeConfig {
            min_samples_leaf: 0,
            ..TreeConfig::default()
        };
        assert!(CartBuilder::new(&[vec![1]], &[1], bad).is_err());
    }
}
