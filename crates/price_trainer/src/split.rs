//! Seeded train/holdout split of encoded rows

use crate::deterministic::shuffled_indices;

/// Row indices assigned to each side of the split
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HoldoutSplit {
    pub train: Vec<usize>,
    pub holdout: Vec<usize>,
}

impl HoldoutSplit {
    /// Split `rows` so that `round(n * fraction)` rows are held out.
    ///
    /// Falls back to training on every row (in original order) when the
    /// holdout would be empty or would consume all rows.
    pub fn new(rows: &[Vec<i64>], fraction: f64, seed: i64) -> Self {
        let n = rows.len();
        let holdout_len = if fraction.is_finite() && fraction > 0.0 {
            (n as f64 * fraction).round() as usize
        } else {
            0
        };

        if holdout_len == 0 || holdout_len >= n {
            return Self {
                train: (0..n).collect(),
                holdout: Vec::new(),
            };
        }

        let order = shuffled_indices(rows, seed);
        let (holdout, train) = order.split_at(holdout_len);
        Self {
            train: train.to_vec(),
            holdout: holdout.to_vec(),
        }
    }

    pub fn has_holdout(&self) -> bool {
        !self.holdout.is_empty()
    }
}

/// Clone the selected rows and targets
pub fn select(features: &[Vec<i64>], targets: &[i64], indices: &[usize]) -> (Vec<Vec<i64>>, Vec<i64>) {
    indices
        .iter()
        .map(|&i| (features[i].clone(), targets[i]))
        .unzip()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rows(n: i64) -> Vec<Vec<i64>> {
        (0..n).map(|i| vec![i, i % 3]).collect()
    }

    #[test]
    fn test_eighty_twenty() {
        let split = HoldoutSplit::new(&rows(50), 0.2, 42);
        assert_eq!(split.holdout.len(), 10);
        assert_eq!(split.train.len(), 40);

        let mut all: Vec<usize> = split.train.iter().chain(&split.holdout).copied().collect();
        all.sort_unstable();
        assert_eq!(all, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_same_seed_same_split() {
        let data = rows(30);
        assert_eq!(HoldoutSplit::new(&data, 0.2, 42), HoldoutSplit::new(&data, 0.2, 42));
        assert_ne!(HoldoutSplit::new(&data, 0.2, 42), HoldoutSplit::new(&data, 0.2, 1));
    }

    #[test]
    fn test_degenerate_fractions_use_all_rows() {
        for (n, fraction) in [(10, 0.0), (2, 0.2), (3, 0.99), (0, 0.2)] {
            let split = HoldoutSplit::new(&rows(n), fraction, 42);
            assert!(!split.has_holdout());
            assert_eq!(split.train, (0..n as usize).collect::<Vec<_>>());
        }
    }

    #[test]
    fn test_select() {
        let features = rows(4);
        let targets = vec![10, 11, 12, 13];
        let (f, t) = select(&features, &targets, &[3, 1]);
        assert_eq!(f, vec![vec![3, 0], vec![1, 1]]);
        assert_eq!(t, vec![13, 11]);
    }
}
