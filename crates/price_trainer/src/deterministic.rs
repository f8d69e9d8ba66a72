//! Deterministic utilities for reproducible training
//!
//! Provides hash-based row ordering and split tie-breaking so that the same
//! dataset and seed always yield the same tree on every platform.

/// Deterministic xxhash64-like hash in pure i64 arithmetic
/// Simplified version for row ordering
pub fn xxhash64_i64(data: &[i64], seed: i64) -> i64 {
    const PRIME1: i64 = 0x9E3779B185EBCA87_u64 as i64;
    const PRIME2: i64 = 0xC2B2AE3D27D4EB4F_u64 as i64;
    const PRIME3: i64 = 0x165667B19E3779F9_u64 as i64;
    const PRIME5: i64 = 0x85EBCA77C2B2AE63_u64 as i64;

    let mut h = seed.wrapping_add(PRIME5);

    for &val in data {
        h = h.wrapping_add(val.wrapping_mul(PRIME3));
        h = h.rotate_left(17).wrapping_mul(PRIME2);
    }

    h ^= h >> 33;
    h = h.wrapping_mul(PRIME1);
    h ^= h >> 29;
    h = h.wrapping_mul(PRIME2);
    h ^= h >> 32;

    h
}

/// Row order for a seeded shuffle.
///
/// Rows are ranked by the hash of their position and contents; the position
/// keeps identical rows distinct and the sort is total, so the permutation
/// depends only on the rows and the seed.
pub fn shuffled_indices(rows: &[Vec<i64>], seed: i64) -> Vec<usize> {
    let mut keyed: Vec<(i64, usize)> = rows
        .iter()
        .enumerate()
        .map(|(i, row)| {
            let mut data = Vec::with_capacity(row.len() + 1);
            data.push(i as i64);
            data.extend_from_slice(row);
            (xxhash64_i64(&data, seed), i)
        })
        .collect();

    keyed.sort_unstable();
    keyed.into_iter().map(|(_, i)| i).collect()
}

/// Deterministic tie-breaker for split selection
/// Lower `(feature_idx, threshold)` wins among equal-gain candidates
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct SplitTieBreaker {
    pub feature_idx: usize,
    pub threshold: i64,
}

impl SplitTieBreaker {
    pub fn new(feature_idx: usize, threshold: i64) -> Self {
        Self {
            feature_idx,
            threshold,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_xxhash64_determinism() {
        let data = vec![1, 2, 3, 4, 5];
        assert_eq!(xxhash64_i64(&data, 42), xxhash64_i64(&data, 42));
        assert_ne!(xxhash64_i64(&data, 42), xxhash64_i64(&data, 43));
    }

    #[test]
    fn test_shuffle_is_a_seeded_permutation() {
        let rows: Vec<Vec<i64>> = (0..50).map(|i| vec![i % 3, i % 5]).collect();

        let a = shuffled_indices(&rows, 42);
        let b = shuffled_indices(&rows, 42);
        let c = shuffled_indices(&rows, 7);
        assert_eq!(a, b);
        assert_ne!(a, c);

        let mut sorted = a.clone();
        sorted.sort_unstable();
        assert_eq!(sorted, (0..50).collect::<Vec<_>>());
    }

    #[test]
    fn test_tie_breaker_ordering() {
        let t1 = SplitTieBreaker::new(0, 100);
        let t2 = SplitTieBreaker::new(0, 200);
        let t3 = SplitTieBreaker::new(1, 50);

        assert!(t1 < t2);
        assert!(t2 < t3);
    }
}
