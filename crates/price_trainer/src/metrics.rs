//! Regression quality metrics in fixed-point micro units

use fipe_price_core::fixed;
use fipe_price_core::Tree;
use fipe_price_core::SCALE;

/// Coefficient of determination and mean absolute error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RegressionMetrics {
    /// R² scaled by `SCALE` (1.0 == SCALE); 0 for constant targets
    pub r2: i64,
    /// Mean absolute error in target units, scaled by `SCALE`
    pub mae: i64,
    pub rows: usize,
}

impl RegressionMetrics {
    pub fn compute(predictions: &[i64], targets: &[i64]) -> Option<Self> {
        if predictions.is_empty() || predictions.len() != targets.len() {
            return None;
        }
        let n = targets.len() as i128;

        let mean = fixed::mean(targets.iter().copied())?;
        let mut ss_res: i128 = 0;
        let mut ss_tot: i128 = 0;
        let mut abs_sum: i128 = 0;
        for (&p, &t) in predictions.iter().zip(targets) {
            let err = i128::from(t) - i128::from(p);
            ss_res += err * err;
            abs_sum += err.abs();
            let dev = i128::from(t) - i128::from(mean);
            ss_tot += dev * dev;
        }

        // ss values are in micro² units; the ratio is unitless
        let r2 = if ss_tot == 0 {
            0
        } else {
            SCALE as i128 - ss_res * SCALE as i128 / ss_tot
        };

        Some(Self {
            r2: r2.clamp(i64::MIN as i128, i64::MAX as i128) as i64,
            mae: (abs_sum / n) as i64,
            rows: targets.len(),
        })
    }

    /// Evaluate `tree` on `features` and score it against `targets`
    pub fn evaluate(tree: &Tree, features: &[Vec<i64>], targets: &[i64]) -> Option<Self> {
        let predictions: Option<Vec<i64>> = features.iter().map(|row| tree.evaluate(row)).collect();
        Self::compute(&predictions?, targets)
    }

    pub fn r2_f64(&self) -> f64 {
        fixed::to_f64(self.r2)
    }

    pub fn mae_f64(&self) -> f64 {
        fixed::to_f64(self.mae)
    }
}
