//! Fixed-point conversions shared by the encoder, the tree and the trainer.
//!
//! Every model input, threshold, leaf value and target is an `i64` in micro
//! units. Floats only appear at the edges: when a CSV cell or a query field is
//! read, and when a prediction is handed back to the caller.

/// Scaling factor: 1 unit = 10^-6.
pub const SCALE: i64 = 1_000_000;

/// Indicator value for a present one-hot column.
pub const ONE: i64 = SCALE;

/// Convert a float to fixed-point, rounding half away from zero.
///
/// Returns `None` for NaN, infinities and values outside the `i64` range.
pub fn to_fixed(value: f64) -> Option<i64> {
    if !value.is_finite() {
        return None;
    }
    let scaled = (value * SCALE as f64).round();
    if scaled < i64::MIN as f64 || scaled > i64::MAX as f64 {
        return None;
    }
    Some(scaled as i64)
}

/// Convert a whole integer to fixed-point.
///
/// Returns `None` when the scaled value does not fit in an `i64`.
#[inline]
pub fn from_integer(value: i64) -> Option<i64> {
    value.checked_mul(SCALE)
}

/// Convert a fixed-point value back to a float.
#[inline]
pub fn to_f64(value: i64) -> f64 {
    value as f64 / SCALE as f64
}

/// Integer mean of fixed-point values, rounded half away from zero.
pub fn mean(values: impl IntoIterator<Item = i64>) -> Option<i64> {
    let mut sum: i128 = 0;
    let mut count: i128 = 0;
    for v in values {
        sum += i128::from(v);
        count += 1;
    }
    if count == 0 {
        return None;
    }
    Some(div_round(sum, count) as i64)
}

/// Signed division rounding half away from zero.
pub(crate) fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if (numerator < 0) != (denominator < 0) {
        (numerator - half) / denominator
    } else {
        (numerator + half) / denominator
    }
}
