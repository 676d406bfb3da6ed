/*!
Miscellaneous utilities for `stockcast`
*/

use chrono::{Duration, NaiveDate};
use num::{Float, NumCast};

/// The `n` calendar days following `last`, in increasing order
pub fn days_after(last: NaiveDate, n: usize) -> Vec<NaiveDate> {
    (1..=n as i64).map(|i| last + Duration::days(i)).collect()
}

/// Round a value to a given number of decimal places
pub fn round_to<F: Float>(value: F, decimals: i32) -> F {
    let factor: F = NumCast::from(10.0f64.powi(decimals)).unwrap_or_else(F::one);
    (value * factor).round() / factor
}

/// Cast a slice of floats to `f32`, mapping anything unrepresentable to NaN
pub fn to_gpu<F: Copy + NumCast>(values: &[F]) -> Vec<f32> {
    values
        .iter()
        .map(|v| NumCast::from(*v).unwrap_or(f32::NAN))
        .collect()
}
