/*!
Fixed-length windows over a scaled series, and their chronological train/test split
*/
use crate::error::ForecastError;
use crate::CpuFloat;

/// A run of consecutive scaled values, paired with the value immediately following it
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Window<'a, F = CpuFloat> {
    /// The index of the first input value in the source series
    pub start: usize,
    /// The input values, oldest first
    pub input: &'a [F],
    /// The value following the input
    pub target: F,
}

impl<'a, F> Window<'a, F> {
    /// The index of the target in the source series
    #[inline]
    pub fn target_index(&self) -> usize {
        self.start + self.input.len()
    }
}

/// Slide a window of `length` values over `series` with a step of one.
///
/// A series of `n` values yields `n - length` windows; fails if that is not at least one.
pub fn build_windows<F: Copy>(series: &[F], length: usize) -> Result<Vec<Window<'_, F>>, ForecastError> {
    if length == 0 || series.len() <= length {
        return Err(ForecastError::too_short(series.len(), length));
    }
    Ok(series
        .windows(length + 1)
        .enumerate()
        .map(|(start, w)| Window {
            start,
            input: &w[..length],
            target: w[length],
        })
        .collect())
}

/// A chronological partition of windows
#[derive(Debug, Clone, PartialEq)]
pub struct Split<'a, F = CpuFloat> {
    /// The oldest windows, used for training
    pub train: Vec<Window<'a, F>>,
    /// The newest windows, held out for evaluation
    pub test: Vec<Window<'a, F>>,
}

/// Split windows into a training prefix holding `floor(fraction * n)` windows and a test suffix holding the rest.
///
/// Order is preserved; fails if either side would be empty.
pub fn train_test_split<F>(mut windows: Vec<Window<'_, F>>, fraction: f64) -> Result<Split<'_, F>, ForecastError> {
    let total = windows.len();
    let train_size = (total as f64 * fraction) as usize;
    if train_size == 0 || train_size >= total {
        return Err(ForecastError::InsufficientData(format!(
            "{} windows cannot be split into non-empty training and testing sets",
            total
        )));
    }
    let test = windows.split_off(train_size);
    Ok(Split {
        train: windows,
        test,
    })
}
