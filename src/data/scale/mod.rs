/*!
Input data scaling
*/
use crate::error::ForecastError;
use crate::CpuFloat;
use itertools::{Itertools, MinMaxResult};
use num::Float;

/// Min-max scaling onto `[0, 1]`, fit once on a full series
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct MinMaxScaler<F = CpuFloat> {
    /// The smallest value seen when fitting
    pub min: F,
    /// The largest value seen when fitting
    pub max: F,
}

impl<F> MinMaxScaler<F>
where
    F: Copy + Float,
{
    /// Fit a scaler to a series of values.
    ///
    /// Fails on an empty series; NaN values are ignored when computing the bounds.
    pub fn fit(values: &[F]) -> Result<MinMaxScaler<F>, ForecastError> {
        match values.iter().copied().filter(|v| !v.is_nan()).minmax_by(|a, b| {
            a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal)
        }) {
            MinMaxResult::NoElements => Err(ForecastError::InsufficientData(
                "cannot fit a scaler to an empty series".to_string(),
            )),
            MinMaxResult::OneElement(v) => Ok(MinMaxScaler { min: v, max: v }),
            MinMaxResult::MinMax(min, max) => Ok(MinMaxScaler { min, max }),
        }
    }

    /// Fit a scaler to a series, and return the scaled series along with it
    pub fn fit_transform(values: &[F]) -> Result<(Vec<F>, MinMaxScaler<F>), ForecastError> {
        let scaler = Self::fit(values)?;
        Ok((scaler.transform(values), scaler))
    }

    /// The width of the fitted range
    #[inline]
    pub fn range(&self) -> F {
        self.max - self.min
    }

    /// Whether every fitted value was identical
    #[inline]
    pub fn is_degenerate(&self) -> bool {
        self.range() == F::zero()
    }

    /// Scale a single value. A degenerate scaler maps everything to zero.
    #[inline]
    pub fn scale(&self, val: F) -> F {
        if self.is_degenerate() {
            return F::zero();
        }
        (val - self.min) / self.range()
    }

    /// Undo the scaling of a single value
    #[inline]
    pub fn unscale(&self, val: F) -> F {
        val * self.range() + self.min
    }

    /// Scale a series of values
    pub fn transform(&self, values: &[F]) -> Vec<F> {
        values.iter().map(|v| self.scale(*v)).collect()
    }

    /// Undo the scaling of a series of values
    pub fn inverse_transform(&self, values: &[F]) -> Vec<F> {
        values.iter().map(|v| self.unscale(*v)).collect()
    }
}
