/*!
Autoregressive multi-horizon forecasting
*/
use crate::compute::ComputeContext;
use crate::data::scale::MinMaxScaler;
use crate::error::ForecastError;
use crate::lstm::StockLSTM;
use crate::util::days_after;
use crate::CpuFloat;
use chrono::NaiveDate;
use std::collections::{BTreeMap, VecDeque};

/// Roll `model` forward `horizon` steps from `last_window`, feeding every prediction back in as input.
///
/// Returns unscaled prices. Only real data seeds the rollout; errors compound from one step to the next.
pub fn rollout(
    ctx: &ComputeContext,
    model: &StockLSTM,
    last_window: &[CpuFloat],
    horizon: usize,
    scaler: &MinMaxScaler,
) -> Result<Vec<CpuFloat>, ForecastError> {
    if last_window.is_empty() {
        return Err(ForecastError::InsufficientData(
            "cannot forecast from an empty window".to_string(),
        ));
    }
    let mut window: VecDeque<CpuFloat> = last_window.iter().copied().collect();
    let mut scaled = Vec::with_capacity(horizon);
    for _ in 0..horizon {
        let next = model.predict(window.make_contiguous(), ctx.device())?;
        scaled.push(next);
        window.pop_front();
        window.push_back(next);
    }
    Ok(scaler.inverse_transform(&scaled))
}

/// Forecast every horizon independently, each starting from the same `last_window`
pub fn forecast(
    ctx: &ComputeContext,
    model: &StockLSTM,
    last_window: &[CpuFloat],
    horizons: &[usize],
    scaler: &MinMaxScaler,
) -> Result<BTreeMap<usize, Vec<CpuFloat>>, ForecastError> {
    horizons
        .iter()
        .map(|&h| rollout(ctx, model, last_window, h, scaler).map(|prices| (h, prices)))
        .collect()
}

/// The calendar dates of each horizon's forecast, starting the day after `last`
pub fn forecast_dates(last: NaiveDate, horizons: &[usize]) -> BTreeMap<usize, Vec<NaiveDate>> {
    horizons.iter().map(|&h| (h, days_after(last, h))).collect()
}
