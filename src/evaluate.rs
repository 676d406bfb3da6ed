/*!
Held-out evaluation on the original price scale
*/
use crate::compute::ComputeContext;
use crate::data::scale::MinMaxScaler;
use crate::data::window::Window;
use crate::error::ForecastError;
use crate::lstm::StockLSTM;
use crate::CpuFloat;

/// Predictions against ground truth for the held-out windows
#[derive(Debug, Clone, PartialEq)]
pub struct Evaluation {
    /// Predicted prices, one per test window
    pub predicted: Vec<CpuFloat>,
    /// Actual prices, one per test window
    pub actual: Vec<CpuFloat>,
    /// Root mean squared error between the two
    pub rmse: CpuFloat,
}

/// Root mean squared error between two equally long series. Zero for empty series.
pub fn rmse(actual: &[CpuFloat], predicted: &[CpuFloat]) -> CpuFloat {
    debug_assert_eq!(actual.len(), predicted.len());
    if actual.is_empty() {
        return 0.0;
    }
    let sum: CpuFloat = actual
        .iter()
        .zip(predicted)
        .map(|(a, p)| (a - p) * (a - p))
        .sum();
    (sum / actual.len() as CpuFloat).sqrt()
}

/// Score `model` on `windows`, unscaling predictions and targets with `scaler`
pub fn evaluate(
    ctx: &ComputeContext,
    model: &StockLSTM,
    windows: &[Window<'_, CpuFloat>],
    scaler: &MinMaxScaler,
) -> Result<Evaluation, ForecastError> {
    let scaled = model.predict_batch(windows, ctx.device())?;
    let predicted = scaler.inverse_transform(&scaled);
    let targets: Vec<CpuFloat> = windows.iter().map(|w| w.target).collect();
    let actual = scaler.inverse_transform(&targets);
    let rmse = rmse(&actual, &predicted);
    Ok(Evaluation {
        predicted,
        actual,
        rmse,
    })
}
