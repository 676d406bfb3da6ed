/*!
The end-to-end forecasting run: fetch, scale, window, split, train, evaluate, forecast, report
*/
use crate::compute::ComputeContext;
use crate::config::ForecastConfig;
use crate::data::scale::MinMaxScaler;
use crate::data::source::{DateRange, MarketData};
use crate::data::window::{build_windows, train_test_split};
use crate::data::{MarketSummary, PriceSeries};
use crate::error::{ForecastError, PipelineError};
use crate::evaluate::evaluate;
use crate::forecast::{forecast, forecast_dates};
use crate::lstm::StockLSTMDesc;
use crate::train::{CancelToken, Trainer};
use crate::CpuFloat;
use candle_core::DType;
use candle_nn::{VarBuilder, VarMap};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::info;

/// Clean up a raw ticker: surrounding whitespace is dropped and only the first word is kept
pub fn sanitize_symbol(raw: &str) -> Result<String, ForecastError> {
    match raw.split_whitespace().next() {
        Some(symbol) => Ok(symbol.to_string()),
        None => Err(ForecastError::InvalidSymbol(raw.to_string())),
    }
}

/// Per-horizon forecast prices and dates, keyed by horizon
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FuturePredictions {
    /// The calendar dates of each horizon's forecast
    pub dates: BTreeMap<usize, Vec<NaiveDate>>,
    /// The forecast prices of each horizon
    pub values: BTreeMap<usize, Vec<CpuFloat>>,
}

/// Held-out predictions against actual prices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PredictionPerformance {
    /// Actual prices on the held-out days
    pub actual: Vec<CpuFloat>,
    /// Predicted prices on the held-out days
    pub predicted: Vec<CpuFloat>,
    /// The held-out days
    pub dates: Vec<NaiveDate>,
}

/// The full price history used for the run
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Historical {
    /// Every day of history
    pub dates: Vec<NaiveDate>,
    /// The close of every day
    pub prices: Vec<CpuFloat>,
    /// The volume of every day
    pub volumes: Vec<CpuFloat>,
}

/// Everything a forecasting run produces
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    /// The symbol forecast
    pub ticker: String,
    /// The most recent close
    pub latest_price: CpuFloat,
    /// RMSE on the held-out windows, in price units
    pub rmse: CpuFloat,
    /// Forecasts for every horizon
    pub future_predictions: FuturePredictions,
    /// The training loss of every `loss_sample_every`-th epoch
    pub loss_history: Vec<CpuFloat>,
    /// Held-out predictions against actual prices
    pub prediction_performance: PredictionPerformance,
    /// The most recent day's OHLCV
    pub market_summary: MarketSummary,
    /// Day-over-day change of the latest close, in percent
    pub percent_change: CpuFloat,
    /// The full price history
    pub historical: Historical,
}

/// A forecasting pipeline over a market data source. Each run trains a fresh model.
#[derive(Debug)]
pub struct Pipeline<S> {
    /// Where histories come from
    pub source: S,
    /// Where tensors live
    pub ctx: ComputeContext,
    /// Hyperparameters shared by every run
    pub config: ForecastConfig,
    /// Cancels any training in progress
    pub cancel: Option<CancelToken>,
}

impl<S: MarketData> Pipeline<S> {
    /// A pipeline with validated hyperparameters
    pub fn new(source: S, ctx: ComputeContext, config: ForecastConfig) -> Result<Pipeline<S>, ForecastError> {
        config.validate()?;
        Ok(Pipeline {
            source,
            ctx,
            config,
            cancel: None,
        })
    }

    /// Stop training early when `token` is cancelled
    pub fn with_cancel(mut self, token: CancelToken) -> Pipeline<S> {
        self.cancel = Some(token);
        self
    }

    /// Forecast `raw_symbol` from its history up to today
    pub fn run(&self, raw_symbol: &str) -> Result<ForecastReport, PipelineError> {
        self.run_until(raw_symbol, DateRange::history_until_today())
    }

    /// Forecast `raw_symbol` from its history within `range`
    pub fn run_until(&self, raw_symbol: &str, range: DateRange) -> Result<ForecastReport, PipelineError> {
        self.run_with(raw_symbol, range, |_, _| {})
    }

    /// Forecast `raw_symbol` from its history within `range`, calling `on_epoch(epoch, loss)` during training
    pub fn run_with<E>(&self, raw_symbol: &str, range: DateRange, on_epoch: E) -> Result<ForecastReport, PipelineError>
    where
        E: FnMut(usize, CpuFloat),
    {
        let scoped = |source: ForecastError| PipelineError {
            symbol: raw_symbol.trim().to_string(),
            source,
        };
        let symbol = sanitize_symbol(raw_symbol).map_err(scoped)?;
        info!(%symbol, start = %range.start, end = %range.end, "Fetching history");
        let series = self.source.fetch(&symbol, range).map_err(scoped)?;
        self.forecast_series(&series, on_epoch).map_err(scoped)
    }

    /// Forecast an already-fetched series
    pub fn forecast_series<E>(&self, series: &PriceSeries, on_epoch: E) -> Result<ForecastReport, ForecastError>
    where
        E: FnMut(usize, CpuFloat),
    {
        let config = &self.config;
        let closes = series.closes();
        let dates = series.dates();

        // Scale once, then window and split
        let (scaled, scaler) = MinMaxScaler::fit_transform(&closes)?;
        let windows = build_windows(&scaled, config.window_length)?;
        let split = train_test_split(windows, config.train_fraction)?;
        info!(
            symbol = series.symbol(),
            points = closes.len(),
            train = split.train.len(),
            test = split.test.len(),
            "Built windows"
        );

        // A fresh model for this run only
        let params = VarMap::new();
        let vb = VarBuilder::from_varmap(&params, DType::F32, self.ctx.device());
        let desc = StockLSTMDesc::scalar(config.hidden_size);
        let model = desc.build(vb)?;
        self.ctx.init_uniform(&params, desc.init_bound())?;

        let mut trainer = Trainer::new(config.epochs, config.learning_rate);
        if let Some(token) = &self.cancel {
            trainer = trainer.with_cancel(token.clone());
        }
        let history = trainer.train_with(&self.ctx, &model, &params, &split.train, on_epoch)?;

        let evaluation = evaluate(&self.ctx, &model, &split.test, &scaler)?;
        let test_dates = split.test.iter().map(|w| dates[w.target_index()]).collect();

        let last_window = &scaled[scaled.len() - config.window_length..];
        let values = forecast(&self.ctx, &model, last_window, &config.horizons, &scaler)?;
        let last = series.last();

        info!(
            symbol = series.symbol(),
            rmse = evaluation.rmse,
            "Forecast complete"
        );
        Ok(ForecastReport {
            ticker: series.symbol().to_string(),
            latest_price: last.c,
            rmse: evaluation.rmse,
            future_predictions: FuturePredictions {
                dates: forecast_dates(last.t, &config.horizons),
                values,
            },
            loss_history: history.sampled(config.loss_sample_every),
            prediction_performance: PredictionPerformance {
                actual: evaluation.actual,
                predicted: evaluation.predicted,
                dates: test_dates,
            },
            market_summary: series.summary(),
            percent_change: series.percent_change(),
            historical: Historical {
                dates,
                prices: closes,
                volumes: series.ticks().iter().map(|tick| tick.v).collect(),
            },
        })
    }
}
