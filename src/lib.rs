/*!
Forecast a stock's closing price with an LSTM trained from scratch on its daily history, written in Rust using
[candle](https://github.com/huggingface/candle), as an experiment.

Every forecast owns its own scaler, windows and model: a price series is min-max scaled, sliced into fixed-length
windows, split chronologically into a training prefix and a held-out suffix, used to train a fresh LSTM, scored on
the held-out windows, and finally rolled forward autoregressively over a set of horizons.
See [`pipeline::Pipeline`] for the end-to-end run.
*/
#![forbid(missing_docs)]

pub mod compute;
pub mod config;
pub mod data;
pub mod error;
pub mod evaluate;
pub mod forecast;
pub mod lstm;
pub mod pipeline;
pub mod train;
pub mod util;

pub use error::ForecastError;

/// The floating point type to be used for CPU calculations
pub type CpuFloat = f64;

/// The floating point type to be used for GPU calculations
pub type GpuFloat = f32;
