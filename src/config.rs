/*!
Forecasting hyperparameters
*/
use crate::error::ForecastError;
use serde::Deserialize;
use std::path::Path;

/// Length of each input window, in days
pub const WINDOW_LENGTH: usize = 30;
/// Width of the LSTM hidden state
pub const HIDDEN_SIZE: usize = 50;
/// Number of full-batch training epochs
pub const EPOCHS: usize = 200;
/// Adam learning rate
pub const LEARNING_RATE: f64 = 0.001;
/// Fraction of windows used for training; the rest are held out
pub const TRAIN_FRACTION: f64 = 0.8;
/// Forecast horizons, in days
pub const HORIZONS: [usize; 3] = [10, 20, 50];
/// Only every `LOSS_SAMPLE_EVERY`-th epoch's loss is reported
pub const LOSS_SAMPLE_EVERY: usize = 10;

/// The hyperparameters of a forecasting run. Defaults to the constants above.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct ForecastConfig {
    /// Length of each input window
    pub window_length: usize,
    /// Width of the LSTM hidden state
    pub hidden_size: usize,
    /// Number of training epochs
    pub epochs: usize,
    /// Adam learning rate
    pub learning_rate: f64,
    /// Fraction of windows used for training
    pub train_fraction: f64,
    /// Forecast horizons
    pub horizons: Vec<usize>,
    /// Loss sampling interval for the report
    pub loss_sample_every: usize,
}

impl Default for ForecastConfig {
    fn default() -> ForecastConfig {
        ForecastConfig {
            window_length: WINDOW_LENGTH,
            hidden_size: HIDDEN_SIZE,
            epochs: EPOCHS,
            learning_rate: LEARNING_RATE,
            train_fraction: TRAIN_FRACTION,
            horizons: HORIZONS.to_vec(),
            loss_sample_every: LOSS_SAMPLE_EVERY,
        }
    }
}

impl ForecastConfig {
    /// Parse and validate a TOML configuration; missing keys take their defaults
    pub fn from_toml_str(s: &str) -> Result<ForecastConfig, ForecastError> {
        let config: ForecastConfig =
            toml::from_str(s).map_err(|err| ForecastError::Config(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load and validate a TOML configuration file
    pub fn load(path: &Path) -> Result<ForecastConfig, ForecastError> {
        let s = std::fs::read_to_string(path).map_err(|err| {
            ForecastError::Config(format!("failed to read {}: {}", path.display(), err))
        })?;
        Self::from_toml_str(&s)
    }

    /// Check that this configuration can drive a run
    pub fn validate(&self) -> Result<(), ForecastError> {
        let fail = |msg: &str| Err(ForecastError::Config(msg.to_string()));
        if self.window_length == 0 {
            return fail("window_length must be > 0");
        }
        if self.hidden_size == 0 {
            return fail("hidden_size must be > 0");
        }
        if self.epochs == 0 {
            return fail("epochs must be > 0");
        }
        if !(self.learning_rate > 0.0 && self.learning_rate.is_finite()) {
            return fail("learning_rate must be a positive number");
        }
        if !(self.train_fraction > 0.0 && self.train_fraction < 1.0) {
            return fail("train_fraction must lie strictly between 0 and 1");
        }
        if self.horizons.is_empty() || self.horizons.contains(&0) {
            return fail("horizons must be non-empty and positive");
        }
        if self.loss_sample_every == 0 {
            return fail("loss_sample_every must be > 0");
        }
        Ok(())
    }
}
