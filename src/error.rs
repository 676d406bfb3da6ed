/*!
Errors raised while forecasting
*/
use thiserror::Error;

/// Everything that can go wrong during a single forecasting run. All of these are terminal for the run.
#[derive(Error, Debug)]
pub enum ForecastError {
    /// The requested symbol was empty after sanitation
    #[error("invalid symbol {0:?}: ticker symbol is empty or invalid after processing")]
    InvalidSymbol(String),

    /// The market data source has nothing for this symbol
    #[error("no data found for ticker {symbol}: it might be invalid or delisted")]
    NoData {
        /// The symbol which was looked up
        symbol: String,
    },

    /// Not enough points to build a window, or a split left a partition empty
    #[error("insufficient data: {0}")]
    InsufficientData(String),

    /// The market data source returned a malformed series
    #[error("invalid price series for {symbol}: {reason}")]
    InvalidSeries {
        /// The symbol the series belongs to
        symbol: String,
        /// What is wrong with it
        reason: String,
    },

    /// Training produced a non-finite loss
    #[error("training diverged at epoch {epoch} (loss = {loss})")]
    DivergedTraining {
        /// The (1-based) epoch at which the loss stopped being finite
        epoch: usize,
        /// The offending loss
        loss: f64,
    },

    /// Training was cancelled between epochs
    #[error("training cancelled before epoch {epoch}")]
    Cancelled {
        /// The (1-based) epoch which did not run
        epoch: usize,
    },

    /// The market data source itself failed
    #[error("market data unavailable for {symbol}: {reason}")]
    UpstreamUnavailable {
        /// The symbol which was looked up
        symbol: String,
        /// The underlying failure
        reason: String,
    },

    /// Invalid forecasting configuration
    #[error("config error: {0}")]
    Config(String),

    /// Tensor computation failure
    #[error("tensor error: {0}")]
    Tensor(#[from] candle_core::Error),
}

impl ForecastError {
    /// Build an `InsufficientData` error for a series too short to window
    pub fn too_short(available: usize, length: usize) -> ForecastError {
        ForecastError::InsufficientData(format!(
            "need more than {} points to build a window, found {}",
            length, available
        ))
    }

    /// How a boundary layer should report this error
    pub fn status(&self) -> Status {
        match self {
            ForecastError::InvalidSymbol(_)
            | ForecastError::InsufficientData(_)
            | ForecastError::Config(_) => Status::BadRequest,
            ForecastError::NoData { .. } => Status::NotFound,
            ForecastError::InvalidSeries { .. } | ForecastError::UpstreamUnavailable { .. } => {
                Status::BadGateway
            }
            ForecastError::DivergedTraining { .. }
            | ForecastError::Cancelled { .. }
            | ForecastError::Tensor(_) => Status::Internal,
        }
    }
}

/// A failed pipeline run, scoped to the symbol it was run for
#[derive(Error, Debug)]
#[error("forecast for {symbol} failed: {source}")]
pub struct PipelineError {
    /// The symbol being forecast, as requested
    pub symbol: String,
    /// The underlying failure
    #[source]
    pub source: ForecastError,
}

impl PipelineError {
    /// How a boundary layer should report this error
    pub fn status(&self) -> Status {
        self.source.status()
    }
}

/// A transport-independent error class
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Status {
    /// The request itself was unusable
    BadRequest,
    /// Nothing exists for the request
    NotFound,
    /// A dependency failed
    BadGateway,
    /// The run failed internally
    Internal,
}

impl Status {
    /// The equivalent HTTP status code
    pub fn http_code(self) -> u16 {
        match self {
            Status::BadRequest => 400,
            Status::NotFound => 404,
            Status::BadGateway => 502,
            Status::Internal => 500,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_mapping() {
        let no_data = ForecastError::NoData {
            symbol: "ZZZZ".to_string(),
        };
        assert_eq!(no_data.status().http_code(), 404);
        assert_eq!(ForecastError::too_short(5, 30).status().http_code(), 400);
        let upstream = ForecastError::UpstreamUnavailable {
            symbol: "AAPL".to_string(),
            reason: "rate limited".to_string(),
        };
        assert_eq!(upstream.status().http_code(), 502);
        let diverged = ForecastError::DivergedTraining {
            epoch: 3,
            loss: f64::NAN,
        };
        assert_eq!(diverged.status(), Status::Internal);
    }

    #[test]
    fn pipeline_error_names_symbol() {
        let err = PipelineError {
            symbol: "ZZZZ".to_string(),
            source: ForecastError::NoData {
                symbol: "ZZZZ".to_string(),
            },
        };
        assert!(err.to_string().starts_with("forecast for ZZZZ failed"));
        assert_eq!(err.status(), Status::NotFound);
    }
}
