/*!
Data processing and IO functions
*/
use crate::error::ForecastError;
use crate::*;
use chrono::NaiveDate;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use ta::{Close, High, Low, Open, Volume};

pub mod fake;
pub mod scale;
pub mod source;
pub mod window;
pub mod yahoo;

/// Daily bar data for a stock
#[derive(Debug, Copy, Clone, PartialEq, PartialOrd, Serialize, Deserialize)]
pub struct Tick<D = NaiveDate, F = CpuFloat> {
    /// This tick's date
    pub t: D,
    /// The opening price of this tick
    pub o: F,
    /// The high price of this tick
    pub h: F,
    /// The low price of this tick
    pub l: F,
    /// The closing price of this tick
    pub c: F,
    /// The volume traded this tick
    pub v: F,
}

impl<D, F> Open for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn open(&self) -> f64 {
        self.o.into()
    }
}

impl<D, F> High for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn high(&self) -> f64 {
        self.h.into()
    }
}

impl<D, F> Low for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn low(&self) -> f64 {
        self.l.into()
    }
}

impl<D, F> Close for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn close(&self) -> f64 {
        self.c.into()
    }
}

impl<D, F> Volume for Tick<D, F>
where
    F: Copy + Into<f64>,
{
    #[inline]
    fn volume(&self) -> f64 {
        self.v.into()
    }
}

/// A chronologically ordered daily price history for one symbol
#[derive(Debug, Clone, PartialEq)]
pub struct PriceSeries {
    symbol: String,
    ticks: Vec<Tick>,
}

impl PriceSeries {
    /// Build a price series, checking that dates strictly increase and every close is finite.
    ///
    /// An empty tick list is reported as `NoData`.
    pub fn new(symbol: impl Into<String>, ticks: Vec<Tick>) -> Result<PriceSeries, ForecastError> {
        let symbol = symbol.into();
        if ticks.is_empty() {
            return Err(ForecastError::NoData { symbol });
        }
        if let Some((a, b)) = ticks.iter().tuple_windows().find(|(a, b)| a.t >= b.t) {
            let reason = if a.t == b.t {
                format!("duplicate date {}", a.t)
            } else {
                format!("date {} follows {}", b.t, a.t)
            };
            return Err(ForecastError::InvalidSeries { symbol, reason });
        }
        if let Some(tick) = ticks.iter().find(|tick| !tick.c.is_finite()) {
            let reason = format!("non-finite close on {}", tick.t);
            return Err(ForecastError::InvalidSeries { symbol, reason });
        }
        Ok(PriceSeries { symbol, ticks })
    }

    /// The symbol this series belongs to
    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    /// The ticks of this series, oldest first
    pub fn ticks(&self) -> &[Tick] {
        &self.ticks
    }

    /// The number of ticks. Never zero.
    pub fn len(&self) -> usize {
        self.ticks.len()
    }

    /// Always false: an empty series cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.ticks.is_empty()
    }

    /// The closing prices, oldest first
    pub fn closes(&self) -> Vec<CpuFloat> {
        self.ticks.iter().map(Close::close).collect()
    }

    /// The dates, oldest first
    pub fn dates(&self) -> Vec<NaiveDate> {
        self.ticks.iter().map(|tick| tick.t).collect()
    }

    /// The most recent tick
    pub fn last(&self) -> &Tick {
        &self.ticks[self.ticks.len() - 1]
    }

    /// Day-over-day change of the close, in percent, rounded to two decimals.
    ///
    /// Zero for a single tick, and when the previous close was zero, since no finite change exists.
    pub fn percent_change(&self) -> CpuFloat {
        match self.ticks.as_slice() {
            [.., prev, last] if prev.close() != 0.0 => {
                util::round_to((last.close() / prev.close() - 1.0) * 100.0, 2)
            }
            _ => 0.0,
        }
    }

    /// A summary of the most recent tick
    pub fn summary(&self) -> MarketSummary {
        MarketSummary::from(self.last())
    }
}

/// A same-day OHLCV summary
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketSummary {
    /// The opening price
    pub open: CpuFloat,
    /// The high price
    pub high: CpuFloat,
    /// The low price
    pub low: CpuFloat,
    /// The traded volume
    pub volume: u64,
    /// The day summarized
    pub date: NaiveDate,
}

impl From<&Tick> for MarketSummary {
    fn from(tick: &Tick) -> MarketSummary {
        MarketSummary {
            open: tick.open(),
            high: tick.high(),
            low: tick.low(),
            volume: tick.volume().max(0.0) as u64,
            date: tick.t,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tick(day: u32, c: f64) -> Tick {
        Tick {
            t: NaiveDate::from_ymd_opt(2023, 3, day).unwrap(),
            o: c - 1.0,
            h: c + 2.0,
            l: c - 2.0,
            c,
            v: 1200.0,
        }
    }

    #[test]
    fn series_rejects_duplicates_and_disorder() {
        let dup = PriceSeries::new("DUP", vec![tick(1, 10.0), tick(1, 11.0)]);
        assert!(matches!(dup, Err(ForecastError::InvalidSeries { .. })));
        let back = PriceSeries::new("BACK", vec![tick(2, 10.0), tick(1, 11.0)]);
        assert!(matches!(back, Err(ForecastError::InvalidSeries { .. })));
        let nan = PriceSeries::new("NAN", vec![tick(1, 10.0), tick(2, f64::NAN)]);
        assert!(matches!(nan, Err(ForecastError::InvalidSeries { .. })));
    }

    #[test]
    fn empty_series_is_no_data() {
        match PriceSeries::new("ZZZZ", Vec::new()) {
            Err(ForecastError::NoData { symbol }) => assert_eq!(symbol, "ZZZZ"),
            other => panic!("expected NoData, got {:?}", other),
        }
    }

    #[test]
    fn percent_change_and_summary() {
        let series = PriceSeries::new("ABC", vec![tick(1, 100.0), tick(2, 103.456)]).unwrap();
        assert_eq!(series.percent_change(), 3.46);
        assert_eq!(series.closes(), vec![100.0, 103.456]);
        let summary = series.summary();
        assert_eq!(summary.volume, 1200);
        assert_eq!(summary.date, NaiveDate::from_ymd_opt(2023, 3, 2).unwrap());
        assert!((summary.high - 105.456).abs() < 1e-9);

        let single = PriceSeries::new("ONE", vec![tick(1, 100.0)]).unwrap();
        assert_eq!(single.percent_change(), 0.0);
    }

    #[test]
    fn percent_change_from_zero_close_is_zero() {
        let series = PriceSeries::new("ZERO", vec![tick(1, 0.0), tick(2, 5.0)]).unwrap();
        let change = series.percent_change();
        assert!(change.is_finite());
        assert_eq!(change, 0.0);
        assert_eq!(
            serde_json::to_value(change).unwrap(),
            serde_json::json!(0.0)
        );
    }
}
