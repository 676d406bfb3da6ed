/*!
Market data sources
*/
use super::yahoo::read_ticks;
use super::{PriceSeries, Tick};
use crate::error::ForecastError;
use chrono::{Local, NaiveDate};
use std::collections::HashMap;
use std::fs::File;
use std::io::ErrorKind;
use std::path::{Component, Path, PathBuf};
use tracing::info;

/// The first day of history requested for every forecast
pub const HISTORY_START: (i32, u32, u32) = (2020, 1, 1);

/// A half-open range of days, `[start, end)`
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub struct DateRange {
    /// The first day included
    pub start: NaiveDate,
    /// The first day excluded
    pub end: NaiveDate,
}

impl DateRange {
    /// From `HISTORY_START` up to, but excluding, today
    pub fn history_until_today() -> DateRange {
        Self::history_until(Local::now().date_naive())
    }

    /// From `HISTORY_START` up to, but excluding, `end`
    pub fn history_until(end: NaiveDate) -> DateRange {
        let (y, m, d) = HISTORY_START;
        let start = NaiveDate::from_ymd_opt(y, m, d).unwrap_or(NaiveDate::MIN);
        DateRange { start, end }
    }

    /// Whether a day falls in this range
    pub fn contains(&self, t: NaiveDate) -> bool {
        self.start <= t && t < self.end
    }

    /// The range's bounds as UTC midnight Unix timestamps
    pub fn timestamps(&self) -> (i64, i64) {
        let midnight = |d: NaiveDate| {
            d.and_hms_opt(0, 0, 0)
                .map_or(0, |midnight| midnight.and_utc().timestamp())
        };
        (midnight(self.start), midnight(self.end))
    }
}

/// A trait implemented by market data collaborators
pub trait MarketData {
    /// Fetch the daily history of `symbol` within `range`.
    ///
    /// An unknown symbol or an empty range is `NoData`; a failure of the source itself is `UpstreamUnavailable`.
    fn fetch(&self, symbol: &str, range: DateRange) -> Result<PriceSeries, ForecastError>;
}

impl<M: MarketData + ?Sized> MarketData for &M {
    fn fetch(&self, symbol: &str, range: DateRange) -> Result<PriceSeries, ForecastError> {
        (**self).fetch(symbol, range)
    }
}

impl<M: MarketData + ?Sized> MarketData for Box<M> {
    fn fetch(&self, symbol: &str, range: DateRange) -> Result<PriceSeries, ForecastError> {
        (**self).fetch(symbol, range)
    }
}

/// Yahoo-layout history files stored as `<root>/<SYMBOL>.csv`
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct CsvDirectory {
    /// The directory holding the files
    pub root: PathBuf,
}

impl CsvDirectory {
    /// Read files from `root`
    pub fn new(root: impl Into<PathBuf>) -> CsvDirectory {
        CsvDirectory { root: root.into() }
    }

    /// The file holding a symbol's history.
    ///
    /// The symbol must name a single file directly under `root`: separators, `..` and absolute paths are rejected.
    pub fn path(&self, symbol: &str) -> Result<PathBuf, ForecastError> {
        let mut components = Path::new(symbol).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !single || symbol.contains(|c: char| c == '/' || c == '\\') {
            return Err(ForecastError::InvalidSymbol(symbol.to_string()));
        }
        Ok(self.root.join(format!("{}.csv", symbol)))
    }
}

impl MarketData for CsvDirectory {
    fn fetch(&self, symbol: &str, range: DateRange) -> Result<PriceSeries, ForecastError> {
        let upstream = |reason: String| ForecastError::UpstreamUnavailable {
            symbol: symbol.to_string(),
            reason,
        };
        let path = self.path(symbol)?;
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                return Err(ForecastError::NoData {
                    symbol: symbol.to_string(),
                })
            }
            Err(err) => return Err(upstream(format!("{}: {}", path.display(), err))),
        };
        let ticks: Vec<Tick> = read_ticks(file)
            .map_err(|err| upstream(format!("{}: {}", path.display(), err)))?
            .into_iter()
            .filter(|tick| range.contains(tick.t))
            .collect();
        info!(symbol, ticks = ticks.len(), path = %path.display(), "Read history");
        PriceSeries::new(symbol, ticks)
    }
}

/// Histories held in memory, keyed by symbol
#[derive(Debug, Clone, Default, PartialEq)]
pub struct InMemory(pub HashMap<String, Vec<Tick>>);

impl InMemory {
    /// An empty source
    pub fn new() -> InMemory {
        InMemory::default()
    }

    /// Add (or replace) a symbol's history
    pub fn with(mut self, symbol: &str, ticks: Vec<Tick>) -> InMemory {
        self.0.insert(symbol.to_string(), ticks);
        self
    }
}

impl MarketData for InMemory {
    fn fetch(&self, symbol: &str, range: DateRange) -> Result<PriceSeries, ForecastError> {
        let ticks = self
            .0
            .get(symbol)
            .map(|ticks| {
                ticks
                    .iter()
                    .copied()
                    .filter(|tick| range.contains(tick.t))
                    .collect()
            })
            .unwrap_or_default();
        PriceSeries::new(symbol, ticks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::fake::linear_ticks;

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn range_is_half_open() {
        let range = DateRange::history_until(day(2024, 6, 1));
        assert_eq!(range.start, day(2020, 1, 1));
        assert!(range.contains(day(2020, 1, 1)));
        assert!(range.contains(day(2024, 5, 31)));
        assert!(!range.contains(day(2024, 6, 1)));
        assert!(!range.contains(day(2019, 12, 31)));
        assert_eq!(range.timestamps().0, 1_577_836_800);
    }

    #[test]
    fn in_memory_filters_and_reports_missing() {
        let source = InMemory::new().with("ABC", linear_ticks(day(2019, 12, 30), 10, 1.0, 1.0));
        let range = DateRange::history_until(day(2024, 1, 1));
        let series = source.fetch("ABC", range).unwrap();
        assert_eq!(series.len(), 8);
        assert_eq!(series.ticks()[0].t, day(2020, 1, 1));
        assert!(matches!(
            source.fetch("ZZZZ", range),
            Err(ForecastError::NoData { .. })
        ));
    }

    #[test]
    fn csv_symbols_cannot_leave_the_directory() {
        let dir = tempfile::tempdir().unwrap();
        let root = dir.path().join("root");
        std::fs::create_dir(&root).unwrap();
        let secret = dir.path().join("SECRET.csv");
        std::fs::write(&secret, "Date,Close\n2021-01-04,1.0\n").unwrap();
        let source = CsvDirectory::new(&root);

        let absolute = dir.path().join("SECRET");
        for symbol in ["../SECRET", "sub/SECRET", "..\\SECRET", "..", absolute.to_str().unwrap()] {
            assert!(
                matches!(
                    source.fetch(symbol, DateRange::history_until_today()),
                    Err(ForecastError::InvalidSymbol(_))
                ),
                "{} should be rejected",
                symbol
            );
        }
        assert_eq!(source.path("BRK.B").unwrap(), root.join("BRK.B.csv"));
    }

    #[test]
    fn missing_csv_is_no_data() {
        let source = CsvDirectory::new("/nonexistent/stockcast");
        assert!(matches!(
            source.fetch("ZZZZ", DateRange::history_until_today()),
            Err(ForecastError::NoData { .. })
        ));
    }
}
