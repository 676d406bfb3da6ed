/*!
[Yahoo Finance](https://finance.yahoo.com/)-specific data processing code: the daily history CSV layout, and the chart
API
*/
use super::source::{DateRange, MarketData};
use super::{PriceSeries, Tick};
use crate::error::ForecastError;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;
use std::io::{Read, Write};
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info};

/// The Yahoo history date format
pub const YAHOO_DATE: &str = "%Y-%m-%d";

/// The header of a Yahoo daily history CSV
pub const YAHOO_HEADER: [&str; 7] = ["Date", "Open", "High", "Low", "Close", "Adj Close", "Volume"];

/// The default chart API endpoint
pub const YAHOO_CHART_URL: &str = "https://query1.finance.yahoo.com";

fn parse_field(field: Option<&str>) -> f64 {
    field
        .and_then(|field| f64::from_str(field.trim()).ok())
        .unwrap_or(f64::NAN)
}

/// Read Yahoo daily history from a Reader.
///
/// Columns are located by header name. Rows with an unreadable date or close (Yahoo writes `null`) are skipped;
/// other unreadable fields become NaN.
pub fn read_ticks<R: Read>(rdr: R) -> Result<Vec<Tick>, csv::Error> {
    let mut rdr = csv::Reader::from_reader(rdr);
    let headers = rdr.headers()?.clone();
    let column = |name: &str| headers.iter().position(|header| header.trim() == name);
    let (date, open, high, low, close, volume) = (
        column("Date"),
        column("Open"),
        column("High"),
        column("Low"),
        column("Close"),
        column("Volume"),
    );
    let mut ticks = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let get = |i: Option<usize>| i.and_then(|i| record.get(i));
        let t = match get(date).and_then(|d| NaiveDate::parse_from_str(d.trim(), YAHOO_DATE).ok()) {
            Some(t) => t,
            None => continue,
        };
        let c = parse_field(get(close));
        if c.is_nan() {
            continue;
        }
        ticks.push(Tick {
            t,
            o: parse_field(get(open)),
            h: parse_field(get(high)),
            l: parse_field(get(low)),
            c,
            v: parse_field(get(volume)),
        })
    }
    Ok(ticks)
}

/// Write tick data to a Writer in the Yahoo daily history layout.
/// On success, return how many ticks were written
pub fn write_ticks<W, I>(wtr: W, ticks: I) -> Result<usize, csv::Error>
where
    W: Write,
    I: Iterator<Item = Tick>,
{
    let mut wtr = csv::Writer::from_writer(wtr);
    wtr.write_record(YAHOO_HEADER)?;
    let mut written = 0;
    for tick in ticks {
        wtr.write_record(&[
            tick.t.format(YAHOO_DATE).to_string(),
            tick.o.to_string(),
            tick.h.to_string(),
            tick.l.to_string(),
            tick.c.to_string(),
            tick.c.to_string(),
            tick.v.to_string(),
        ])?;
        written += 1;
    }
    wtr.flush()?;
    Ok(written)
}

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartResult>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChartResult {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<Quote>,
}

#[derive(Debug, Default, Deserialize)]
struct Quote {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

/// Parse a chart API response body into daily ticks.
///
/// A `Not Found` chart error, or a response without any rows, is `NoData`; rows without a close are skipped.
pub fn parse_chart(symbol: &str, body: &str) -> Result<Vec<Tick>, ForecastError> {
    let response: ChartResponse =
        serde_json::from_str(body).map_err(|err| ForecastError::UpstreamUnavailable {
            symbol: symbol.to_string(),
            reason: format!("malformed chart response: {}", err),
        })?;
    if let Some(error) = response.chart.error {
        if error.code.eq_ignore_ascii_case("Not Found") {
            return Err(ForecastError::NoData {
                symbol: symbol.to_string(),
            });
        }
        return Err(ForecastError::UpstreamUnavailable {
            symbol: symbol.to_string(),
            reason: format!(
                "{}: {}",
                error.code,
                error.description.unwrap_or_default()
            ),
        });
    }
    let result = match response.chart.result.and_then(|results| results.into_iter().next()) {
        Some(result) => result,
        None => {
            return Err(ForecastError::NoData {
                symbol: symbol.to_string(),
            })
        }
    };
    let quote = result.indicators.quote.into_iter().next().unwrap_or_default();
    let at = |column: &[Option<f64>], i: usize| column.get(i).copied().flatten().unwrap_or(f64::NAN);

    let mut ticks = Vec::with_capacity(result.timestamp.len());
    for (i, ts) in result.timestamp.iter().enumerate() {
        let c = at(&quote.close, i);
        if c.is_nan() {
            continue;
        }
        let t = match DateTime::from_timestamp(*ts, 0) {
            Some(t) => t.date_naive(),
            None => continue,
        };
        // Intraday refreshes can repeat the last session
        if ticks.last().map_or(false, |last: &Tick| last.t >= t) {
            continue;
        }
        ticks.push(Tick {
            t,
            o: at(&quote.open, i),
            h: at(&quote.high, i),
            l: at(&quote.low, i),
            c,
            v: at(&quote.volume, i),
        });
    }
    Ok(ticks)
}

/// Daily history from the Yahoo chart API
#[derive(Debug, Clone)]
pub struct YahooChart {
    http: reqwest::blocking::Client,
    base_url: String,
}

impl YahooChart {
    /// A client for the chart API at `base_url`
    pub fn new(base_url: &str) -> Result<YahooChart, ForecastError> {
        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("stockcast/", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|err| ForecastError::Config(format!("failed to build HTTP client: {}", err)))?;
        Ok(YahooChart {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl MarketData for YahooChart {
    fn fetch(&self, symbol: &str, range: DateRange) -> Result<PriceSeries, ForecastError> {
        let upstream = |reason: String| ForecastError::UpstreamUnavailable {
            symbol: symbol.to_string(),
            reason,
        };
        let url = format!("{}/v8/finance/chart/{}", self.base_url, symbol);
        let (period1, period2) = range.timestamps();
        debug!(%url, period1, period2, "Requesting chart");
        let response = self
            .http
            .get(&url)
            .query(&[
                ("period1", period1.to_string()),
                ("period2", period2.to_string()),
                ("interval", "1d".to_string()),
                ("events", "history".to_string()),
            ])
            .send()
            .map_err(|err| upstream(err.to_string()))?;
        let status = response.status();
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(ForecastError::NoData {
                symbol: symbol.to_string(),
            });
        }
        let body = response.text().map_err(|err| upstream(err.to_string()))?;
        if !status.is_success() {
            // Yahoo reports unknown symbols with a chart error body on some non-404 statuses
            if let Err(err @ ForecastError::NoData { .. }) = parse_chart(symbol, &body) {
                return Err(err);
            }
            return Err(upstream(format!("HTTP {}", status)));
        }
        let ticks: Vec<Tick> = parse_chart(symbol, &body)?
            .into_iter()
            .filter(|tick| range.contains(tick.t))
            .collect();
        info!(symbol, ticks = ticks.len(), "Fetched chart");
        PriceSeries::new(symbol, ticks)
    }
}
