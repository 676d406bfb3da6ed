/*!
End-to-end forecasting runs over synthetic histories
*/
use chrono::NaiveDate;
use stockcast::compute::ComputeContext;
use stockcast::config::ForecastConfig;
use stockcast::data::fake::linear_ticks;
use stockcast::data::source::{DateRange, InMemory, MarketData};
use stockcast::data::PriceSeries;
use stockcast::error::Status;
use stockcast::pipeline::Pipeline;
use stockcast::train::CancelToken;
use stockcast::ForecastError;

fn first_day() -> NaiveDate {
    NaiveDate::from_ymd_opt(2021, 1, 1).unwrap()
}

fn range() -> DateRange {
    DateRange::history_until(NaiveDate::from_ymd_opt(2030, 1, 1).unwrap())
}

fn quick_config() -> ForecastConfig {
    ForecastConfig {
        hidden_size: 8,
        epochs: 5,
        ..ForecastConfig::default()
    }
}

/// A source whose upstream is always down
struct Offline;

impl MarketData for Offline {
    fn fetch(&self, symbol: &str, _range: DateRange) -> Result<PriceSeries, ForecastError> {
        Err(ForecastError::UpstreamUnavailable {
            symbol: symbol.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

#[test]
fn linear_series_report_shape() {
    let source = InMemory::new().with("LIN", linear_ticks(first_day(), 200, 100.0, 1.0));
    let pipeline =
        Pipeline::new(source, ComputeContext::seeded(42), ForecastConfig::default()).unwrap();
    let mut epochs = 0;
    let report = pipeline
        .run_with("LIN", range(), |_, _| epochs += 1)
        .expect("forecast should succeed");

    assert_eq!(epochs, 200);
    assert_eq!(report.ticker, "LIN");
    assert_eq!(report.latest_price, 299.0);
    assert_eq!(report.loss_history.len(), 20);
    assert!(report.loss_history.last().unwrap() < report.loss_history.first().unwrap());
    assert!(report.rmse >= 0.0 && report.rmse.is_finite());

    // 170 windows: 136 train, 34 held out
    let performance = &report.prediction_performance;
    assert_eq!(performance.actual.len(), 34);
    assert_eq!(performance.predicted.len(), 34);
    assert_eq!(performance.dates.len(), 34);
    assert_eq!(performance.dates[0], first_day() + chrono::Duration::days(166));
    for (i, actual) in performance.actual.iter().enumerate() {
        assert!((actual - (266.0 + i as f64)).abs() < 1e-9);
    }

    let last = NaiveDate::from_ymd_opt(2021, 7, 19).unwrap();
    assert_eq!(report.market_summary.date, last);
    for h in [10, 20, 50] {
        let prices = &report.future_predictions.values[&h];
        let dates = &report.future_predictions.dates[&h];
        assert_eq!(prices.len(), h);
        assert_eq!(dates.len(), h);
        assert!(dates[0] > last);
        assert!(dates.windows(2).all(|w| w[0] < w[1]));
        assert!(prices.iter().all(|p| p.is_finite()));
    }
    assert_eq!(report.historical.prices.len(), 200);
    assert!((report.percent_change - 0.34).abs() < 1e-9);
}

#[test]
fn linear_series_forecast_follows_trend() {
    let source = InMemory::new().with("LIN", linear_ticks(first_day(), 200, 100.0, 1.0));
    let pipeline =
        Pipeline::new(source, ComputeContext::seeded(7), ForecastConfig::default()).unwrap();
    let report = pipeline.run_until("LIN", range()).expect("forecast should succeed");

    let ten_day = &report.future_predictions.values[&10];
    for (i, price) in ten_day.iter().enumerate() {
        let expected = 300.0 + i as f64;
        assert!(
            (price - expected).abs() <= 0.1 * expected,
            "day {}: predicted {} vs trend {}",
            i + 1,
            price,
            expected
        );
    }
}

#[test]
fn short_series_is_insufficient() {
    let source = InMemory::new().with("TINY", linear_ticks(first_day(), 5, 10.0, 1.0));
    let pipeline = Pipeline::new(source, ComputeContext::seeded(1), quick_config()).unwrap();
    let err = pipeline.run_until("TINY", range()).unwrap_err();
    assert_eq!(err.symbol, "TINY");
    assert!(matches!(err.source, ForecastError::InsufficientData(_)));
    assert_eq!(err.status(), Status::BadRequest);
}

#[test]
fn too_few_windows_to_split_is_insufficient() {
    // 31 points make a single window, which cannot be split
    let source = InMemory::new().with("THIN", linear_ticks(first_day(), 31, 10.0, 1.0));
    let pipeline = Pipeline::new(source, ComputeContext::seeded(1), quick_config()).unwrap();
    let err = pipeline.run_until("THIN", range()).unwrap_err();
    assert!(matches!(err.source, ForecastError::InsufficientData(_)));
}

#[test]
fn empty_response_is_no_data() {
    let source = InMemory::new().with("EMPTY", Vec::new());
    let pipeline = Pipeline::new(source, ComputeContext::seeded(1), quick_config()).unwrap();
    for symbol in ["ZZZZ", "EMPTY"] {
        let err = pipeline.run_until(symbol, range()).unwrap_err();
        assert!(matches!(err.source, ForecastError::NoData { .. }));
        assert_eq!(err.status().http_code(), 404);
        assert!(err.to_string().contains(symbol));
    }
}

#[test]
fn upstream_failure_is_not_no_data() {
    let pipeline = Pipeline::new(Offline, ComputeContext::seeded(1), quick_config()).unwrap();
    let err = pipeline.run_until("AAPL", range()).unwrap_err();
    assert!(matches!(
        err.source,
        ForecastError::UpstreamUnavailable { .. }
    ));
    assert_eq!(err.status().http_code(), 502);
}

#[test]
fn blank_symbol_is_rejected() {
    let pipeline = Pipeline::new(InMemory::new(), ComputeContext::seeded(1), quick_config()).unwrap();
    let err = pipeline.run_until("   ", range()).unwrap_err();
    assert!(matches!(err.source, ForecastError::InvalidSymbol(_)));
}

#[test]
fn symbol_is_sanitized_before_lookup() {
    let source = InMemory::new().with("LIN", linear_ticks(first_day(), 60, 10.0, 1.0));
    let pipeline = Pipeline::new(source, ComputeContext::seeded(3), quick_config()).unwrap();
    let report = pipeline.run_until("  LIN extra words", range()).unwrap();
    assert_eq!(report.ticker, "LIN");
}

#[test]
fn constant_series_forecasts_the_constant() {
    let source = InMemory::new().with("FLAT", linear_ticks(first_day(), 60, 42.0, 0.0));
    let pipeline = Pipeline::new(source, ComputeContext::seeded(9), quick_config()).unwrap();
    let report = pipeline.run_until("FLAT", range()).unwrap();
    assert_eq!(report.rmse, 0.0);
    for prices in report.future_predictions.values.values() {
        assert!(prices.iter().all(|p| *p == 42.0));
    }
    assert_eq!(report.percent_change, 0.0);
}

#[test]
fn cancelled_run_fails() {
    let source = InMemory::new().with("LIN", linear_ticks(first_day(), 60, 10.0, 1.0));
    let token = CancelToken::new();
    let pipeline = Pipeline::new(source, ComputeContext::seeded(3), quick_config())
        .unwrap()
        .with_cancel(token.clone());
    token.cancel();
    let err = pipeline.run_until("LIN", range()).unwrap_err();
    assert!(matches!(err.source, ForecastError::Cancelled { epoch: 1 }));
    assert_eq!(err.status(), Status::Internal);
}

#[test]
fn invalid_config_is_rejected() {
    let config = ForecastConfig {
        train_fraction: 0.0,
        ..ForecastConfig::default()
    };
    assert!(matches!(
        Pipeline::new(InMemory::new(), ComputeContext::cpu(), config),
        Err(ForecastError::Config(_))
    ));
}

#[test]
fn report_serializes_horizon_keys() {
    let source = InMemory::new().with("LIN", linear_ticks(first_day(), 60, 10.0, 1.0));
    let pipeline = Pipeline::new(source, ComputeContext::seeded(3), quick_config()).unwrap();
    let report = pipeline.run_until("LIN", range()).unwrap();
    let json = serde_json::to_value(&report).unwrap();
    let values = &json["future_predictions"]["values"];
    for key in ["10", "20", "50"] {
        assert!(values[key].is_array(), "missing horizon {}", key);
    }
    assert_eq!(json["market_summary"]["date"], "2021-03-01");
    assert_eq!(json["loss_history"].as_array().unwrap().len(), 1);
}
