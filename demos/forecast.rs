/*!
Forecast a stock's closing price with a freshly trained LSTM, printing the report as JSON
*/

use anyhow::format_err;
use candle_core::Device;
use clap::{Arg, ArgAction, Command};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use stockcast::compute::ComputeContext;
use stockcast::config::ForecastConfig;
use stockcast::data::source::{CsvDirectory, DateRange, MarketData};
use stockcast::data::yahoo::{YahooChart, YAHOO_CHART_URL};
use stockcast::pipeline::Pipeline;
use tracing_subscriber::EnvFilter;

pub fn run_forecast<S: MarketData>(
    pipeline: &Pipeline<S>,
    symbol: &str,
    progress: bool,
) -> anyhow::Result<String> {
    let epochs_progress = if progress {
        let bar = ProgressBar::new(pipeline.config.epochs as u64);
        bar.set_style(
            ProgressStyle::default_bar().template("Training: {wide_bar} {pos:>4}/{len:4} {msg}")?,
        );
        bar
    } else {
        ProgressBar::hidden()
    };

    let result = pipeline.run_with(symbol, DateRange::history_until_today(), |_epoch, loss| {
        epochs_progress.set_message(format!("loss = {:.6}", loss));
        epochs_progress.inc(1);
    });
    epochs_progress.finish_and_clear();

    match result {
        Ok(report) => Ok(serde_json::to_string_pretty(&report)?),
        Err(err) => Err(format_err!("{} (status {})", err, err.status().http_code())),
    }
}

pub fn main() -> anyhow::Result<()> {
    // Initialization, argument parsing
    let matches = Command::new("Stockcast")
        .version("1.0")
        .about("Trains an LSTM on a stock's daily closes and forecasts the next 10, 20 and 50 days")
        .arg(
            Arg::new("SYMBOL")
                .help("The ticker symbol to forecast")
                .required(true),
        )
        .arg(
            Arg::new("data")
                .short('d')
                .long("data")
                .help("Read <SYMBOL>.csv files in Yahoo history format from this directory instead of the chart API"),
        )
        .arg(
            Arg::new("url")
                .long("url")
                .help("The chart API endpoint")
                .default_value(YAHOO_CHART_URL),
        )
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .help("A TOML file overriding the default hyperparameters"),
        )
        .arg(
            Arg::new("device")
                .long("device")
                .help("Device to use: cuda, cpu. Defaults to cuda if available"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .help("Seed parameter initialization for a reproducible run"),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .action(ArgAction::Count)
                .help("Sets the level of verbosity"),
        )
        .get_matches();

    let verbosity = matches.get_count("verbose");
    let default_level = match verbosity {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let seed = matches.get_one::<u64>("seed").copied();
    let device: Device = match matches.get_one::<String>("device").map(String::as_str) {
        None => ComputeContext::detect()?.device().clone(),
        Some("cuda") => Device::new_cuda(0)?,
        Some("cpu") => Device::Cpu,
        Some(device) => Err(format_err!("Invalid value for device: {:?}", device))?,
    };
    let ctx = ComputeContext::with_device(device, seed);
    if verbosity >= 1 {
        eprintln!("Device: {:?}, seed: {:?}", ctx.device(), ctx.seed());
    }

    let config = match matches.get_one::<String>("config") {
        Some(path) => ForecastConfig::load(Path::new(path))?,
        None => ForecastConfig::default(),
    };

    let symbol = matches
        .get_one::<String>("SYMBOL")
        .ok_or_else(|| format_err!("SYMBOL is required"))?;
    let progress = verbosity >= 1;
    let json = match matches.get_one::<String>("data") {
        Some(dir) => run_forecast(&Pipeline::new(CsvDirectory::new(dir), ctx, config)?, symbol, progress)?,
        None => {
            let url = matches
                .get_one::<String>("url")
                .map(String::as_str)
                .unwrap_or(YAHOO_CHART_URL);
            run_forecast(&Pipeline::new(YahooChart::new(url)?, ctx, config)?, symbol, progress)?
        }
    };
    println!("{}", json);
    Ok(())
}
