/*!
Generate some fake daily tick data, written as Yahoo history CSV
*/
use anyhow::format_err;
use chrono::NaiveDate;
use clap::{Arg, Command};
use rand::rngs::StdRng;
use rand::{thread_rng, Rng, SeedableRng};
use std::fs::File;
use std::io::{stdout, Write};
use stockcast::data::fake::*;
use stockcast::data::yahoo::write_ticks;
use stockcast::data::Tick;

fn main() -> anyhow::Result<()> {
    let matches = Command::new("Fake Stock Data Generator")
        .version("1.0")
        .about("Generates fake daily stock data in Yahoo history format, as a linear trend or a random walk")
        .arg(
            Arg::new("POINTS")
                .help("Number of trading days to generate")
                .value_parser(clap::value_parser!(usize))
                .required(true),
        )
        .arg(
            Arg::new("output")
                .short('o')
                .long("output")
                .help("File to write to. Defaults to stdout"),
        )
        .arg(
            Arg::new("start")
                .long("start")
                .help("First day, as YYYY-MM-DD")
                .default_value("2020-01-01"),
        )
        .arg(
            Arg::new("price")
                .long("price")
                .value_parser(clap::value_parser!(f64))
                .help("Starting price")
                .default_value("40.0"),
        )
        .arg(
            Arg::new("linear")
                .long("linear")
                .value_parser(clap::value_parser!(f64))
                .help("Generate a linear trend moving by this much per day instead of a random walk"),
        )
        .arg(
            Arg::new("seed")
                .long("seed")
                .value_parser(clap::value_parser!(u64))
                .help("Seed the random walk"),
        )
        .get_matches();

    let points = *matches
        .get_one::<usize>("POINTS")
        .ok_or_else(|| format_err!("POINTS is required"))?;
    let start = matches
        .get_one::<String>("start")
        .map(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .transpose()?
        .ok_or_else(|| format_err!("Invalid start date"))?;
    let price = matches.get_one::<f64>("price").copied().unwrap_or(40.0);

    let ticks: Vec<Tick> = match matches.get_one::<f64>("linear") {
        Some(step) => TickGen::new(TradingDays(start), LinearTrend::new(price, *step))
            .take(points)
            .collect(),
        None => {
            let seed = matches
                .get_one::<u64>("seed")
                .copied()
                .unwrap_or_else(|| thread_rng().gen());
            let walk = PriceRandomWalk {
                rng: StdRng::seed_from_u64(seed),
                price,
                drift: 2e-4,
                volatility: 0.02,
            };
            TickGen::new(TradingDays(start), walk).take(points).collect()
        }
    };

    let written = match matches.get_one::<String>("output") {
        Some(path) => write_ticks(File::create(path)?, ticks.into_iter())?,
        None => write_ticks(stdout().lock(), ticks.into_iter())?,
    };
    stdout().flush()?;
    eprintln!("Wrote {} ticks", written);
    Ok(())
}
