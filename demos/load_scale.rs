/*!
Load Yahoo history data and scale it onto [0, 1]
*/
use clap::{Arg, Command};
use io_enum::*;
use std::fs::File;
use std::io::{stdin, Stdin};
use std::path::Path;
use stockcast::config::{TRAIN_FRACTION, WINDOW_LENGTH};
use stockcast::data::scale::MinMaxScaler;
use stockcast::data::window::{build_windows, train_test_split};
use stockcast::data::yahoo::read_ticks;
use stockcast::data::PriceSeries;

#[derive(Debug, Read)]
pub enum IoSources {
    Stdin(Stdin),
    File(File),
}

fn main() -> anyhow::Result<()> {
    let matches = Command::new("Stock Data Scaler")
        .version("1.0")
        .about("Loads stock data from a file (or stdin), fits a min-max scaler to its closes and reports how it would be windowed")
        .arg(
            Arg::new("INPUT")
                .help("Sets the input file to use")
                .index(1),
        )
        .arg(
            Arg::new("length")
                .short('l')
                .long("length")
                .value_parser(clap::value_parser!(usize))
                .help("Window length"),
        )
        .get_matches();
    let reader = if let Some(path) = matches.get_one::<String>("INPUT") {
        IoSources::File(File::open(Path::new(path))?)
    } else {
        IoSources::Stdin(stdin())
    };
    let length = matches
        .get_one::<usize>("length")
        .copied()
        .unwrap_or(WINDOW_LENGTH);

    let series = PriceSeries::new("INPUT", read_ticks(reader)?)?;
    let (scaled, scaler) = MinMaxScaler::fit_transform(&series.closes())?;
    println!("First tick {:?}", series.ticks()[0]);
    println!("Last tick {:?}", series.last());
    println!("Scaler {:?} (degenerate: {})", scaler, scaler.is_degenerate());

    let windows = build_windows(&scaled, length)?;
    let total = windows.len();
    let split = train_test_split(windows, TRAIN_FRACTION)?;
    println!(
        "{} points, {} windows of length {}: {} train, {} test",
        series.len(),
        total,
        length,
        split.train.len(),
        split.test.len()
    );
    Ok(())
}
