/*!
Generate fake tick data, for testing purposes
*/
use super::Tick;
use chrono::{Datelike, Duration, NaiveDate, Weekday};
use rand::Rng;
use rand_distr::{Distribution, Normal};
use std::iter::Peekable;

/// Generate tick data using a price generator and a time generator
#[derive(Debug, Clone)]
pub struct TickGen<D: Iterator<Item = NaiveDate>, P: PriceGen> {
    /// The time generator in use
    pub time_generator: Peekable<D>,
    /// The price generator in use
    pub price_generator: P,
    /// The constant volume reported for each tick
    pub volume: f64,
    /// The date of the previously generated tick
    pub last: Option<NaiveDate>,
}

impl<D: Iterator<Item = NaiveDate>, P: PriceGen> TickGen<D, P> {
    /// Create a new tick generator
    pub fn new(time_generator: D, price_generator: P) -> TickGen<D, P> {
        TickGen {
            time_generator: time_generator.peekable(),
            price_generator,
            volume: 1_000_000.0,
            last: None,
        }
    }
}

impl<D: Iterator<Item = NaiveDate>, P: PriceGen> Iterator for TickGen<D, P> {
    type Item = Tick;
    fn next(&mut self) -> Option<Tick> {
        let t = self.time_generator.next()?;
        let after = self.last.map(|last| t - last).unwrap_or_else(Duration::zero);
        self.last = Some(t);
        let o = self.price_generator.current();
        let c = self.price_generator.price_after(after);
        Some(Tick {
            t,
            o,
            h: o.max(c),
            l: o.min(c),
            c,
            v: self.volume,
        })
    }
}

/// A trait implemented by price generators
pub trait PriceGen {
    /// Generate a price, jumping forward a given duration
    fn price_after(&mut self, after: Duration) -> f64;
    /// The most recently generated price
    fn current(&self) -> f64;
}

/// Prices moving by a fixed amount per tick, regardless of elapsed time
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct LinearTrend {
    /// The next price to generate
    pub price: f64,
    /// The change per tick
    pub step: f64,
    /// Whether the first price has been emitted
    started: bool,
}

impl LinearTrend {
    /// A trend starting at `start` and moving by `step` per tick
    pub fn new(start: f64, step: f64) -> LinearTrend {
        LinearTrend {
            price: start,
            step,
            started: false,
        }
    }
}

impl PriceGen for LinearTrend {
    fn price_after(&mut self, _after: Duration) -> f64 {
        if self.started {
            self.price += self.step;
        }
        self.started = true;
        self.price
    }
    fn current(&self) -> f64 {
        self.price
    }
}

/// Generate fake prices using a time-weighted geometric random walk
#[derive(Debug, Copy, Clone)]
pub struct PriceRandomWalk<R> {
    /// The RNG used by this random walk
    pub rng: R,
    /// The current price
    pub price: f64,
    /// The drift per day, as a log-return
    pub drift: f64,
    /// The volatility per day, as a log-return standard deviation
    pub volatility: f64,
}

impl<R: Rng> PriceGen for PriceRandomWalk<R> {
    fn price_after(&mut self, after: Duration) -> f64 {
        let days = after.num_seconds() as f64 / 86_400.0;
        if days > 0.0 {
            let shock = Normal::new(self.drift * days, self.volatility * days.sqrt())
                .map(|dist| dist.sample(&mut self.rng))
                .unwrap_or(0.0);
            self.price *= shock.exp();
        }
        self.price
    }
    fn current(&self) -> f64 {
        self.price
    }
}

/// An infinite iterator over weekdays, starting at (or just after) a given date
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct TradingDays(pub NaiveDate);

impl Iterator for TradingDays {
    type Item = NaiveDate;
    fn next(&mut self) -> Option<NaiveDate> {
        while matches!(self.0.weekday(), Weekday::Sat | Weekday::Sun) {
            self.0 = self.0.succ_opt()?;
        }
        let day = self.0;
        self.0 = self.0.succ_opt()?;
        Some(day)
    }
}

/// `n` ticks of a linear trend on consecutive calendar days: `close[i] = start + i * step`
pub fn linear_ticks(first: NaiveDate, n: usize, start: f64, step: f64) -> Vec<Tick> {
    let days = (0..).map(move |i| first + Duration::days(i));
    TickGen::new(days, LinearTrend::new(start, step))
        .take(n)
        .collect()
}
