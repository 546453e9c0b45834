//! Market data model shared by every engine crate.
//!
//! Ticks are produced once at the feed boundary and never mutated after.
//! Candles are owned by the indicator engine while their bucket is open and
//! frozen into a bounded history on rollover.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// Role of an instrument in the tracked market.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TickKind {
    Underlying,
    Option,
}

/// A normalized price/open-interest/volume update for one instrument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tick {
    pub instrument: String,
    pub price: Decimal,
    /// Populated for option contracts only.
    pub open_interest: Option<Decimal>,
    pub volume: Decimal,
    pub timestamp: DateTime<Utc>,
    pub kind: TickKind,
}

/// Call or put.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionRight {
    Call,
    Put,
}

impl std::fmt::Display for OptionRight {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Call => write!(f, "CE"),
            Self::Put => write!(f, "PE"),
        }
    }
}

/// Option price sensitivities plus a 0-100 trustworthiness score.
///
/// Always recomputed from fresh inputs, never mutated in place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct GreeksSnapshot {
    pub delta: f64,
    pub gamma: f64,
    pub theta: f64,
    pub vega: f64,
    pub rho: f64,
    pub implied_vol: f64,
    pub quality: u8,
}

impl GreeksSnapshot {
    /// All-zero Greeks for degenerate inputs (expired, zero vol).
    #[must_use]
    pub const fn zero() -> Self {
        Self {
            delta: 0.0,
            gamma: 0.0,
            theta: 0.0,
            vega: 0.0,
            rho: 0.0,
            implied_vol: 0.0,
            quality: 0,
        }
    }
}

/// One row of the tracked option chain.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OptionQuote {
    pub instrument: String,
    pub strike: Decimal,
    pub right: OptionRight,
    pub expiry: NaiveDate,
    pub last_price: Decimal,
    pub open_interest: Decimal,
    pub volume: Decimal,
    pub bid_price: Option<Decimal>,
    pub bid_qty: Option<Decimal>,
    pub ask_price: Option<Decimal>,
    pub ask_qty: Option<Decimal>,
    pub greeks: Option<GreeksSnapshot>,
    pub updated_at: DateTime<Utc>,
}

impl OptionQuote {
    /// Days until expiry, measured from `now`.
    #[must_use]
    pub fn days_to_expiry(&self, now: DateTime<Utc>) -> i64 {
        (self.expiry - now.date_naive()).num_days()
    }
}

/// Instrument metadata from the reference-data boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstrumentMeta {
    pub instrument: String,
    pub strike: Decimal,
    pub right: OptionRight,
    pub expiry: NaiveDate,
    pub lot_size: u32,
}

/// OHLCV for one fixed-width bucket.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candle {
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    pub close: Decimal,
    pub volume: Decimal,
    /// Bucket start, truncated to the interval boundary.
    pub start: DateTime<Utc>,
    pub interval: Duration,
}

impl Candle {
    /// Opens a fresh candle from the first tick of a bucket.
    #[must_use]
    pub fn open_at(price: Decimal, volume: Decimal, start: DateTime<Utc>, interval: Duration) -> Self {
        Self {
            open: price,
            high: price,
            low: price,
            close: price,
            volume,
            start,
            interval,
        }
    }

    /// Folds another tick from the same bucket into this candle.
    pub fn absorb(&mut self, price: Decimal, volume: Decimal) {
        if price > self.high {
            self.high = price;
        }
        if price < self.low {
            self.low = price;
        }
        self.close = price;
        self.volume += volume;
    }

    /// Close as `f64` for indicator recurrences.
    #[must_use]
    pub fn close_f64(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        self.close.to_f64().unwrap_or(0.0)
    }

    /// Candle range as a percentage of the close.
    #[must_use]
    pub fn range_pct(&self) -> f64 {
        use rust_decimal::prelude::ToPrimitive;
        if self.close.is_zero() {
            return 0.0;
        }
        ((self.high - self.low) / self.close)
            .to_f64()
            .unwrap_or(0.0)
            * 100.0
    }
}

/// Rolling candle history with a capacity ceiling; oldest candles evicted.
#[derive(Debug, Clone)]
pub struct CandleHistory {
    candles: VecDeque<Candle>,
    capacity: usize,
}

impl CandleHistory {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            candles: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    /// Appends a frozen candle, evicting past the capacity ceiling.
    pub fn push(&mut self, candle: Candle) {
        self.candles.push_back(candle);
        while self.candles.len() > self.capacity {
            self.candles.pop_front();
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.candles.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.candles.is_empty()
    }

    #[must_use]
    pub fn latest(&self) -> Option<&Candle> {
        self.candles.back()
    }

    /// Most recent `n` candles, oldest first.
    #[must_use]
    pub fn last_n(&self, n: usize) -> Vec<&Candle> {
        let skip = self.candles.len().saturating_sub(n);
        self.candles.iter().skip(skip).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Candle> {
        self.candles.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn candle(close: Decimal) -> Candle {
        Candle::open_at(close, dec!(10), Utc::now(), Duration::minutes(5))
    }

    #[test]
    fn candle_absorb_tracks_high_low_close() {
        let mut c = Candle::open_at(dec!(100), dec!(1), Utc::now(), Duration::minutes(5));
        c.absorb(dec!(105), dec!(2));
        c.absorb(dec!(98), dec!(3));
        c.absorb(dec!(101), dec!(1));

        assert_eq!(c.open, dec!(100));
        assert_eq!(c.high, dec!(105));
        assert_eq!(c.low, dec!(98));
        assert_eq!(c.close, dec!(101));
        assert_eq!(c.volume, dec!(7));
    }

    #[test]
    fn history_evicts_past_capacity() {
        let mut history = CandleHistory::new(3);
        for i in 1..=5 {
            history.push(candle(Decimal::from(i)));
        }
        assert_eq!(history.len(), 3);
        let closes: Vec<Decimal> = history.iter().map(|c| c.close).collect();
        assert_eq!(closes, vec![dec!(3), dec!(4), dec!(5)]);
    }

    #[test]
    fn last_n_returns_most_recent_oldest_first() {
        let mut history = CandleHistory::new(10);
        for i in 1..=5 {
            history.push(candle(Decimal::from(i)));
        }
        let tail = history.last_n(2);
        assert_eq!(tail.len(), 2);
        assert_eq!(tail[0].close, dec!(4));
        assert_eq!(tail[1].close, dec!(5));
    }
}
