//! Fixed-width candle aggregation with an explicit rollover flag.

use chrono::{DateTime, Duration, DurationRound, Utc};
use rust_decimal::Decimal;
use strike_core::{Candle, CandleHistory};

/// What a tick did to the aggregator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RolloverOutcome {
    /// Tick landed in the currently open bucket.
    Updated,
    /// Tick opened a new bucket; the previous candle (if any) was frozen.
    Opened,
}

impl RolloverOutcome {
    #[must_use]
    pub const fn opened_new(self) -> bool {
        matches!(self, Self::Opened)
    }
}

/// Aggregates ticks into fixed-width OHLCV candles.
///
/// The open candle is owned exclusively here while its bucket is open; on
/// rollover it is frozen into the bounded history and a new one opens.
#[derive(Debug)]
pub struct CandleAggregator {
    interval: Duration,
    current: Option<Candle>,
    history: CandleHistory,
}

impl CandleAggregator {
    #[must_use]
    pub fn new(interval: Duration, capacity: usize) -> Self {
        Self {
            interval,
            current: None,
            history: CandleHistory::new(capacity),
        }
    }

    fn bucket_start(&self, timestamp: DateTime<Utc>) -> DateTime<Utc> {
        timestamp
            .duration_trunc(self.interval)
            .unwrap_or(timestamp)
    }

    /// Applies one tick. Returns whether it opened a new bucket; the flag
    /// drives the averages' roll-over and must be acted on before the next
    /// tick for the same underlying.
    pub fn apply(
        &mut self,
        price: Decimal,
        volume: Decimal,
        timestamp: DateTime<Utc>,
    ) -> RolloverOutcome {
        let start = self.bucket_start(timestamp);

        match &mut self.current {
            Some(candle) if candle.start == start => {
                candle.absorb(price, volume);
                RolloverOutcome::Updated
            }
            Some(candle) => {
                let frozen = candle.clone();
                self.history.push(frozen);
                self.current = Some(Candle::open_at(price, volume, start, self.interval));
                RolloverOutcome::Opened
            }
            None => {
                self.current = Some(Candle::open_at(price, volume, start, self.interval));
                RolloverOutcome::Opened
            }
        }
    }

    /// The still-forming candle, if any.
    #[must_use]
    pub fn current(&self) -> Option<&Candle> {
        self.current.as_ref()
    }

    /// Frozen candles, oldest first.
    #[must_use]
    pub fn history(&self) -> &CandleHistory {
        &self.history
    }

    /// Seeds history from backfilled candles (cold start).
    pub fn seed_history(&mut self, candles: Vec<Candle>) {
        for candle in candles {
            self.history.push(candle);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;

    fn ts(min: u32, sec: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 9, 2, 9, min, sec).unwrap()
    }

    #[test]
    fn single_bucket_yields_one_candle_with_exact_ohlc() {
        let mut agg = CandleAggregator::new(Duration::minutes(5), 100);

        let prices = [dec!(100), dec!(104), dec!(97), dec!(101)];
        let mut outcomes = Vec::new();
        for (i, price) in prices.iter().enumerate() {
            outcomes.push(agg.apply(*price, dec!(1), ts(15, i as u32 * 10)));
        }

        // New-candle flag true on exactly the first tick of the bucket.
        assert!(outcomes[0].opened_new());
        assert!(outcomes[1..].iter().all(|o| !o.opened_new()));

        let candle = agg.current().unwrap();
        assert_eq!(candle.open, dec!(100));
        assert_eq!(candle.high, dec!(104));
        assert_eq!(candle.low, dec!(97));
        assert_eq!(candle.close, dec!(101));
        assert!(agg.history().is_empty());
    }

    #[test]
    fn rollover_freezes_previous_candle() {
        let mut agg = CandleAggregator::new(Duration::minutes(5), 100);

        agg.apply(dec!(100), dec!(1), ts(15, 0));
        agg.apply(dec!(102), dec!(1), ts(17, 30));
        let outcome = agg.apply(dec!(103), dec!(1), ts(20, 0));

        assert!(outcome.opened_new());
        assert_eq!(agg.history().len(), 1);
        assert_eq!(agg.history().latest().unwrap().close, dec!(102));
        assert_eq!(agg.current().unwrap().open, dec!(103));
    }

    #[test]
    fn bucket_boundaries_truncate_to_interval() {
        let mut agg = CandleAggregator::new(Duration::minutes(5), 100);
        agg.apply(dec!(100), dec!(1), ts(17, 59));
        let candle = agg.current().unwrap();
        assert_eq!(candle.start, ts(15, 0));
    }

    #[test]
    fn flag_true_on_first_tick_of_each_bucket() {
        let mut agg = CandleAggregator::new(Duration::minutes(1), 100);
        let mut opened = 0;
        for minute in 0u32..5 {
            for sec in [0u32, 20, 40] {
                if agg.apply(dec!(100), dec!(1), ts(minute, sec)).opened_new() {
                    opened += 1;
                }
            }
        }
        assert_eq!(opened, 5);
    }
}
