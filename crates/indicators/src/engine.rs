//! Per-underlying bundle of candle aggregation and EMA tracking.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use std::collections::BTreeMap;
use strike_core::{Candle, CandleHistory};

use crate::candle::{CandleAggregator, RolloverOutcome};
use crate::ema::StreamingEma;

/// Read-only view of the indicator state for one underlying.
#[derive(Debug, Clone)]
pub struct IndicatorView {
    /// Finalized EMA per period, as of the last candle close.
    pub ema_finalized: BTreeMap<usize, f64>,
    /// Current EMA per period, tracking the forming candle.
    pub ema_current: BTreeMap<usize, f64>,
    /// Percent gap between the fastest and slowest EMA, relative to price.
    pub trend_strength_pct: f64,
    /// Positive: fast above slow (uptrend); negative: downtrend.
    pub trend_direction: f64,
    /// Percent price change over the confirmation window.
    pub momentum_pct: f64,
    /// Rolling close-price band width as a percent of the mean close.
    pub band_width_pct: f64,
    /// Average candle range percent over the recent window.
    pub avg_range_pct: f64,
    pub last_close: Option<f64>,
    pub candle_count: usize,
    /// Closed-candle closes over the stats window, oldest first.
    pub recent_closes: Vec<f64>,
    /// Closed-candle highs over the stats window, oldest first.
    pub recent_highs: Vec<f64>,
    /// Closed-candle lows over the stats window, oldest first.
    pub recent_lows: Vec<f64>,
}

impl IndicatorView {
    /// View with every statistic at its neutral value.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            ema_finalized: BTreeMap::new(),
            ema_current: BTreeMap::new(),
            trend_strength_pct: 0.0,
            trend_direction: 0.0,
            momentum_pct: 0.0,
            band_width_pct: 0.0,
            avg_range_pct: 0.0,
            last_close: None,
            candle_count: 0,
            recent_closes: Vec::new(),
            recent_highs: Vec::new(),
            recent_lows: Vec::new(),
        }
    }
}

/// Owns all mutable indicator state for one underlying.
///
/// Single writer: only the decision loop calls `on_tick`, which keeps the
/// new-candle flag and the EMA roll-over from interleaving.
pub struct IndicatorEngine {
    aggregator: CandleAggregator,
    emas: Vec<StreamingEma>,
    /// Candles inspected for momentum/band statistics.
    stats_window: usize,
}

impl IndicatorEngine {
    #[must_use]
    pub fn new(interval: Duration, capacity: usize, ema_periods: &[usize]) -> Self {
        Self {
            aggregator: CandleAggregator::new(interval, capacity),
            emas: ema_periods.iter().map(|&p| StreamingEma::new(p)).collect(),
            stats_window: 20,
        }
    }

    /// Cold-starts from backfilled candles, the last possibly still forming.
    pub fn seed(&mut self, candles: Vec<Candle>, last_is_incomplete: bool) {
        let closes: Vec<f64> = candles.iter().map(Candle::close_f64).collect();
        for ema in &mut self.emas {
            ema.initialize(&closes, last_is_incomplete);
        }

        let mut frozen = candles;
        if last_is_incomplete {
            if let Some(forming) = frozen.pop() {
                self.aggregator.seed_history(frozen);
                self.aggregator
                    .apply(forming.close, forming.volume, forming.start);
                return;
            }
        }
        self.aggregator.seed_history(frozen);
    }

    /// Feeds one underlying tick through aggregation and the EMA set.
    ///
    /// Roll-over happens before the update when the tick opened a new bucket,
    /// so the closing candle's trajectory is committed exactly once.
    pub fn on_tick(&mut self, price: Decimal, volume: Decimal, timestamp: DateTime<Utc>) -> RolloverOutcome {
        let outcome = self.aggregator.apply(price, volume, timestamp);

        let price_f = price.to_f64().unwrap_or(0.0);
        if outcome.opened_new() {
            for ema in &mut self.emas {
                ema.on_candle_close();
            }
        }
        for ema in &mut self.emas {
            ema.update(price_f);
        }

        outcome
    }

    #[must_use]
    pub fn history(&self) -> &CandleHistory {
        self.aggregator.history()
    }

    #[must_use]
    pub fn current_candle(&self) -> Option<&Candle> {
        self.aggregator.current()
    }

    /// Snapshot of every derived statistic. Pure read; never fails.
    #[must_use]
    pub fn view(&self) -> IndicatorView {
        let mut view = IndicatorView::empty();

        for ema in &self.emas {
            if let Some(value) = ema.finalized() {
                view.ema_finalized.insert(ema.period(), value);
            }
            if let Some(value) = ema.current() {
                view.ema_current.insert(ema.period(), value);
            }
        }

        let history = self.aggregator.history();
        view.candle_count = history.len();
        view.last_close = self
            .aggregator
            .current()
            .or_else(|| history.latest())
            .map(Candle::close_f64);

        if let (Some(&fast), Some(&slow), Some(close)) = (
            view.ema_current.values().next(),
            view.ema_current.values().last(),
            view.last_close,
        ) {
            if close > 0.0 {
                view.trend_strength_pct = ((fast - slow).abs() / close) * 100.0;
                view.trend_direction = fast - slow;
            }
        }

        let recent = history.last_n(self.stats_window);
        view.recent_closes = recent.iter().map(|c| c.close_f64()).collect();
        view.recent_highs = recent
            .iter()
            .map(|c| c.high.to_f64().unwrap_or(0.0))
            .collect();
        view.recent_lows = recent
            .iter()
            .map(|c| c.low.to_f64().unwrap_or(0.0))
            .collect();
        if recent.len() >= 2 {
            let closes: Vec<f64> = recent.iter().map(|c| c.close_f64()).collect();
            let first = closes[0];
            let last = closes[closes.len() - 1];
            if first > 0.0 {
                view.momentum_pct = (last - first) / first * 100.0;
            }

            let mean = closes.iter().sum::<f64>() / closes.len() as f64;
            if mean > 0.0 {
                let max = closes.iter().cloned().fold(f64::MIN, f64::max);
                let min = closes.iter().cloned().fold(f64::MAX, f64::min);
                view.band_width_pct = (max - min) / mean * 100.0;
            }

            view.avg_range_pct =
                recent.iter().map(|c| c.range_pct()).sum::<f64>() / recent.len() as f64;
        }

        view
    }
}
