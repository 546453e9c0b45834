//! Streaming exponential moving average with finalized/current split.
//!
//! `finalized` is the value as of the last candle close; `current` tracks the
//! still-forming candle. `update` always recomputes `current` from
//! `finalized`, so repeated updates within one bucket are idempotent in the
//! recurrence sense, and `on_candle_close` rolls current into finalized.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamingEma {
    period: usize,
    alpha: f64,
    finalized: Option<f64>,
    current: Option<f64>,
}

impl StreamingEma {
    #[must_use]
    pub fn new(period: usize) -> Self {
        let alpha = 2.0 / (period as f64 + 1.0);
        Self {
            period,
            alpha,
            finalized: None,
            current: None,
        }
    }

    #[must_use]
    pub const fn period(&self) -> usize {
        self.period
    }

    /// One-shot recurrence over a full history; seed is the first value.
    ///
    /// This is the reference trajectory the streaming path must reproduce.
    #[must_use]
    pub fn one_shot(period: usize, values: &[f64]) -> Option<f64> {
        let alpha = 2.0 / (period as f64 + 1.0);
        let mut ema: Option<f64> = None;
        for &value in values {
            ema = Some(match ema {
                None => value,
                Some(prev) => alpha * value + (1.0 - alpha) * prev,
            });
        }
        ema
    }

    /// Seeds finalized/current from historical closes.
    ///
    /// With `last_is_incomplete`, the most recent point belongs to a bar that
    /// is still forming: `finalized` is computed without it and `current`
    /// with it, so the first live tick continues the trajectory without a
    /// discontinuity.
    pub fn initialize(&mut self, history: &[f64], last_is_incomplete: bool) {
        if history.is_empty() {
            self.finalized = None;
            self.current = None;
            return;
        }

        if last_is_incomplete {
            let (closed, forming) = history.split_at(history.len() - 1);
            self.finalized = Self::one_shot(self.period, closed);
            self.current = Some(match self.finalized {
                None => forming[0],
                Some(prev) => self.alpha * forming[0] + (1.0 - self.alpha) * prev,
            });
        } else {
            self.finalized = Self::one_shot(self.period, history);
            self.current = self.finalized;
        }
    }

    /// Recomputes `current` for the forming candle's latest price.
    pub fn update(&mut self, price: f64) {
        self.current = Some(match self.finalized {
            None => price,
            Some(prev) => self.alpha * price + (1.0 - self.alpha) * prev,
        });
    }

    /// Rolls current into finalized at candle close.
    pub fn on_candle_close(&mut self) {
        if self.current.is_some() {
            self.finalized = self.current;
        }
    }

    /// Value as of the last completed candle.
    #[must_use]
    pub const fn finalized(&self) -> Option<f64> {
        self.finalized
    }

    /// Value tracking the forming candle.
    #[must_use]
    pub const fn current(&self) -> Option<f64> {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const TOL: f64 = 1e-9;

    /// Replays `closes` as live bars: update with the close, then roll over.
    fn replay(ema: &mut StreamingEma, closes: &[f64]) {
        for &close in closes {
            ema.update(close);
            ema.on_candle_close();
        }
    }

    #[test]
    fn split_equivalence_last_complete() {
        let history: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64 * 0.7).sin() * 5.0).collect();

        for k in 1..history.len() {
            let mut ema = StreamingEma::new(9);
            ema.initialize(&history[..k], false);
            replay(&mut ema, &history[k..]);

            let reference = StreamingEma::one_shot(9, &history).unwrap();
            assert!(
                (ema.finalized().unwrap() - reference).abs() < TOL,
                "k={k}"
            );
        }
    }

    #[test]
    fn split_equivalence_last_incomplete() {
        let history: Vec<f64> = (0..30).map(|i| 200.0 + i as f64).collect();

        for k in 2..history.len() {
            // History up to k with the k-th value still forming.
            let mut ema = StreamingEma::new(21);
            ema.initialize(&history[..k], true);

            // The forming bar closes at its seeded value, then the rest replay.
            ema.on_candle_close();
            replay(&mut ema, &history[k..]);

            let reference = StreamingEma::one_shot(21, &history).unwrap();
            assert!(
                (ema.finalized().unwrap() - reference).abs() < TOL,
                "k={k}"
            );
        }
    }

    #[test]
    fn incomplete_seed_matches_live_revision_of_forming_bar() {
        let history = [100.0, 101.0, 102.0, 103.0];

        let mut seeded = StreamingEma::new(5);
        seeded.initialize(&history, true);

        // Same state reached by closing three bars and updating with the fourth.
        let mut live = StreamingEma::new(5);
        live.initialize(&history[..3], false);
        live.update(history[3]);

        assert!((seeded.current().unwrap() - live.current().unwrap()).abs() < TOL);
        assert!((seeded.finalized().unwrap() - live.finalized().unwrap()).abs() < TOL);
    }

    #[test]
    fn update_is_idempotent_within_a_bucket() {
        let mut ema = StreamingEma::new(9);
        ema.initialize(&[100.0, 101.0, 102.0], false);

        ema.update(105.0);
        let first = ema.current().unwrap();
        ema.update(105.0);
        assert!((ema.current().unwrap() - first).abs() < TOL);

        // A revised forming price replaces, not compounds.
        ema.update(90.0);
        ema.update(105.0);
        assert!((ema.current().unwrap() - first).abs() < TOL);
    }

    #[test]
    fn rollover_copies_current_to_finalized() {
        let mut ema = StreamingEma::new(9);
        ema.initialize(&[100.0], false);
        ema.update(110.0);

        let current = ema.current().unwrap();
        assert!((ema.finalized().unwrap() - 100.0).abs() < TOL);

        ema.on_candle_close();
        assert!((ema.finalized().unwrap() - current).abs() < TOL);
    }

    #[test]
    fn empty_history_leaves_ema_unseeded() {
        let mut ema = StreamingEma::new(9);
        ema.initialize(&[], false);
        assert!(ema.finalized().is_none());
        assert!(ema.current().is_none());
    }
}
