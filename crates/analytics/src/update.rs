//! Open update payload handed to every analytics module.
//!
//! This is the one boundary where "unknown keys ignored" applies: modules
//! read the scalars they recognize and skip the rest, so new producers can
//! add keys without touching existing modules.

use chrono::{DateTime, Utc};
use std::collections::HashMap;
use strike_core::{OptionQuote, OrderLeg};

/// Scalar keys producers and modules agree on. Unrecognized keys are ignored
/// on the module side, so this list may grow freely.
pub mod keys {
    pub const SPOT: &str = "spot";
    pub const ATM_IV: &str = "atm_iv";
    pub const TREND_STRENGTH_PCT: &str = "trend_strength_pct";
    pub const BAND_WIDTH_PCT: &str = "band_width_pct";
    pub const RANGE_PCT: &str = "range_pct";
    pub const BID_QTY: &str = "bid_qty";
    pub const ASK_QTY: &str = "ask_qty";
    pub const SPREAD_PCT: &str = "spread_pct";
    pub const PRICE: &str = "price";
}

#[derive(Debug, Clone, Default)]
pub struct AnalyticsUpdate {
    pub timestamp: Option<DateTime<Utc>>,
    scalars: HashMap<String, f64>,
    pub chain: Option<Vec<OptionQuote>>,
    pub open_legs: Option<Vec<OrderLeg>>,
    /// Instrument the scalar readings belong to, when per-instrument.
    pub instrument: Option<String>,
}

impl AnalyticsUpdate {
    #[must_use]
    pub fn at(timestamp: DateTime<Utc>) -> Self {
        Self {
            timestamp: Some(timestamp),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_scalar(mut self, key: impl Into<String>, value: f64) -> Self {
        self.scalars.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn with_chain(mut self, chain: Vec<OptionQuote>) -> Self {
        self.chain = Some(chain);
        self
    }

    #[must_use]
    pub fn with_open_legs(mut self, legs: Vec<OrderLeg>) -> Self {
        self.open_legs = Some(legs);
        self
    }

    #[must_use]
    pub fn with_instrument(mut self, instrument: impl Into<String>) -> Self {
        self.instrument = Some(instrument.into());
        self
    }

    /// Scalar by key; absent keys are simply not there.
    #[must_use]
    pub fn scalar(&self, key: &str) -> Option<f64> {
        self.scalars.get(key).copied()
    }

    #[must_use]
    pub fn timestamp_or_now(&self) -> DateTime<Utc> {
        self.timestamp.unwrap_or_else(Utc::now)
    }
}
