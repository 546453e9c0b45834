//! At-the-money subscription window.
//!
//! The engine only tracks a band of strikes around spot. When spot drifts
//! far enough that the ATM strike moves, the window rolls: new strikes are
//! subscribed, strikes that fell out are dropped.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use std::collections::BTreeSet;
use strike_core::OptionRight;
use strike_strategy::chain_select::atm_strike;
use tracing::info;

/// Deterministic option instrument id used at the feed boundary.
#[must_use]
pub fn option_symbol(
    underlying: &str,
    expiry: NaiveDate,
    strike: Decimal,
    right: OptionRight,
) -> String {
    format!("{underlying}-{}-{strike}-{right}", expiry.format("%Y%m%d"))
}

/// Subscription diff produced by a window roll.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowShift {
    pub subscribe: Vec<String>,
    pub unsubscribe: Vec<String>,
}

/// Tracks which option instruments the engine should be subscribed to.
#[derive(Debug)]
pub struct AtmWindow {
    underlying: String,
    step: Decimal,
    span: u32,
    atm: Option<Decimal>,
    subscribed: BTreeSet<String>,
}

impl AtmWindow {
    #[must_use]
    pub fn new(underlying: String, step: Decimal, span: u32) -> Self {
        Self {
            underlying,
            step,
            span,
            atm: None,
            subscribed: BTreeSet::new(),
        }
    }

    /// Instruments the window should cover for `spot`: both rights at every
    /// strike within `span` steps of ATM.
    fn desired(&self, spot: f64, expiry: NaiveDate) -> BTreeSet<String> {
        let atm = atm_strike(spot, self.step);
        let mut set = BTreeSet::new();
        let span = Decimal::from(self.span) * self.step;
        let mut strike = atm - span;
        while strike <= atm + span {
            for right in [OptionRight::Call, OptionRight::Put] {
                set.insert(option_symbol(&self.underlying, expiry, strike, right));
            }
            strike += self.step;
        }
        set
    }

    /// Rolls the window for the latest spot. `None` when the ATM strike has
    /// not moved; otherwise the subscribe/unsubscribe diff to apply.
    pub fn roll(&mut self, spot: f64, expiry: NaiveDate) -> Option<WindowShift> {
        let atm = atm_strike(spot, self.step);
        if self.atm == Some(atm) {
            return None;
        }

        let desired = self.desired(spot, expiry);
        let subscribe: Vec<String> = desired.difference(&self.subscribed).cloned().collect();
        let unsubscribe: Vec<String> = self.subscribed.difference(&desired).cloned().collect();
        self.atm = Some(atm);
        self.subscribed = desired;

        if subscribe.is_empty() && unsubscribe.is_empty() {
            return None;
        }
        info!(
            atm = %atm,
            add = subscribe.len(),
            drop = unsubscribe.len(),
            "ATM window rolled"
        );
        Some(WindowShift {
            subscribe,
            unsubscribe,
        })
    }

    #[must_use]
    pub fn instruments(&self) -> Vec<String> {
        self.subscribed.iter().cloned().collect()
    }
}
