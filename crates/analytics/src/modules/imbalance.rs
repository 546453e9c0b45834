//! Order-book bid/ask imbalance and spread-derived liquidity.

use crate::context::{ImbalanceContext, LiquidityLabel, ModuleContext};
use crate::registry::AnalyticsModule;
use crate::update::{keys, AnalyticsUpdate};

/// Spread bands (percent of mid) separating tight/normal/wide books.
const TIGHT_SPREAD_PCT: f64 = 0.05;
const WIDE_SPREAD_PCT: f64 = 0.25;

/// Tracks top-of-book quantity imbalance for the underlying's ATM zone.
#[derive(Default)]
pub struct ImbalanceTracker {
    latest: ImbalanceContext,
}

impl ImbalanceTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn label(spread_pct: f64) -> LiquidityLabel {
        if spread_pct <= TIGHT_SPREAD_PCT {
            LiquidityLabel::Tight
        } else if spread_pct >= WIDE_SPREAD_PCT {
            LiquidityLabel::Wide
        } else {
            LiquidityLabel::Normal
        }
    }
}

impl AnalyticsModule for ImbalanceTracker {
    fn name(&self) -> &str {
        "imbalance"
    }

    fn update(&mut self, update: &AnalyticsUpdate) {
        let (Some(bid_qty), Some(ask_qty)) =
            (update.scalar(keys::BID_QTY), update.scalar(keys::ASK_QTY))
        else {
            return;
        };
        if ask_qty <= 0.0 {
            return;
        }

        let spread_pct = update.scalar(keys::SPREAD_PCT).unwrap_or(0.0).max(0.0);

        self.latest = ImbalanceContext {
            bid_ask_ratio: bid_qty / ask_qty,
            spread_pct,
            liquidity: Self::label(spread_pct),
            ready: true,
        };
    }

    fn context(&self) -> ModuleContext {
        ModuleContext::Imbalance(self.latest.clone())
    }

    fn reset(&mut self) {
        self.latest = ImbalanceContext::default();
    }
}
