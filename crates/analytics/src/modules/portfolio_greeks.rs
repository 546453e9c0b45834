//! Aggregate Greek exposure across open legs.

use crate::context::{HedgeSuggestion, ModuleContext, PortfolioContext};
use crate::registry::AnalyticsModule;
use crate::update::AnalyticsUpdate;

/// Sums signed Greeks over the open legs and suggests a hedge once net delta
/// leaves the configured band. Sell legs contribute with flipped sign.
pub struct PortfolioGreeksTracker {
    hedge_delta_threshold: f64,
    latest: PortfolioContext,
}

impl PortfolioGreeksTracker {
    #[must_use]
    pub fn new(hedge_delta_threshold: f64) -> Self {
        Self {
            hedge_delta_threshold,
            latest: PortfolioContext::default(),
        }
    }
}

impl AnalyticsModule for PortfolioGreeksTracker {
    fn name(&self) -> &str {
        "portfolio_greeks"
    }

    fn update(&mut self, update: &AnalyticsUpdate) {
        let Some(legs) = update.open_legs.as_deref() else {
            return;
        };

        let mut net_delta = 0.0;
        let mut net_gamma = 0.0;
        let mut net_theta = 0.0;
        let mut net_vega = 0.0;

        for leg in legs {
            let sign = match leg.side {
                strike_core::OrderSide::Buy => 1.0,
                strike_core::OrderSide::Sell => -1.0,
            };
            let qty = f64::from(leg.quantity);
            if let Some(greeks) = leg.greeks {
                net_delta += sign * qty * greeks.delta;
                net_gamma += sign * qty * greeks.gamma;
                net_theta += sign * qty * greeks.theta;
                net_vega += sign * qty * greeks.vega;
            }
        }

        let hedge = if net_delta > self.hedge_delta_threshold {
            Some(HedgeSuggestion::AddShortDelta)
        } else if net_delta < -self.hedge_delta_threshold {
            Some(HedgeSuggestion::AddLongDelta)
        } else {
            None
        };

        self.latest = PortfolioContext {
            net_delta,
            net_gamma,
            net_theta,
            net_vega,
            open_legs: legs.len(),
            hedge,
        };
    }

    fn context(&self) -> ModuleContext {
        ModuleContext::PortfolioGreeks(self.latest.clone())
    }

    fn reset(&mut self) {
        self.latest = PortfolioContext::default();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use rust_decimal_macros::dec;
    use strike_core::{GreeksSnapshot, OptionRight, OrderLeg, OrderSide};

    fn leg(side: OrderSide, quantity: u32, delta: f64) -> OrderLeg {
        OrderLeg {
            instrument: "NIFTY24SEP24500CE".to_string(),
            strike: dec!(24500),
            right: OptionRight::Call,
            expiry: NaiveDate::from_ymd_opt(2024, 9, 26).unwrap(),
            side,
            quantity,
            price: dec!(100),
            greeks: Some(GreeksSnapshot {
                delta,
                gamma: 0.001,
                theta: -2.0,
                vega: 10.0,
                rho: 1.0,
                implied_vol: 0.14,
                quality: 90,
            }),
        }
    }

    fn ctx(t: &PortfolioGreeksTracker) -> PortfolioContext {
        match t.context() {
            ModuleContext::PortfolioGreeks(c) => c,
            other => panic!("unexpected context: {other:?}"),
        }
    }

    #[test]
    fn sell_legs_flip_sign() {
        let mut t = PortfolioGreeksTracker::new(100.0);
        t.update(&AnalyticsUpdate::default().with_open_legs(vec![
            leg(OrderSide::Buy, 50, 0.6),
            leg(OrderSide::Sell, 50, 0.4),
        ]));

        let c = ctx(&t);
        // 50*0.6 - 50*0.4
        assert!((c.net_delta - 10.0).abs() < 1e-9);
        assert!(c.hedge.is_none());
    }

    #[test]
    fn long_heavy_book_suggests_short_hedge() {
        let mut t = PortfolioGreeksTracker::new(50.0);
        t.update(&AnalyticsUpdate::default().with_open_legs(vec![leg(OrderSide::Buy, 200, 0.6)]));
        assert_eq!(ctx(&t).hedge, Some(HedgeSuggestion::AddShortDelta));
    }

    #[test]
    fn short_heavy_book_suggests_long_hedge() {
        let mut t = PortfolioGreeksTracker::new(50.0);
        t.update(&AnalyticsUpdate::default().with_open_legs(vec![leg(OrderSide::Sell, 200, 0.6)]));
        assert_eq!(ctx(&t).hedge, Some(HedgeSuggestion::AddLongDelta));
    }

    #[test]
    fn empty_book_clears_exposure() {
        let mut t = PortfolioGreeksTracker::new(50.0);
        t.update(&AnalyticsUpdate::default().with_open_legs(vec![leg(OrderSide::Buy, 200, 0.6)]));
        t.update(&AnalyticsUpdate::default().with_open_legs(vec![]));

        let c = ctx(&t);
        assert!(c.net_delta.abs() < 1e-9);
        assert_eq!(c.open_legs, 0);
    }
}
