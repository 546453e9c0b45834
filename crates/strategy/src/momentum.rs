//! Range-break entries with multi-candle confirmation.

use rust_decimal::Decimal;
use strike_analytics::MarketRegime;
use strike_core::{OptionQuote, OptionRight, OrderLeg, OrderSide};
use tracing::debug;

use crate::chain_select::{atm_strike, nearest_dte, quote_at};
use crate::gates;
use crate::signal::{RiskClass, SignalAction, SignalEvaluator, SignalInputs, TradeSignal};

/// Buys the ATM option in the break direction once the last N closed candles
/// all settle beyond the prior window's extreme. Defined risk (long premium).
#[derive(Debug)]
pub struct MomentumBreakout {
    strike_step: Decimal,
}

enum Break {
    Up,
    Down,
}

impl MomentumBreakout {
    #[must_use]
    pub const fn new(strike_step: Decimal) -> Self {
        Self { strike_step }
    }

    /// Break direction confirmed by the last `confirm` closes, or `None`.
    ///
    /// The reference range is every candle in the window *before* the
    /// confirmation candles, so the breakout bar itself never widens the
    /// range it must clear.
    fn confirmed_break(view: &strike_indicators::IndicatorView, confirm: usize) -> Option<Break> {
        let closes = &view.recent_closes;
        if confirm == 0 || closes.len() < confirm + 2 {
            return None;
        }
        let split = closes.len() - confirm;
        let prior_high = view.recent_highs[..split]
            .iter()
            .copied()
            .fold(f64::MIN, f64::max);
        let prior_low = view.recent_lows[..split]
            .iter()
            .copied()
            .fold(f64::MAX, f64::min);
        let confirming = &closes[split..];

        if confirming.iter().all(|&c| c > prior_high) {
            Some(Break::Up)
        } else if confirming.iter().all(|&c| c < prior_low) {
            Some(Break::Down)
        } else {
            None
        }
    }
}

impl SignalEvaluator for MomentumBreakout {
    fn name(&self) -> &'static str {
        "momentum_breakout"
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::Defined
    }

    fn generate_signal(&self, inputs: &SignalInputs<'_>) -> TradeSignal {
        let cfg = inputs.config;

        // A break can fire from a ranging market; only the volatility
        // override blocks it.
        if let Err(reason) = gates::regime_allowed(
            inputs.analytics,
            &[MarketRegime::Ranging, MarketRegime::Trending],
        ) {
            return TradeSignal::hold(self.name(), reason);
        }
        if let Err(reason) = gates::vol_ceiling(inputs.analytics, cfg.defined_risk_iv_ceiling) {
            return TradeSignal::hold(self.name(), reason);
        }
        if let Err(reason) = gates::dte_floor(nearest_dte(inputs.chain, inputs.timestamp), cfg.min_dte)
        {
            return TradeSignal::hold(self.name(), reason);
        }
        if let Err(reason) = gates::confirmation_depth(
            inputs.indicators,
            cfg.confirmation_candles + 2,
        ) {
            return TradeSignal::hold(self.name(), reason);
        }

        let Some(direction) = Self::confirmed_break(inputs.indicators, cfg.confirmation_candles)
        else {
            return TradeSignal::hold(self.name(), "no confirmed range break");
        };
        let bias = match direction {
            Break::Up => 1.0,
            Break::Down => -1.0,
        };
        if let Err(reason) =
            gates::momentum_confluence(inputs.indicators, cfg.momentum_threshold_pct, bias)
        {
            return TradeSignal::hold(self.name(), reason);
        }

        let right = match direction {
            Break::Up => OptionRight::Call,
            Break::Down => OptionRight::Put,
        };
        let strike = atm_strike(inputs.spot, self.strike_step);
        let Some(quote) = quote_at(inputs.chain, strike, right) else {
            return TradeSignal::hold(
                self.name(),
                format!("ATM {strike} {right} not present in chain"),
            );
        };
        if let Err(reason) = gates::premium_floor(quote.last_price, cfg.min_premium, "premium") {
            return TradeSignal::hold(self.name(), reason);
        }

        let premium = quote.last_price * Decimal::from(inputs.lot_size);
        debug!(
            %strike,
            right = %right,
            confirm = cfg.confirmation_candles,
            "momentum_breakout entry qualified"
        );

        TradeSignal {
            action: SignalAction::Enter,
            strategy: self.name().to_string(),
            legs: vec![buy_leg(quote, inputs.lot_size)],
            reasoning: format!(
                "{}-side range break held for {} candles; long ATM {strike} {right}",
                match direction {
                    Break::Up => "up",
                    Break::Down => "down",
                },
                cfg.confirmation_candles,
            ),
            confidence: 0.5,
            max_risk: Some(premium),
            max_reward: None,
            features: inputs.feature_vector(),
        }
    }
}

fn buy_leg(quote: &OptionQuote, lot_size: u32) -> OrderLeg {
    OrderLeg {
        instrument: quote.instrument.clone(),
        strike: quote.strike,
        right: quote.right,
        expiry: quote.expiry,
        side: OrderSide::Buy,
        quantity: lot_size,
        price: quote.last_price,
        greeks: quote.greeks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::SignalInputs;
    use chrono::{Duration, Utc};
    use rust_decimal_macros::dec;
    use strike_analytics::AnalyticsSnapshot;
    use strike_core::{AppConfig, GreeksSnapshot};
    use strike_indicators::IndicatorView;

    fn quote(strike: Decimal, right: OptionRight) -> OptionQuote {
        OptionQuote {
            instrument: format!("NIFTY-{strike}-{right}"),
            strike,
            right,
            expiry: (Utc::now() + Duration::days(7)).date_naive(),
            last_price: dec!(150),
            open_interest: dec!(3000),
            volume: dec!(0),
            bid_price: None,
            bid_qty: None,
            ask_price: None,
            ask_qty: None,
            greeks: Some(GreeksSnapshot {
                delta: 0.5,
                quality: 90,
                ..GreeksSnapshot::zero()
            }),
            updated_at: Utc::now(),
        }
    }

    /// Ten flat candles around 24_450 then `confirm` closes above the range.
    fn breakout_view(confirm: usize) -> IndicatorView {
        let mut view = IndicatorView::empty();
        for _ in 0..10 {
            view.recent_closes.push(24_450.0);
            view.recent_highs.push(24_470.0);
            view.recent_lows.push(24_430.0);
        }
        for i in 0..confirm {
            let close = 24_500.0 + i as f64 * 10.0;
            view.recent_closes.push(close);
            view.recent_highs.push(close + 15.0);
            view.recent_lows.push(close - 15.0);
        }
        view.candle_count = view.recent_closes.len();
        view.momentum_pct = 0.4;
        view.last_close = view.recent_closes.last().copied();
        view
    }

    fn inputs_with<'a>(
        chain: &'a [OptionQuote],
        view: &'a IndicatorView,
        snap: &'a AnalyticsSnapshot,
        cfg: &'a strike_core::StrategyConfig,
    ) -> SignalInputs<'a> {
        SignalInputs {
            timestamp: Utc::now(),
            spot: 24_520.0,
            chain,
            indicators: view,
            analytics: snap,
            config: cfg,
            lot_size: 25,
        }
    }

    #[test]
    fn confirmed_upside_break_buys_call() {
        let cfg = AppConfig::default().strategy;
        let chain = vec![quote(dec!(24500), OptionRight::Call)];
        let view = breakout_view(cfg.confirmation_candles);
        let snap = AnalyticsSnapshot::default();
        let signal = MomentumBreakout::new(dec!(50))
            .generate_signal(&inputs_with(&chain, &view, &snap, &cfg));
        assert_eq!(signal.action, SignalAction::Enter, "{}", signal.reasoning);
        assert_eq!(signal.legs[0].right, OptionRight::Call);
        assert_eq!(signal.max_risk, Some(dec!(150) * Decimal::from(25)));
    }

    #[test]
    fn unconfirmed_break_holds() {
        let cfg = AppConfig::default().strategy;
        let chain = vec![quote(dec!(24500), OptionRight::Call)];
        // Last close back inside the range: confirmation fails.
        let mut view = breakout_view(cfg.confirmation_candles);
        let n = view.recent_closes.len();
        view.recent_closes[n - 1] = 24_455.0;
        let snap = AnalyticsSnapshot::default();
        let signal = MomentumBreakout::new(dec!(50))
            .generate_signal(&inputs_with(&chain, &view, &snap, &cfg));
        assert_eq!(signal.action, SignalAction::Hold);
        assert!(signal.reasoning.contains("range break"));
    }

    #[test]
    fn downside_break_buys_put() {
        let cfg = AppConfig::default().strategy;
        let chain = vec![quote(dec!(24500), OptionRight::Put)];
        let mut view = breakout_view(0);
        for i in 0..cfg.confirmation_candles {
            let close = 24_400.0 - i as f64 * 10.0;
            view.recent_closes.push(close);
            view.recent_highs.push(close + 15.0);
            view.recent_lows.push(close - 15.0);
        }
        view.candle_count = view.recent_closes.len();
        view.momentum_pct = -0.4;
        let snap = AnalyticsSnapshot::default();
        let signal = MomentumBreakout::new(dec!(50))
            .generate_signal(&inputs_with(&chain, &view, &snap, &cfg));
        assert_eq!(signal.action, SignalAction::Enter, "{}", signal.reasoning);
        assert_eq!(signal.legs[0].right, OptionRight::Put);
    }

    #[test]
    fn too_few_candles_holds() {
        let cfg = AppConfig::default().strategy;
        let chain = vec![quote(dec!(24500), OptionRight::Call)];
        let mut view = IndicatorView::empty();
        view.recent_closes = vec![24_450.0, 24_500.0];
        view.candle_count = 2;
        let snap = AnalyticsSnapshot::default();
        let signal = MomentumBreakout::new(dec!(50))
            .generate_signal(&inputs_with(&chain, &view, &snap, &cfg));
        assert_eq!(signal.action, SignalAction::Hold);
    }
}
