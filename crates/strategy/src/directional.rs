//! Long ATM debit in a trending market.

use rust_decimal::Decimal;
use strike_analytics::MarketRegime;
use strike_core::{OptionQuote, OptionRight, OrderLeg, OrderSide};
use tracing::debug;

use crate::chain_select::{atm_strike, nearest_dte, quote_at};
use crate::gates;
use crate::signal::{RiskClass, SignalAction, SignalEvaluator, SignalInputs, TradeSignal};

/// Buys the ATM call (uptrend) or put (downtrend). Risk is defined: the
/// worst case is the premium paid.
#[derive(Debug)]
pub struct DirectionalDebit {
    strike_step: Decimal,
}

impl DirectionalDebit {
    #[must_use]
    pub const fn new(strike_step: Decimal) -> Self {
        Self { strike_step }
    }
}

impl SignalEvaluator for DirectionalDebit {
    fn name(&self) -> &'static str {
        "directional_debit"
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::Defined
    }

    fn generate_signal(&self, inputs: &SignalInputs<'_>) -> TradeSignal {
        let cfg = inputs.config;

        if let Err(reason) = gates::regime_allowed(inputs.analytics, &[MarketRegime::Trending]) {
            return TradeSignal::hold(self.name(), reason);
        }
        if let Err(reason) = gates::vol_ceiling(inputs.analytics, cfg.defined_risk_iv_ceiling) {
            return TradeSignal::hold(self.name(), reason);
        }
        if let Err(reason) = gates::dte_floor(nearest_dte(inputs.chain, inputs.timestamp), cfg.min_dte)
        {
            return TradeSignal::hold(self.name(), reason);
        }

        let direction = inputs.indicators.trend_direction;
        if direction == 0.0 {
            return TradeSignal::hold(self.name(), "no resolved trend direction");
        }
        if let Err(reason) =
            gates::momentum_confluence(inputs.indicators, cfg.momentum_threshold_pct, direction)
        {
            return TradeSignal::hold(self.name(), reason);
        }
        if let Err(reason) = gates::confirmation_depth(inputs.indicators, cfg.confirmation_candles)
        {
            return TradeSignal::hold(self.name(), reason);
        }

        let right = if direction > 0.0 {
            OptionRight::Call
        } else {
            OptionRight::Put
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
        if let Some(greeks) = quote.greeks {
            if greeks.quality >= cfg.min_greeks_quality && greeks.delta.abs() < 0.35 {
                return TradeSignal::hold(
                    self.name(),
                    format!("ATM delta {:.2} too shallow for a debit entry", greeks.delta),
                );
            }
        }

        let premium = quote.last_price * Decimal::from(inputs.lot_size);
        debug!(
            %strike,
            right = %right,
            premium = %premium,
            momentum = inputs.indicators.momentum_pct,
            "directional_debit entry qualified"
        );

        TradeSignal {
            action: SignalAction::Enter,
            strategy: self.name().to_string(),
            legs: vec![buy_leg(quote, inputs.lot_size)],
            reasoning: format!(
                "trending {} with momentum {:.2}%; long ATM {strike} {right}",
                if direction > 0.0 { "up" } else { "down" },
                inputs.indicators.momentum_pct,
            ),
            confidence: 0.6,
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
