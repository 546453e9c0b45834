//! Short strangle in quiet, elevated-IV markets.

use rust_decimal::Decimal;
use strike_analytics::MarketRegime;
use strike_core::{OptionRight, OrderLeg, OrderSide};
use tracing::debug;

use crate::chain_select::{nearest_dte, quote_near_delta};
use crate::gates;
use crate::signal::{RiskClass, SignalAction, SignalEvaluator, SignalInputs, TradeSignal};

/// Delta magnitude sold on each wing.
const SHORT_DELTA_TARGET: f64 = 0.25;
/// IV rank below which selling premium is not worth the tail risk.
const MIN_IV_RANK: f64 = 30.0;

/// Sells an OTM call and put around spot. Unlimited risk, so it runs under
/// the stricter volatility ceiling and only in a ranging regime.
#[derive(Debug, Default)]
pub struct RangeCredit;

impl RangeCredit {
    /// Breach check for an already-open strangle: spot trading through a
    /// short strike demands attention, surfaced as an Adjust signal.
    #[must_use]
    pub fn check_breach(&self, spot: f64, open_legs: &[OrderLeg]) -> Option<TradeSignal> {
        use rust_decimal::prelude::ToPrimitive;
        let breached = open_legs.iter().find(|leg| {
            if leg.side != OrderSide::Sell {
                return false;
            }
            let strike = leg.strike.to_f64().unwrap_or(f64::NAN);
            match leg.right {
                OptionRight::Call => spot > strike,
                OptionRight::Put => spot < strike,
            }
        })?;
        Some(TradeSignal {
            action: SignalAction::Adjust,
            strategy: self.name().to_string(),
            legs: vec![breached.clone()],
            reasoning: format!(
                "spot {spot:.1} through short {} {} strike",
                breached.strike, breached.right
            ),
            confidence: 0.0,
            max_risk: None,
            max_reward: None,
            features: Vec::new(),
        })
    }
}

impl SignalEvaluator for RangeCredit {
    fn name(&self) -> &'static str {
        "range_credit"
    }

    fn risk_class(&self) -> RiskClass {
        RiskClass::Unlimited
    }

    fn generate_signal(&self, inputs: &SignalInputs<'_>) -> TradeSignal {
        let cfg = inputs.config;

        if let Err(reason) = gates::regime_allowed(inputs.analytics, &[MarketRegime::Ranging]) {
            return TradeSignal::hold(self.name(), reason);
        }
        if let Err(reason) = gates::vol_ceiling(inputs.analytics, cfg.unlimited_risk_iv_ceiling) {
            return TradeSignal::hold(self.name(), reason);
        }
        let vol = inputs.analytics.vol_rank();
        if vol.ready && vol.rank < MIN_IV_RANK {
            return TradeSignal::hold(
                self.name(),
                format!("IV rank {:.1} too low to sell premium", vol.rank),
            );
        }
        if let Err(reason) = gates::dte_floor(nearest_dte(inputs.chain, inputs.timestamp), cfg.min_dte)
        {
            return TradeSignal::hold(self.name(), reason);
        }
        if let Err(reason) = gates::quiet_market(inputs.indicators, cfg.momentum_threshold_pct) {
            return TradeSignal::hold(self.name(), reason);
        }
        if let Err(reason) = gates::confirmation_depth(inputs.indicators, cfg.confirmation_candles)
        {
            return TradeSignal::hold(self.name(), reason);
        }

        let Some(call) = quote_near_delta(
            inputs.chain,
            OptionRight::Call,
            SHORT_DELTA_TARGET,
            cfg.min_greeks_quality,
        ) else {
            return TradeSignal::hold(self.name(), "no qualified short call in chain");
        };
        let Some(put) = quote_near_delta(
            inputs.chain,
            OptionRight::Put,
            SHORT_DELTA_TARGET,
            cfg.min_greeks_quality,
        ) else {
            return TradeSignal::hold(self.name(), "no qualified short put in chain");
        };

        let legs = vec![
            sell_leg(call, inputs.lot_size),
            sell_leg(put, inputs.lot_size),
        ];

        let net_delta: f64 = legs.iter().map(OrderLeg::signed_delta).sum();
        let per_lot_delta = net_delta / f64::from(inputs.lot_size);
        if let Err(reason) = gates::delta_neutral(per_lot_delta, cfg.credit_delta_band) {
            return TradeSignal::hold(self.name(), reason);
        }

        let credit = call.last_price + put.last_price;
        if let Err(reason) = gates::premium_floor(credit, cfg.min_credit, "credit") {
            return TradeSignal::hold(self.name(), reason);
        }

        debug!(
            call_strike = %call.strike,
            put_strike = %put.strike,
            credit = %credit,
            net_delta = per_lot_delta,
            "range_credit strangle qualified"
        );

        TradeSignal {
            action: SignalAction::Enter,
            strategy: self.name().to_string(),
            legs,
            reasoning: format!(
                "ranging regime, IV rank {:.1}; sold {}/{} strangle for {credit} credit",
                vol.rank, put.strike, call.strike,
            ),
            confidence: 0.55,
            max_risk: None,
            max_reward: Some(credit * Decimal::from(inputs.lot_size)),
            features: inputs.feature_vector(),
        }
    }
}

fn sell_leg(quote: &strike_core::OptionQuote, lot_size: u32) -> OrderLeg {
    OrderLeg {
        instrument: quote.instrument.clone(),
        strike: quote.strike,
        right: quote.right,
        expiry: quote.expiry,
        side: OrderSide::Sell,
        quantity: lot_size,
        price: quote.last_price,
        greeks: quote.greeks,
    }
}
