//! Signal contract shared by every evaluator.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strike_analytics::AnalyticsSnapshot;
use strike_core::{OptionQuote, OrderLeg, StrategyConfig};
use strike_indicators::IndicatorView;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignalAction {
    Enter,
    Hold,
    /// An open structure needs attention (e.g. a breached short strike).
    Adjust,
}

/// Output of one evaluation pass.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeSignal {
    pub action: SignalAction,
    pub strategy: String,
    pub legs: Vec<OrderLeg>,
    pub reasoning: String,
    /// 0.0-1.0, already adjusted by the confidence model when available.
    pub confidence: f64,
    /// `None` means unlimited.
    pub max_risk: Option<Decimal>,
    pub max_reward: Option<Decimal>,
    /// Feature vector captured for the offline trainer.
    pub features: Vec<f64>,
}

impl TradeSignal {
    #[must_use]
    pub fn hold(strategy: &str, reason: impl Into<String>) -> Self {
        Self {
            action: SignalAction::Hold,
            strategy: strategy.to_string(),
            legs: Vec::new(),
            reasoning: reason.into(),
            confidence: 0.0,
            max_risk: None,
            max_reward: None,
            features: Vec::new(),
        }
    }

    #[must_use]
    pub const fn is_enter(&self) -> bool {
        matches!(self.action, SignalAction::Enter)
    }
}

/// Whether the worst case of a structure is bounded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RiskClass {
    Defined,
    Unlimited,
}

/// Everything an evaluator may consult. Explicit context object; evaluators
/// hold no ambient market state of their own.
pub struct SignalInputs<'a> {
    pub timestamp: DateTime<Utc>,
    pub spot: f64,
    pub chain: &'a [OptionQuote],
    pub indicators: &'a IndicatorView,
    pub analytics: &'a AnalyticsSnapshot,
    pub config: &'a StrategyConfig,
    pub lot_size: u32,
}

impl SignalInputs<'_> {
    /// Feature vector captured at entry for the confidence-model trainer.
    /// Additive-only: append new features, never reorder.
    #[must_use]
    pub fn feature_vector(&self) -> Vec<f64> {
        let regime = self.analytics.regime();
        let vol = self.analytics.vol_rank();
        let oi = self.analytics.oi_flow();
        let breadth = self.analytics.breadth();
        vec![
            self.indicators.trend_strength_pct,
            self.indicators.momentum_pct,
            self.indicators.band_width_pct,
            regime.range_pct,
            vol.rank,
            vol.percentile,
            oi.pcr.unwrap_or(1.0),
            breadth.breadth_ratio,
        ]
    }
}

/// Uniform evaluator contract.
pub trait SignalEvaluator: Send {
    fn name(&self) -> &'static str;

    fn risk_class(&self) -> RiskClass;

    /// Gates strategy conditions against the inputs. Never fails; a blocked
    /// entry is a Hold with the failed gate as reasoning.
    fn generate_signal(&self, inputs: &SignalInputs<'_>) -> TradeSignal;
}
