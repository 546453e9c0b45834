//! Typed per-module contexts and the merged snapshot.
//!
//! Every context carries defined neutral defaults so a cold module still
//! answers queries; `ready` distinguishes warmed-up data from defaults.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Classified market state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MarketRegime {
    Ranging,
    Trending,
    HighVolatility,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegimeContext {
    pub regime: MarketRegime,
    pub trend_strength_pct: f64,
    pub band_width_pct: f64,
    pub range_pct: f64,
    /// True when the volatility override forced the classification.
    pub volatility_override: bool,
    pub ready: bool,
}

impl Default for RegimeContext {
    fn default() -> Self {
        Self {
            regime: MarketRegime::Ranging,
            trend_strength_pct: 0.0,
            band_width_pct: 0.0,
            range_pct: 0.0,
            volatility_override: false,
            ready: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VolRankContext {
    pub current_iv: f64,
    /// Position of current IV within the historical [min, max], scaled to
    /// 100. Exceeds [0, 100] when current IV is outside history.
    pub rank: f64,
    /// Fraction of history strictly below current IV, in [0, 100].
    pub percentile: f64,
    pub samples: usize,
    pub ready: bool,
}

impl Default for VolRankContext {
    fn default() -> Self {
        Self {
            current_iv: 0.0,
            rank: 50.0,
            percentile: 50.0,
            samples: 0,
            ready: false,
        }
    }
}

/// Canonical price-direction x OI-direction classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BuildupRegime {
    LongBuildup,
    ShortBuildup,
    ShortCovering,
    LongUnwinding,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OiFlowContext {
    pub buildup: Option<BuildupRegime>,
    pub max_pain: Option<Decimal>,
    /// Put/call open-interest ratio.
    pub pcr: Option<f64>,
    pub total_call_oi: Decimal,
    pub total_put_oi: Decimal,
    pub ready: bool,
}

impl Default for OiFlowContext {
    fn default() -> Self {
        Self {
            buildup: None,
            max_pain: None,
            pcr: None,
            total_call_oi: Decimal::ZERO,
            total_put_oi: Decimal::ZERO,
            ready: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LiquidityLabel {
    Tight,
    Normal,
    Wide,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImbalanceContext {
    /// bid quantity / ask quantity; 1.0 is balanced.
    pub bid_ask_ratio: f64,
    pub spread_pct: f64,
    pub liquidity: LiquidityLabel,
    pub ready: bool,
}

impl Default for ImbalanceContext {
    fn default() -> Self {
        Self {
            bid_ask_ratio: 1.0,
            spread_pct: 0.0,
            liquidity: LiquidityLabel::Normal,
            ready: false,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct BreadthContext {
    pub advancing: usize,
    pub declining: usize,
    pub unchanged: usize,
    /// advancing / (advancing + declining); 0.5 when undefined.
    pub breadth_ratio: f64,
    pub ready: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HedgeSuggestion {
    /// Net delta too long; add short exposure.
    AddShortDelta,
    /// Net delta too short; add long exposure.
    AddLongDelta,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PortfolioContext {
    pub net_delta: f64,
    pub net_gamma: f64,
    pub net_theta: f64,
    pub net_vega: f64,
    pub open_legs: usize,
    pub hedge: Option<HedgeSuggestion>,
}

/// Tagged union of everything a module can publish.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "module", rename_all = "snake_case")]
pub enum ModuleContext {
    Regime(RegimeContext),
    VolRank(VolRankContext),
    OiFlow(OiFlowContext),
    Imbalance(ImbalanceContext),
    Breadth(BreadthContext),
    PortfolioGreeks(PortfolioContext),
}

/// Merged module-name -> context mapping.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsSnapshot {
    pub contexts: HashMap<String, ModuleContext>,
}

impl AnalyticsSnapshot {
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ModuleContext> {
        self.contexts.get(name)
    }

    /// Regime context, falling back to neutral defaults when the module is
    /// absent or disabled.
    #[must_use]
    pub fn regime(&self) -> RegimeContext {
        match self.contexts.get("regime") {
            Some(ModuleContext::Regime(ctx)) => ctx.clone(),
            _ => RegimeContext::default(),
        }
    }

    #[must_use]
    pub fn vol_rank(&self) -> VolRankContext {
        match self.contexts.get("vol_rank") {
            Some(ModuleContext::VolRank(ctx)) => ctx.clone(),
            _ => VolRankContext::default(),
        }
    }

    #[must_use]
    pub fn oi_flow(&self) -> OiFlowContext {
        match self.contexts.get("oi_flow") {
            Some(ModuleContext::OiFlow(ctx)) => ctx.clone(),
            _ => OiFlowContext::default(),
        }
    }

    #[must_use]
    pub fn imbalance(&self) -> ImbalanceContext {
        match self.contexts.get("imbalance") {
            Some(ModuleContext::Imbalance(ctx)) => ctx.clone(),
            _ => ImbalanceContext::default(),
        }
    }

    #[must_use]
    pub fn breadth(&self) -> BreadthContext {
        match self.contexts.get("breadth") {
            Some(ModuleContext::Breadth(ctx)) => ctx.clone(),
            _ => BreadthContext::default(),
        }
    }

    #[must_use]
    pub fn portfolio(&self) -> PortfolioContext {
        match self.contexts.get("portfolio_greeks") {
            Some(ModuleContext::PortfolioGreeks(ctx)) => ctx.clone(),
            _ => PortfolioContext::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn snapshot_falls_back_to_neutral_defaults() {
        let snapshot = AnalyticsSnapshot::default();

        let regime = snapshot.regime();
        assert_eq!(regime.regime, MarketRegime::Ranging);
        assert!(!regime.ready);

        let vol = snapshot.vol_rank();
        assert!((vol.rank - 50.0).abs() < f64::EPSILON);
        assert!(!vol.ready);

        assert!(snapshot.oi_flow().buildup.is_none());
        assert!(snapshot.portfolio().hedge.is_none());
    }

    #[test]
    fn module_context_serializes_with_tag() {
        let ctx = ModuleContext::Regime(RegimeContext::default());
        let json = serde_json::to_string(&ctx).unwrap();
        assert!(json.contains("\"module\":\"regime\""));
    }
}
