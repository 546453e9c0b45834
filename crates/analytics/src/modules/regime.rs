//! Trend/volatility regime classifier.

use crate::context::{MarketRegime, ModuleContext, RegimeContext};
use crate::registry::AnalyticsModule;
use crate::update::{keys, AnalyticsUpdate};

/// Classifies the market into RANGING / TRENDING / HIGH_VOLATILITY from
/// trend-strength, band-width percent, and candle-range percent.
///
/// The volatility check runs first and overrides the others: a violently
/// moving market is HIGH_VOLATILITY even when it is also trending.
pub struct RegimeClassifier {
    trend_threshold_pct: f64,
    band_width_threshold_pct: f64,
    range_threshold_pct: f64,
    latest: RegimeContext,
}

impl RegimeClassifier {
    #[must_use]
    pub fn new(
        trend_threshold_pct: f64,
        band_width_threshold_pct: f64,
        range_threshold_pct: f64,
    ) -> Self {
        Self {
            trend_threshold_pct,
            band_width_threshold_pct,
            range_threshold_pct,
            latest: RegimeContext::default(),
        }
    }

    fn classify(&self, trend: f64, band_width: f64, range: f64) -> (MarketRegime, bool) {
        if range > self.range_threshold_pct || band_width > self.band_width_threshold_pct {
            return (MarketRegime::HighVolatility, true);
        }
        if trend > self.trend_threshold_pct {
            return (MarketRegime::Trending, false);
        }
        (MarketRegime::Ranging, false)
    }
}

impl Default for RegimeClassifier {
    fn default() -> Self {
        Self::new(0.25, 2.5, 0.6)
    }
}

impl AnalyticsModule for RegimeClassifier {
    fn name(&self) -> &str {
        "regime"
    }

    fn update(&mut self, update: &AnalyticsUpdate) {
        let Some(trend) = update.scalar(keys::TREND_STRENGTH_PCT) else {
            return;
        };
        let band_width = update.scalar(keys::BAND_WIDTH_PCT).unwrap_or(0.0);
        let range = update.scalar(keys::RANGE_PCT).unwrap_or(0.0);

        let (regime, volatility_override) = self.classify(trend, band_width, range);
        self.latest = RegimeContext {
            regime,
            trend_strength_pct: trend,
            band_width_pct: band_width,
            range_pct: range,
            volatility_override,
            ready: true,
        };
    }

    fn context(&self) -> ModuleContext {
        ModuleContext::Regime(self.latest.clone())
    }

    fn reset(&mut self) {
        self.latest = RegimeContext::default();
    }
}
