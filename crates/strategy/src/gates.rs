//! Shared confluence gates.
//!
//! Every gate answers `Ok(())` or the reason it blocked; evaluators run them
//! in the fixed order session -> regime/vol ceiling -> DTE -> technicals ->
//! premium and stop at the first failure.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::Decimal;
use strike_analytics::{AnalyticsSnapshot, MarketRegime};
use strike_core::SessionConfig;
use strike_indicators::IndicatorView;

pub type GateResult = Result<(), String>;

/// Inside the session window and before the entry cutoff, in market time.
pub fn session_window(now: DateTime<Utc>, session: &SessionConfig) -> GateResult {
    let tz: Tz = session
        .timezone
        .parse()
        .unwrap_or(chrono_tz::Asia::Kolkata);
    let local = now.with_timezone(&tz).time();

    if local < session.open || local >= session.close {
        return Err(format!("outside session window ({local})"));
    }
    if local >= session.entry_cutoff {
        return Err(format!("past entry cutoff ({local})"));
    }
    Ok(())
}

/// Regime must be one of `allowed`; the volatility override blocks everything.
pub fn regime_allowed(analytics: &AnalyticsSnapshot, allowed: &[MarketRegime]) -> GateResult {
    let regime = analytics.regime();
    if regime.regime == MarketRegime::HighVolatility {
        return Err("high-volatility regime".to_string());
    }
    if !allowed.contains(&regime.regime) {
        return Err(format!("regime {:?} not tradeable for this strategy", regime.regime));
    }
    Ok(())
}

/// IV rank at or below the strategy's ceiling. Unlimited-risk strategies pass
/// a stricter ceiling than defined-risk ones.
pub fn vol_ceiling(analytics: &AnalyticsSnapshot, ceiling: f64) -> GateResult {
    let vol = analytics.vol_rank();
    if vol.ready && vol.rank > ceiling {
        return Err(format!("IV rank {:.1} above ceiling {ceiling:.1}", vol.rank));
    }
    Ok(())
}

/// At least `min_dte` days to the nearest expiry in the chain.
pub fn dte_floor(nearest_dte: Option<i64>, min_dte: i64) -> GateResult {
    match nearest_dte {
        None => Err("no expiry information in chain".to_string()),
        Some(dte) if dte < min_dte => Err(format!("{dte} DTE below floor {min_dte}")),
        Some(_) => Ok(()),
    }
}

/// Momentum magnitude at or above the threshold, in the required direction
/// (`direction` > 0 up, < 0 down, 0 = either).
pub fn momentum_confluence(
    indicators: &IndicatorView,
    threshold_pct: f64,
    direction: f64,
) -> GateResult {
    let momentum = indicators.momentum_pct;
    if momentum.abs() < threshold_pct {
        return Err(format!(
            "momentum {momentum:.2}% below threshold {threshold_pct:.2}%"
        ));
    }
    if direction > 0.0 && momentum <= 0.0 {
        return Err("momentum against long bias".to_string());
    }
    if direction < 0.0 && momentum >= 0.0 {
        return Err("momentum against short bias".to_string());
    }
    Ok(())
}

/// Momentum magnitude *below* the threshold: the quiet-market confluence for
/// range strategies.
pub fn quiet_market(indicators: &IndicatorView, threshold_pct: f64) -> GateResult {
    if indicators.momentum_pct.abs() >= threshold_pct {
        return Err(format!(
            "momentum {:.2}% too strong for a range strategy",
            indicators.momentum_pct
        ));
    }
    Ok(())
}

/// Enough closed candles for multi-candle confirmation.
pub fn confirmation_depth(indicators: &IndicatorView, required: usize) -> GateResult {
    if indicators.candle_count < required {
        return Err(format!(
            "{} candles closed, {required} required for confirmation",
            indicators.candle_count
        ));
    }
    Ok(())
}

/// Premium (debit) or credit clears the configured sanity floor.
pub fn premium_floor(total: Decimal, floor: Decimal, kind: &str) -> GateResult {
    if total < floor {
        return Err(format!("{kind} {total} below floor {floor}"));
    }
    Ok(())
}

/// Net leg delta within the neutrality band required of credit structures.
pub fn delta_neutral(net_delta: f64, band: f64) -> GateResult {
    if net_delta.abs() > band {
        return Err(format!(
            "net delta {net_delta:.3} outside neutral band +/-{band:.3}"
        ));
    }
    Ok(())
}
