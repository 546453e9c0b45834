//! Strike and quote selection helpers over the tracked chain.

use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use strike_core::{OptionQuote, OptionRight};

/// Nearest strike on the grid to `spot`.
#[must_use]
pub fn atm_strike(spot: f64, step: Decimal) -> Decimal {
    use rust_decimal::prelude::ToPrimitive;
    let step_f = step.to_f64().unwrap_or(50.0);
    let rounded = (spot / step_f).round() * step_f;
    Decimal::from_f64(rounded).unwrap_or_else(|| Decimal::from(0))
}

/// Quote at an exact strike/right, if the chain carries it.
#[must_use]
pub fn quote_at(chain: &[OptionQuote], strike: Decimal, right: OptionRight) -> Option<&OptionQuote> {
    chain
        .iter()
        .find(|q| q.strike == strike && q.right == right)
}

/// Quote whose delta magnitude is closest to `target`, among quotes with
/// trustworthy Greeks. Falls back to `None` when nothing qualifies.
#[must_use]
pub fn quote_near_delta(
    chain: &[OptionQuote],
    right: OptionRight,
    target: f64,
    min_quality: u8,
) -> Option<&OptionQuote> {
    chain
        .iter()
        .filter(|q| q.right == right)
        .filter_map(|q| {
            let greeks = q.greeks?;
            if greeks.quality < min_quality {
                return None;
            }
            Some((q, (greeks.delta.abs() - target).abs()))
        })
        .min_by(|a, b| a.1.total_cmp(&b.1))
        .map(|(q, _)| q)
}

/// Smallest days-to-expiry present in the chain.
#[must_use]
pub fn nearest_dte(chain: &[OptionQuote], now: chrono::DateTime<chrono::Utc>) -> Option<i64> {
    chain.iter().map(|q| q.days_to_expiry(now)).min()
}
