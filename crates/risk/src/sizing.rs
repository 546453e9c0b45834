//! Fixed-fractional position sizing.

use anyhow::Result;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;

/// Lots to trade so that hitting the stop loses at most
/// `risk_per_trade_pct` of the balance.
///
/// `quantity = (balance * risk_pct) / (entry * stop_pct)`, floored at one
/// lot and capped at `max_quantity`.
///
/// # Errors
/// Fails on a non-positive entry price or stop fraction.
pub fn position_size(
    entry_price: Decimal,
    stop_loss_pct: f64,
    account_balance: Decimal,
    risk_per_trade_pct: f64,
    max_quantity: u32,
) -> Result<u32> {
    if entry_price <= Decimal::ZERO {
        anyhow::bail!("entry price must be positive, got {entry_price}");
    }
    if stop_loss_pct <= 0.0 {
        anyhow::bail!("stop-loss fraction must be positive, got {stop_loss_pct}");
    }

    let risk_pct = Decimal::from_f64(risk_per_trade_pct)
        .ok_or_else(|| anyhow::anyhow!("invalid risk fraction {risk_per_trade_pct}"))?;
    let stop_pct = Decimal::from_f64(stop_loss_pct)
        .ok_or_else(|| anyhow::anyhow!("invalid stop fraction {stop_loss_pct}"))?;

    let risk_budget = account_balance * risk_pct;
    let loss_per_unit = entry_price * stop_pct;
    let raw = (risk_budget / loss_per_unit).floor();

    let quantity = raw.to_u32().unwrap_or(u32::MAX).clamp(1, max_quantity);
    Ok(quantity)
}
