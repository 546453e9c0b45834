//! Bounded Newton-Raphson implied-volatility solver.

use strike_core::OptionRight;

use crate::black_scholes::{intrinsic_value, norm_pdf, price, PricingParams};
use crate::{MAX_ITERATIONS, MAX_VOL, MIN_VOL, PRICE_TOLERANCE};

/// Solves for the volatility that reproduces `market_price`.
///
/// The estimate is clamped to `[MIN_VOL, MAX_VOL]` on every step. An option
/// trading at or below intrinsic value has no time value to invert, so the
/// floor vol is returned without iterating. A vanishing vega terminates the
/// loop at the current estimate rather than dividing by it.
#[must_use]
pub fn implied_volatility(
    market_price: f64,
    spot: f64,
    strike: f64,
    t_years: f64,
    rate: f64,
    right: OptionRight,
) -> f64 {
    if t_years <= 0.0 || market_price <= 0.0 || spot <= 0.0 || strike <= 0.0 {
        return MIN_VOL;
    }

    let time_value = market_price - intrinsic_value(spot, strike, right);
    if time_value <= 0.0 {
        return MIN_VOL;
    }

    let mut vol = 0.3;

    for iteration in 0..MAX_ITERATIONS {
        let p = PricingParams::new(spot, strike, t_years, vol, rate);
        let model_price = price(&p, right);
        let diff = model_price - market_price;

        if diff.abs() < PRICE_TOLERANCE {
            return vol;
        }

        // Raw dPrice/dVol, not the per-point vega exposed downstream.
        let sqrt_t = t_years.sqrt();
        let d1 = ((spot / strike).ln() + (rate + 0.5 * vol * vol) * t_years) / (vol * sqrt_t);
        let vega = spot * norm_pdf(d1) * sqrt_t;

        if vega.abs() < 1e-10 {
            tracing::debug!(iteration, vol, "IV solver vega underflow, keeping estimate");
            return vol;
        }

        vol = (vol - diff / vega).clamp(MIN_VOL, MAX_VOL);
    }

    vol
}
