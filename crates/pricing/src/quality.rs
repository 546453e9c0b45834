//! 0-100 trustworthiness score for a Greeks snapshot.
//!
//! Downstream filters only act on Greeks whose score clears the configured
//! bar; a low score means "do not let this snapshot veto a trade".

use crate::black_scholes::PricingParams;

/// Moneyness band considered well-behaved: |ln(S/K)| within 10%.
const MONEYNESS_BAND: f64 = 0.10;
/// DTE sweet spot where Greeks are most informative.
const DTE_SWEET_LOW: f64 = 5.0;
const DTE_SWEET_HIGH: f64 = 30.0;
/// Plausible implied-vol band for an index.
const VOL_PLAUSIBLE_LOW: f64 = 0.05;
const VOL_PLAUSIBLE_HIGH: f64 = 1.5;

/// Rates a Greeks computation from the inputs that produced it.
///
/// Starts at 100 and deducts per condition: far-from-the-money strikes,
/// expiry outside the 5-30 day sweet spot, implausible vol, and gamma/vega
/// too small to be numerically meaningful.
#[must_use]
pub fn quality_score(p: &PricingParams, gamma: f64, vega: f64) -> u8 {
    let mut score: i32 = 100;

    let log_moneyness = (p.spot / p.strike).ln().abs();
    if log_moneyness > MONEYNESS_BAND {
        // Deduct up to 35 the further the strike drifts from spot.
        let excess = ((log_moneyness - MONEYNESS_BAND) / MONEYNESS_BAND).min(1.0);
        score -= (15.0 + 20.0 * excess) as i32;
    }

    let dte = p.t_years * 365.0;
    if dte < DTE_SWEET_LOW {
        score -= 25;
    } else if dte > DTE_SWEET_HIGH {
        score -= 15;
    }

    if !(VOL_PLAUSIBLE_LOW..=VOL_PLAUSIBLE_HIGH).contains(&p.vol) {
        score -= 25;
    }

    // Vanishing curvature or vol sensitivity makes the snapshot numerically
    // fragile regardless of the inputs.
    if gamma.abs() < 1e-6 || vega.abs() < 1e-4 {
        score -= 20;
    }

    score.clamp(0, 100) as u8
}
