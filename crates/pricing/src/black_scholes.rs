//! Closed-form price and sensitivities.
//!
//! Degenerate inputs (`t <= 0`, `vol <= 0`) resolve locally to intrinsic
//! value and all-zero Greeks; nothing here returns an error.

use std::f64::consts::PI;
use strike_core::{GreeksSnapshot, OptionRight};

use crate::quality::quality_score;

/// Inputs shared by price and Greeks.
#[derive(Debug, Clone, Copy)]
pub struct PricingParams {
    pub spot: f64,
    pub strike: f64,
    /// Time to expiry in years.
    pub t_years: f64,
    pub vol: f64,
    /// Flat annualized risk-free rate.
    pub rate: f64,
}

impl PricingParams {
    #[must_use]
    pub const fn new(spot: f64, strike: f64, t_years: f64, vol: f64, rate: f64) -> Self {
        Self {
            spot,
            strike,
            t_years,
            vol,
            rate,
        }
    }

    fn is_degenerate(&self) -> bool {
        self.t_years <= 0.0 || self.vol <= 0.0 || self.spot <= 0.0 || self.strike <= 0.0
    }
}

#[must_use]
pub fn norm_pdf(x: f64) -> f64 {
    (1.0 / (2.0 * PI).sqrt()) * (-0.5 * x * x).exp()
}

/// Abramowitz-Stegun polynomial approximation of the standard normal CDF.
#[must_use]
pub fn norm_cdf(x: f64) -> f64 {
    let k = 1.0 / (1.0 + 0.2316419 * x.abs());
    let poly = k
        * (0.319_381_530
            + k * (-0.356_563_782
                + k * (1.781_477_937 + k * (-1.821_255_978 + k * 1.330_274_429))));

    let approx = 1.0 - norm_pdf(x) * poly;

    if x >= 0.0 {
        approx
    } else {
        1.0 - approx
    }
}

fn d1_d2(p: &PricingParams) -> (f64, f64) {
    let sqrt_t = p.t_years.sqrt();
    let d1 = ((p.spot / p.strike).ln() + (p.rate + 0.5 * p.vol * p.vol) * p.t_years)
        / (p.vol * sqrt_t);
    let d2 = d1 - p.vol * sqrt_t;
    (d1, d2)
}

/// Option payoff if exercised now.
#[must_use]
pub fn intrinsic_value(spot: f64, strike: f64, right: OptionRight) -> f64 {
    match right {
        OptionRight::Call => (spot - strike).max(0.0),
        OptionRight::Put => (strike - spot).max(0.0),
    }
}

/// Black-Scholes price; intrinsic value for degenerate inputs.
#[must_use]
pub fn price(p: &PricingParams, right: OptionRight) -> f64 {
    if p.is_degenerate() {
        return intrinsic_value(p.spot, p.strike, right);
    }

    let (d1, d2) = d1_d2(p);
    let discount = (-p.rate * p.t_years).exp();

    let value = match right {
        OptionRight::Call => p.spot * norm_cdf(d1) - p.strike * discount * norm_cdf(d2),
        OptionRight::Put => p.strike * discount * norm_cdf(-d2) - p.spot * norm_cdf(-d1),
    };

    value.max(0.0)
}

/// Full Greeks snapshot; all zeros for degenerate inputs.
///
/// Theta is per calendar day, vega per volatility point. Call delta lands in
/// `[0, 1]`, put delta in `[-1, 0]`; gamma and vega are identical for the two
/// rights at the same strike.
#[must_use]
pub fn greeks(p: &PricingParams, right: OptionRight) -> GreeksSnapshot {
    if p.is_degenerate() {
        return GreeksSnapshot::zero();
    }

    let (d1, d2) = d1_d2(p);
    let sqrt_t = p.t_years.sqrt();
    let pdf = norm_pdf(d1);
    let discount = (-p.rate * p.t_years).exp();

    let delta = match right {
        OptionRight::Call => norm_cdf(d1),
        OptionRight::Put => norm_cdf(d1) - 1.0,
    };

    let gamma = pdf / (p.spot * p.vol * sqrt_t);

    // Per one volatility point (1% change in vol).
    let vega = p.spot * pdf * sqrt_t / 100.0;

    let annual_theta = match right {
        OptionRight::Call => {
            -(p.spot * pdf * p.vol) / (2.0 * sqrt_t) - p.rate * p.strike * discount * norm_cdf(d2)
        }
        OptionRight::Put => {
            -(p.spot * pdf * p.vol) / (2.0 * sqrt_t) + p.rate * p.strike * discount * norm_cdf(-d2)
        }
    };
    let theta = annual_theta / 365.0;

    let rho = match right {
        OptionRight::Call => p.strike * p.t_years * discount * norm_cdf(d2) / 100.0,
        OptionRight::Put => -p.strike * p.t_years * discount * norm_cdf(-d2) / 100.0,
    };

    let quality = quality_score(p, gamma, vega);

    GreeksSnapshot {
        delta,
        gamma,
        theta,
        vega,
        rho,
        implied_vol: p.vol,
        quality,
    }
}
