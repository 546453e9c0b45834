//! Options pricing engine: Black-Scholes price, Greeks, and a bounded
//! Newton-Raphson implied-volatility solver. Stateless throughout.

pub mod black_scholes;
pub mod implied_vol;
pub mod quality;

pub use black_scholes::{greeks, intrinsic_value, norm_cdf, norm_pdf, price, PricingParams};
pub use implied_vol::implied_volatility;
pub use quality::quality_score;

/// Lower clamp for the IV solver; also the floor returned for options with
/// non-positive time value.
pub const MIN_VOL: f64 = 0.001;
/// Upper clamp for the IV solver.
pub const MAX_VOL: f64 = 5.0;
/// Price tolerance at which the solver accepts an estimate.
pub const PRICE_TOLERANCE: f64 = 1e-5;
/// Iteration cap for the solver.
pub const MAX_ITERATIONS: usize = 100;
