//! Signal confluence engine.
//!
//! One evaluator per strategy family, each gating its conditions against the
//! current indicator view and analytics snapshot. A failed gate is a Hold
//! with a reason, never an error.

pub mod chain_select;
pub mod confluence;
pub mod directional;
pub mod gates;
pub mod momentum;
pub mod range_credit;
pub mod signal;

pub use confluence::ConfluenceEngine;
pub use directional::DirectionalDebit;
pub use momentum::MomentumBreakout;
pub use range_credit::RangeCredit;
pub use signal::{RiskClass, SignalAction, SignalEvaluator, SignalInputs, TradeSignal};
