//! Pre-entry risk checks and fixed-fractional sizing.

pub mod ledger;
pub mod sizing;

pub use ledger::{RiskLedger, TradePermission};
pub use sizing::position_size;
