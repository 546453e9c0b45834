//! Position lifecycle management.
//!
//! OPEN -> { stop-loss | target | trailing-stop | time-cutoff | manual }
//! -> CLOSED, with a trade record emitted at close. Exit rules run in that
//! fixed priority; the trailing stop arms on a profit threshold and then
//! only ratchets toward profit.

pub mod exits;
pub mod manager;
pub mod types;

pub use exits::{check_exit_rules, ratchet_trailing};
pub use manager::{ExitIntent, PositionBook};
pub use types::{ExitReason, Position, PositionStatus, TrailingStop};
