//! Order execution for the decision core.
//!
//! The coordinator is the only caller of the order-router boundary: it
//! turns signal legs into (possibly batched) requests, resolves partial
//! fills by policy, and reports what actually opened.

pub mod coordinator;

pub use coordinator::{ExecutionCoordinator, ExecutionOutcome, LegFill};
