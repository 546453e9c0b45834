//! Read-only view of the engine for presentation and reporting.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strike_analytics::AnalyticsSnapshot;
use strike_core::TradeRecord;
use strike_positions::Position;
use strike_strategy::TradeSignal;

/// Published on a `watch` channel after every decision pass; consumers poll
/// or await changes independently of tick cadence.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EngineSnapshot {
    pub as_of: Option<DateTime<Utc>>,
    pub spot: Option<f64>,
    pub last_signal: Option<TradeSignal>,
    pub analytics: AnalyticsSnapshot,
    pub open_positions: Vec<Position>,
    pub session_pnl: Decimal,
    pub trades_closed: u32,
    pub recent_trades: Vec<TradeRecord>,
    pub ticks_processed: u64,
}
