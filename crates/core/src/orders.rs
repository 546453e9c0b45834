//! Order legs, placement requests, fills, and the append-only trade record.

use crate::market::{GreeksSnapshot, OptionRight};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    #[must_use]
    pub const fn opposite(self) -> Self {
        match self {
            Self::Buy => Self::Sell,
            Self::Sell => Self::Buy,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum OrderKind {
    Market,
    Limit,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TimeInForce {
    Day,
    ImmediateOrCancel,
}

/// One leg of a (possibly multi-leg) trade. Immutable once built.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderLeg {
    pub instrument: String,
    pub strike: Decimal,
    pub right: OptionRight,
    pub expiry: NaiveDate,
    pub side: OrderSide,
    pub quantity: u32,
    pub price: Decimal,
    pub greeks: Option<GreeksSnapshot>,
}

impl OrderLeg {
    /// Signed delta contribution of this leg (sell flips the sign).
    #[must_use]
    pub fn signed_delta(&self) -> f64 {
        let delta = self.greeks.map_or(0.0, |g| g.delta);
        let sign = match self.side {
            OrderSide::Buy => 1.0,
            OrderSide::Sell => -1.0,
        };
        sign * delta * f64::from(self.quantity)
    }
}

/// Single-order placement request for the order-placement boundary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderRequest {
    pub correlation_id: String,
    pub instrument: String,
    pub side: OrderSide,
    pub quantity: u32,
    pub kind: OrderKind,
    pub limit_price: Option<Decimal>,
    pub time_in_force: TimeInForce,
}

/// Atomic multi-leg placement; each leg carries its own correlation id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOrderRequest {
    pub batch_id: String,
    pub orders: Vec<OrderRequest>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillStatus {
    Filled,
    Rejected,
}

/// Outcome of one placed order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FillReport {
    pub correlation_id: String,
    pub order_id: String,
    pub status: FillStatus,
    pub fill_price: Decimal,
    pub filled_quantity: u32,
    pub timestamp: DateTime<Utc>,
}

/// What to do when some legs of a batch fill and others fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PartialFillPolicy {
    /// Roll back every filled leg, leaving no exposure.
    CancelFilled,
    /// Accept the unbalanced exposure and manage it.
    KeepFilled,
}

/// Append-only record of one completed trade: entry context plus outcome.
///
/// Feeds offline retraining of the confidence model; fields are additive-only.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradeRecord {
    pub position_id: String,
    pub strategy: String,
    pub legs: Vec<OrderLeg>,
    pub entered_at: DateTime<Utc>,
    pub exited_at: DateTime<Utc>,
    pub exit_reason: String,
    pub realized_pnl: Decimal,
    pub entry_confidence: f64,
    /// Feature vector captured at entry, for the confidence-model trainer.
    pub entry_features: Vec<f64>,
}
