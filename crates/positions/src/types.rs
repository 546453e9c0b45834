//! Position state and exit vocabulary.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strike_core::{OrderLeg, OrderSide, TradeRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PositionStatus {
    Open,
    Closed,
}

/// Why a position was closed. Display form lands in the trade record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExitReason {
    StopLoss,
    Target,
    TrailingStop,
    TimeCutoff,
    Manual,
}

impl std::fmt::Display for ExitReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::StopLoss => write!(f, "stop_loss"),
            Self::Target => write!(f, "target"),
            Self::TrailingStop => write!(f, "trailing_stop"),
            Self::TimeCutoff => write!(f, "time_cutoff"),
            Self::Manual => write!(f, "manual"),
        }
    }
}

/// Ratcheting stop that arms once profit clears the activation threshold.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TrailingStop {
    pub active: bool,
    /// Best unrealized P&L seen since activation.
    pub best_pnl: Decimal,
    /// Exit level implied by `best_pnl`; only ever moves up.
    pub level: Decimal,
}

/// One open (or closed) multi-leg structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub id: String,
    pub strategy: String,
    pub legs: Vec<OrderLeg>,
    pub status: PositionStatus,
    pub entered_at: DateTime<Utc>,
    /// Signed structure value at entry: positive = net debit paid,
    /// negative = net credit received.
    pub entry_value: Decimal,
    pub current_value: Decimal,
    pub unrealized_pnl: Decimal,
    pub trailing: TrailingStop,
    /// Last leg-price observation applied; refreshes never go backwards.
    pub last_refresh: DateTime<Utc>,
    pub entry_confidence: f64,
    pub entry_features: Vec<f64>,
    pub exit_reason: Option<ExitReason>,
    pub exited_at: Option<DateTime<Utc>>,
}

impl Position {
    #[must_use]
    pub fn open(
        id: String,
        strategy: String,
        legs: Vec<OrderLeg>,
        entered_at: DateTime<Utc>,
        entry_confidence: f64,
        entry_features: Vec<f64>,
    ) -> Self {
        let entry_value = structure_value(&legs, |leg| leg.price);
        Self {
            id,
            strategy,
            legs,
            status: PositionStatus::Open,
            entered_at,
            entry_value,
            current_value: entry_value,
            unrealized_pnl: Decimal::ZERO,
            trailing: TrailingStop::default(),
            last_refresh: entered_at,
            entry_confidence,
            entry_features,
            exit_reason: None,
            exited_at: None,
        }
    }

    /// Absolute capital at risk in the structure; the denominator for every
    /// percent-based exit rule.
    #[must_use]
    pub fn basis(&self) -> Decimal {
        self.entry_value.abs()
    }

    /// P&L as a fraction of basis, zero for a degenerate free structure.
    #[must_use]
    pub fn pnl_fraction(&self) -> Decimal {
        let basis = self.basis();
        if basis.is_zero() {
            return Decimal::ZERO;
        }
        self.unrealized_pnl / basis
    }

    #[must_use]
    pub const fn is_open(&self) -> bool {
        matches!(self.status, PositionStatus::Open)
    }

    /// Trade record for the journal once the position is closed.
    #[must_use]
    pub fn to_record(&self) -> TradeRecord {
        TradeRecord {
            position_id: self.id.clone(),
            strategy: self.strategy.clone(),
            legs: self.legs.clone(),
            entered_at: self.entered_at,
            exited_at: self.exited_at.unwrap_or(self.last_refresh),
            exit_reason: self
                .exit_reason
                .map_or_else(|| "unknown".to_string(), |r| r.to_string()),
            realized_pnl: self.unrealized_pnl,
            entry_confidence: self.entry_confidence,
            entry_features: self.entry_features.clone(),
        }
    }
}

/// Signed mark-to-price value of the structure: buys add, sells subtract.
/// P&L of any mix of legs is `value(now) - value(entry)`.
pub fn structure_value<F>(legs: &[OrderLeg], price_of: F) -> Decimal
where
    F: Fn(&OrderLeg) -> Decimal,
{
    legs.iter()
        .map(|leg| {
            let gross = price_of(leg) * Decimal::from(leg.quantity);
            match leg.side {
                OrderSide::Buy => gross,
                OrderSide::Sell => -gross,
            }
        })
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use strike_core::{OptionRight, OrderSide};

    fn leg(side: OrderSide, price: Decimal, qty: u32) -> OrderLeg {
        OrderLeg {
            instrument: "NIFTY-24500-CE".to_string(),
            strike: dec!(24500),
            right: OptionRight::Call,
            expiry: chrono::NaiveDate::from_ymd_opt(2024, 9, 26).unwrap(),
            side,
            quantity: qty,
            price,
            greeks: None,
        }
    }

    #[test]
    fn debit_structure_value_is_positive() {
        let legs = vec![leg(OrderSide::Buy, dec!(180), 25)];
        assert_eq!(structure_value(&legs, |l| l.price), dec!(4500));
    }

    #[test]
    fn credit_structure_value_is_negative() {
        let legs = vec![
            leg(OrderSide::Sell, dec!(42), 25),
            leg(OrderSide::Sell, dec!(38), 25),
        ];
        assert_eq!(structure_value(&legs, |l| l.price), dec!(-2000));
    }

    #[test]
    fn record_carries_exit_reason_string() {
        let mut pos = Position::open(
            "p1".to_string(),
            "directional_debit".to_string(),
            vec![leg(OrderSide::Buy, dec!(180), 25)],
            Utc::now(),
            0.6,
            vec![1.0, 2.0],
        );
        pos.exit_reason = Some(ExitReason::Target);
        pos.exited_at = Some(Utc::now());
        pos.unrealized_pnl = dec!(900);
        let record = pos.to_record();
        assert_eq!(record.exit_reason, "target");
        assert_eq!(record.realized_pnl, dec!(900));
        assert_eq!(record.entry_features, vec![1.0, 2.0]);
    }
}
