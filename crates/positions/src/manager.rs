//! The position book: open, refresh, close.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use std::collections::HashMap;
use strike_core::{OrderLeg, PositionConfig, SessionConfig, TradeRecord};
use tracing::{info, warn};

use crate::exits::{check_exit_rules, ratchet_trailing};
use crate::types::{ExitReason, Position, PositionStatus};

/// An exit rule that fired. The caller places the closing orders first and
/// confirms with [`PositionBook::close_position`] only once they are out;
/// until then the position stays open and the intent re-fires on the next
/// refresh.
#[derive(Debug, Clone)]
pub struct ExitIntent {
    pub position_id: String,
    pub reason: ExitReason,
    pub legs: Vec<OrderLeg>,
}

/// Owns every live position. Single writer: only the decision loop mutates
/// the book, so refresh/exit never race.
pub struct PositionBook {
    config: PositionConfig,
    session: SessionConfig,
    positions: Vec<Position>,
    next_id: u64,
}

impl PositionBook {
    #[must_use]
    pub fn new(config: PositionConfig, session: SessionConfig) -> Self {
        Self {
            config,
            session,
            positions: Vec::new(),
            next_id: 1,
        }
    }

    /// Restores positions from a persisted snapshot.
    pub fn restore(&mut self, positions: Vec<Position>) {
        self.next_id = positions
            .iter()
            .filter_map(|p| p.id.strip_prefix("pos-")?.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        info!(count = positions.len(), "restored position book");
        self.positions = positions;
    }

    pub fn open_position(
        &mut self,
        strategy: String,
        legs: Vec<OrderLeg>,
        entered_at: DateTime<Utc>,
        entry_confidence: f64,
        entry_features: Vec<f64>,
    ) -> &Position {
        let id = format!("pos-{}", self.next_id);
        self.next_id += 1;
        let position = Position::open(
            id,
            strategy,
            legs,
            entered_at,
            entry_confidence,
            entry_features,
        );
        info!(
            position = %position.id,
            strategy = %position.strategy,
            entry_value = %position.entry_value,
            legs = position.legs.len(),
            "position opened"
        );
        self.positions.push(position);
        let last = self.positions.len() - 1;
        &self.positions[last]
    }

    /// Refreshes leg marks from the latest option prices, ratchets trailing
    /// stops, and reports every position whose exit rule fires. Observations
    /// older than a position's last refresh are dropped. Positions stay open
    /// until the caller confirms the close; an unconfirmed intent fires
    /// again on the next refresh.
    pub fn on_prices(
        &mut self,
        prices: &HashMap<String, Decimal>,
        now: DateTime<Utc>,
    ) -> Vec<ExitIntent> {
        let config = self.config.clone();
        let session = self.session.clone();
        let mut intents = Vec::new();

        for pos in self.positions.iter_mut().filter(|p| p.is_open()) {
            if now < pos.last_refresh {
                warn!(
                    position = %pos.id,
                    observed = %now,
                    last = %pos.last_refresh,
                    "stale price observation dropped"
                );
                continue;
            }
            pos.last_refresh = now;
            pos.current_value = crate::types::structure_value(&pos.legs, |leg| {
                prices.get(&leg.instrument).copied().unwrap_or(leg.price)
            });
            pos.unrealized_pnl = pos.current_value - pos.entry_value;

            ratchet_trailing(pos, &config);

            if let Some(reason) = check_exit_rules(pos, &config, &session, now) {
                intents.push(ExitIntent {
                    position_id: pos.id.clone(),
                    reason,
                    legs: pos.legs.clone(),
                });
            }
        }
        intents
    }

    /// Confirms an exit after its closing orders went out.
    pub fn close_position(
        &mut self,
        id: &str,
        reason: ExitReason,
        now: DateTime<Utc>,
    ) -> Option<TradeRecord> {
        let pos = self
            .positions
            .iter_mut()
            .find(|p| p.id == id && p.is_open())?;
        Some(close_in_place(pos, reason, now))
    }

    /// Manual close, e.g. operator intervention or engine shutdown.
    pub fn close_manual(&mut self, id: &str, now: DateTime<Utc>) -> Option<TradeRecord> {
        self.close_position(id, ExitReason::Manual, now)
    }

    /// Closes everything still open, for the end-of-session square-off.
    pub fn close_all(&mut self, reason: ExitReason, now: DateTime<Utc>) -> Vec<TradeRecord> {
        self.positions
            .iter_mut()
            .filter(|p| p.is_open())
            .map(|pos| close_in_place(pos, reason, now))
            .collect()
    }

    #[must_use]
    pub fn open_positions(&self) -> Vec<&Position> {
        self.positions.iter().filter(|p| p.is_open()).collect()
    }

    #[must_use]
    pub fn open_count(&self) -> usize {
        self.positions.iter().filter(|p| p.is_open()).count()
    }

    /// Every open leg across the book, for portfolio analytics.
    #[must_use]
    pub fn open_legs(&self) -> Vec<OrderLeg> {
        self.positions
            .iter()
            .filter(|p| p.is_open())
            .flat_map(|p| p.legs.iter().cloned())
            .collect()
    }

    #[must_use]
    pub fn all(&self) -> &[Position] {
        &self.positions
    }
}

fn close_in_place(pos: &mut Position, reason: ExitReason, now: DateTime<Utc>) -> TradeRecord {
    pos.status = PositionStatus::Closed;
    pos.exit_reason = Some(reason);
    pos.exited_at = Some(now);
    info!(
        position = %pos.id,
        reason = %reason,
        realized_pnl = %pos.unrealized_pnl,
        "position closed"
    );
    pos.to_record()
}
