//! Exit rules, evaluated in fixed priority.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::Decimal;
use strike_core::{PositionConfig, SessionConfig};
use tracing::warn;

use crate::types::{ExitReason, Position};

/// Checks every exit rule against an open position. Priority is fixed:
/// stop-loss, then target, then trailing stop, then the session cutoff.
/// First hit wins.
#[must_use]
pub fn check_exit_rules(
    pos: &Position,
    config: &PositionConfig,
    session: &SessionConfig,
    now: DateTime<Utc>,
) -> Option<ExitReason> {
    if let Some(reason) = check_stop_loss(pos, config) {
        return Some(reason);
    }
    if let Some(reason) = check_target(pos, config) {
        return Some(reason);
    }
    if let Some(reason) = check_trailing(pos) {
        return Some(reason);
    }
    check_time_cutoff(pos, session, now)
}

/// Loss at or past `stop_loss_pct` of basis.
fn check_stop_loss(pos: &Position, config: &PositionConfig) -> Option<ExitReason> {
    let threshold = Decimal::from_f64(config.stop_loss_pct)?;
    if -pos.pnl_fraction() >= threshold {
        warn!(
            position = %pos.id,
            pnl = %pos.unrealized_pnl,
            "stop loss hit"
        );
        return Some(ExitReason::StopLoss);
    }
    None
}

/// Profit at or past `target_pct` of basis.
fn check_target(pos: &Position, config: &PositionConfig) -> Option<ExitReason> {
    let threshold = Decimal::from_f64(config.target_pct)?;
    if pos.pnl_fraction() >= threshold {
        return Some(ExitReason::Target);
    }
    None
}

/// Armed trailing stop, P&L back at or under the ratcheted level.
fn check_trailing(pos: &Position) -> Option<ExitReason> {
    if pos.trailing.active && pos.unrealized_pnl <= pos.trailing.level {
        warn!(
            position = %pos.id,
            pnl = %pos.unrealized_pnl,
            level = %pos.trailing.level,
            "trailing stop hit"
        );
        return Some(ExitReason::TrailingStop);
    }
    None
}

/// Square-off time reached in the session's market timezone.
fn check_time_cutoff(
    pos: &Position,
    session: &SessionConfig,
    now: DateTime<Utc>,
) -> Option<ExitReason> {
    let tz: Tz = session
        .timezone
        .parse()
        .unwrap_or(chrono_tz::Asia::Kolkata);
    let local = now.with_timezone(&tz).time();
    if local >= session.square_off {
        warn!(position = %pos.id, time = %local, "session square-off");
        return Some(ExitReason::TimeCutoff);
    }
    None
}

/// Advances the trailing stop for the current P&L. Activation happens once
/// profit clears `trail_activation_pct` of basis; afterwards the level only
/// ratchets toward profit. Re-applying the same P&L changes nothing.
pub fn ratchet_trailing(pos: &mut Position, config: &PositionConfig) {
    let basis = pos.basis();
    if basis.is_zero() {
        return;
    }
    let activation = Decimal::from_f64(config.trail_activation_pct).unwrap_or(Decimal::MAX);
    let gap = Decimal::from_f64(config.trail_gap_pct).unwrap_or(Decimal::ZERO);

    if !pos.trailing.active {
        if pos.pnl_fraction() >= activation {
            pos.trailing.active = true;
            pos.trailing.best_pnl = pos.unrealized_pnl;
            pos.trailing.level = pos.unrealized_pnl - gap * basis;
        }
        return;
    }

    if pos.unrealized_pnl > pos.trailing.best_pnl {
        pos.trailing.best_pnl = pos.unrealized_pnl;
        let level = pos.unrealized_pnl - gap * basis;
        if level > pos.trailing.level {
            pos.trailing.level = level;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use strike_core::{AppConfig, OptionRight, OrderLeg, OrderSide};

    fn debit_position(entry: Decimal) -> Position {
        let legs = vec![OrderLeg {
            instrument: "NIFTY-24500-CE".to_string(),
            strike: dec!(24500),
            right: OptionRight::Call,
            expiry: chrono::NaiveDate::from_ymd_opt(2024, 9, 26).unwrap(),
            side: OrderSide::Buy,
            quantity: 25,
            price: entry,
            greeks: None,
        }];
        Position::open(
            "t1".to_string(),
            "directional_debit".to_string(),
            legs,
            Utc.with_ymd_and_hms(2024, 9, 2, 5, 0, 0).unwrap(),
            0.6,
            Vec::new(),
        )
    }

    fn mid_session() -> DateTime<Utc> {
        // 11:00 IST
        Utc.with_ymd_and_hms(2024, 9, 2, 5, 30, 0).unwrap()
    }

    #[test]
    fn stop_loss_fires_at_threshold() {
        let cfg = AppConfig::default();
        let mut pos = debit_position(dec!(180));
        // 30% of 4500 basis = 1350 loss
        pos.unrealized_pnl = dec!(-1350);
        let reason = check_exit_rules(&pos, &cfg.positions, &cfg.session, mid_session());
        assert_eq!(reason, Some(ExitReason::StopLoss));
    }

    #[test]
    fn target_fires_past_threshold() {
        let cfg = AppConfig::default();
        let mut pos = debit_position(dec!(180));
        pos.unrealized_pnl = dec!(2700); // 60% of 4500
        let reason = check_exit_rules(&pos, &cfg.positions, &cfg.session, mid_session());
        assert_eq!(reason, Some(ExitReason::Target));
    }

    #[test]
    fn stop_loss_outranks_everything() {
        let cfg = AppConfig::default();
        let mut pos = debit_position(dec!(180));
        pos.unrealized_pnl = dec!(-2000);
        pos.trailing.active = true;
        pos.trailing.level = dec!(-1000);
        // Past square-off too; stop-loss still reports first.
        let late = Utc.with_ymd_and_hms(2024, 9, 2, 10, 0, 0).unwrap();
        let reason = check_exit_rules(&pos, &cfg.positions, &cfg.session, late);
        assert_eq!(reason, Some(ExitReason::StopLoss));
    }

    #[test]
    fn square_off_closes_flat_position() {
        let cfg = AppConfig::default();
        let pos = debit_position(dec!(180));
        // 15:20 IST == 09:50 UTC, past the 15:15 square-off
        let late = Utc.with_ymd_and_hms(2024, 9, 2, 9, 50, 0).unwrap();
        let reason = check_exit_rules(&pos, &cfg.positions, &cfg.session, late);
        assert_eq!(reason, Some(ExitReason::TimeCutoff));
    }

    #[test]
    fn trailing_arms_then_ratchets_only_up() {
        let cfg = AppConfig::default().positions;
        let mut pos = debit_position(dec!(180));

        // Below activation (25% of 4500 = 1125): nothing arms.
        pos.unrealized_pnl = dec!(500);
        ratchet_trailing(&mut pos, &cfg);
        assert!(!pos.trailing.active);

        // Past activation: level = pnl - 10% of basis.
        pos.unrealized_pnl = dec!(1200);
        ratchet_trailing(&mut pos, &cfg);
        assert!(pos.trailing.active);
        assert_eq!(pos.trailing.level, dec!(750));

        // New high ratchets the level up.
        pos.unrealized_pnl = dec!(2000);
        ratchet_trailing(&mut pos, &cfg);
        assert_eq!(pos.trailing.level, dec!(1550));

        // Pullback never lowers it.
        pos.unrealized_pnl = dec!(1600);
        ratchet_trailing(&mut pos, &cfg);
        assert_eq!(pos.trailing.level, dec!(1550));
    }

    #[test]
    fn ratchet_is_idempotent_for_identical_input() {
        let cfg = AppConfig::default().positions;
        let mut pos = debit_position(dec!(180));
        pos.unrealized_pnl = dec!(1200);
        ratchet_trailing(&mut pos, &cfg);
        let snapshot = pos.trailing.clone();
        ratchet_trailing(&mut pos, &cfg);
        assert_eq!(snapshot.level, pos.trailing.level);
        assert_eq!(snapshot.best_pnl, pos.trailing.best_pnl);
    }

    #[test]
    fn armed_trail_fires_on_giveback() {
        let cfg = AppConfig::default();
        let mut pos = debit_position(dec!(180));
        pos.unrealized_pnl = dec!(2000);
        ratchet_trailing(&mut pos, &cfg.positions);
        assert!(pos.trailing.active);

        pos.unrealized_pnl = dec!(1500); // back under level 1550
        let reason = check_exit_rules(&pos, &cfg.positions, &cfg.session, mid_session());
        assert_eq!(reason, Some(ExitReason::TrailingStop));
    }
}
