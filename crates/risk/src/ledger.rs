//! Session risk ledger and circuit breakers.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strike_core::RiskConfig;
use tracing::{info, warn};

/// Verdict from the pre-entry risk check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TradePermission {
    pub allowed: bool,
    pub reason: String,
}

impl TradePermission {
    fn allow() -> Self {
        Self {
            allowed: true,
            reason: "ok".to_string(),
        }
    }

    fn deny(reason: String) -> Self {
        Self {
            allowed: false,
            reason,
        }
    }
}

/// Realized-P&L ledger for one trading session. Consulted before every
/// entry, updated after every close, reset when the session date changes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskLedger {
    config: RiskConfig,
    session_date: NaiveDate,
    realized_pnl: Decimal,
    trades_closed: u32,
    /// Latched once the daily-loss breaker trips; stays tripped for the
    /// rest of the session even if later trades claw the loss back.
    breaker_tripped: bool,
}

impl RiskLedger {
    #[must_use]
    pub fn new(config: RiskConfig, session_date: NaiveDate) -> Self {
        Self {
            config,
            session_date,
            realized_pnl: Decimal::ZERO,
            trades_closed: 0,
            breaker_tripped: false,
        }
    }

    /// Rolls the ledger to `now`'s date if the session changed. Same-date
    /// calls change nothing.
    pub fn roll_session(&mut self, now: DateTime<Utc>) {
        let today = now.date_naive();
        if today != self.session_date {
            info!(
                from = %self.session_date,
                to = %today,
                prior_pnl = %self.realized_pnl,
                "risk ledger reset for new session"
            );
            self.session_date = today;
            self.realized_pnl = Decimal::ZERO;
            self.trades_closed = 0;
            self.breaker_tripped = false;
        }
    }

    pub fn record_close(&mut self, realized_pnl: Decimal) {
        self.realized_pnl += realized_pnl;
        self.trades_closed += 1;
        if -self.realized_pnl >= self.config.max_daily_loss && !self.breaker_tripped {
            self.breaker_tripped = true;
            warn!(
                session_pnl = %self.realized_pnl,
                limit = %self.config.max_daily_loss,
                "daily loss breaker tripped; no further entries today"
            );
        }
    }

    /// Pre-entry check: daily-loss breaker first, then the concurrent
    /// position cap. Pure for unchanged inputs.
    #[must_use]
    pub fn can_trade(&self, open_positions: usize) -> TradePermission {
        if self.breaker_tripped {
            return TradePermission::deny(format!(
                "daily loss {} breached limit {}",
                self.realized_pnl, self.config.max_daily_loss
            ));
        }
        if open_positions >= self.config.max_open_positions {
            return TradePermission::deny(format!(
                "{open_positions} open positions at the cap of {}",
                self.config.max_open_positions
            ));
        }
        TradePermission::allow()
    }

    #[must_use]
    pub fn session_pnl(&self) -> Decimal {
        self.realized_pnl
    }

    #[must_use]
    pub fn trades_closed(&self) -> u32 {
        self.trades_closed
    }

    #[must_use]
    pub fn session_date(&self) -> NaiveDate {
        self.session_date
    }

    #[must_use]
    pub fn config(&self) -> &RiskConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use strike_core::AppConfig;

    fn ledger() -> RiskLedger {
        RiskLedger::new(
            AppConfig::default().risk,
            NaiveDate::from_ymd_opt(2024, 9, 2).unwrap(),
        )
    }

    #[test]
    fn allows_within_limits() {
        let ledger = ledger();
        let verdict = ledger.can_trade(0);
        assert!(verdict.allowed);
    }

    #[test]
    fn concurrency_cap_blocks() {
        let ledger = ledger();
        let verdict = ledger.can_trade(3); // default cap is 3
        assert!(!verdict.allowed);
        assert!(verdict.reason.contains("cap"));
    }

    #[test]
    fn daily_loss_breaker_trips_and_latches() {
        let mut ledger = ledger();
        ledger.record_close(dec!(-15000)); // exactly at the default limit
        assert!(!ledger.can_trade(0).allowed);

        // A winner later in the day does not re-arm entries.
        ledger.record_close(dec!(20000));
        assert!(!ledger.can_trade(0).allowed);
    }

    #[test]
    fn verdict_is_stable_for_unchanged_inputs() {
        let mut ledger = ledger();
        ledger.record_close(dec!(-5000));
        let first = ledger.can_trade(1);
        let second = ledger.can_trade(1);
        assert_eq!(first, second);
    }

    #[test]
    fn session_roll_resets_everything() {
        let mut ledger = ledger();
        ledger.record_close(dec!(-15000));
        assert!(!ledger.can_trade(0).allowed);

        let next_day = Utc.with_ymd_and_hms(2024, 9, 3, 3, 45, 0).unwrap();
        ledger.roll_session(next_day);
        assert!(ledger.can_trade(0).allowed);
        assert_eq!(ledger.session_pnl(), Decimal::ZERO);
        assert_eq!(ledger.trades_closed(), 0);
    }

    #[test]
    fn same_day_roll_is_a_no_op() {
        let mut ledger = ledger();
        ledger.record_close(dec!(-5000));
        let same_day = Utc.with_ymd_and_hms(2024, 9, 2, 9, 0, 0).unwrap();
        ledger.roll_session(same_day);
        assert_eq!(ledger.session_pnl(), dec!(-5000));
    }
}
