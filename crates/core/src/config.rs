use crate::orders::PartialFillPolicy;
use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub session: SessionConfig,
    pub indicators: IndicatorConfig,
    pub pricing: PricingConfig,
    pub analytics: AnalyticsConfig,
    pub strategy: StrategyConfig,
    pub positions: PositionConfig,
    pub risk: RiskConfig,
    pub execution: ExecutionConfig,
    pub feed: FeedConfig,
    pub persistence: PersistenceConfig,
}

/// Trading-session window, interpreted in `timezone` (IST by default).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub timezone: String,
    pub open: NaiveTime,
    pub close: NaiveTime,
    /// No fresh entries at or after this time.
    pub entry_cutoff: NaiveTime,
    /// Open positions are squared off at this time.
    pub square_off: NaiveTime,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndicatorConfig {
    pub candle_interval_mins: i64,
    pub ema_periods: Vec<usize>,
    pub candle_capacity: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PricingConfig {
    pub risk_free_rate: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    /// Steady-state IV sampling cadence.
    pub iv_sample_secs: i64,
    /// Faster cadence while history is still cold.
    pub iv_cold_sample_secs: i64,
    pub iv_history_capacity: usize,
    pub oi_snapshot_secs: i64,
    /// |net delta| beyond which the portfolio module suggests a hedge.
    pub hedge_delta_threshold: f64,
    /// Strike spacing of the underlying's option grid.
    pub strike_step: Decimal,
    /// Strikes scanned either side of spot for max pain.
    pub max_pain_strike_span: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StrategyConfig {
    pub min_dte: i64,
    /// IV-rank ceiling for defined-risk (hedged) strategies.
    pub defined_risk_iv_ceiling: f64,
    /// Stricter ceiling for unlimited-risk strategies.
    pub unlimited_risk_iv_ceiling: f64,
    pub momentum_threshold_pct: f64,
    pub confirmation_candles: usize,
    pub min_premium: Decimal,
    pub min_credit: Decimal,
    /// Net |delta| the legs of a credit structure must stay within.
    pub credit_delta_band: f64,
    /// Greeks below this quality score do not gate decisions.
    pub min_greeks_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionConfig {
    pub stop_loss_pct: f64,
    pub target_pct: f64,
    /// Profit (as a fraction of entry) at which the trailing stop activates.
    pub trail_activation_pct: f64,
    /// Gap kept between the best seen price and the trailing level.
    pub trail_gap_pct: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RiskConfig {
    pub account_balance: Decimal,
    pub risk_per_trade_pct: f64,
    pub max_daily_loss: Decimal,
    pub max_open_positions: usize,
    pub max_quantity: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionConfig {
    pub partial_fill_policy: PartialFillPolicy,
    pub lot_size: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// Underlying index symbol the engine trades options on.
    pub underlying: String,
    pub tick_queue_depth: usize,
    pub reconnect_base_ms: u64,
    pub reconnect_max_ms: u64,
    /// Fallback quote-poll cadence; also the per-target throttle floor.
    pub poll_interval_secs: u64,
    /// Strikes subscribed either side of the at-the-money strike.
    pub atm_window_strikes: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    pub data_dir: String,
    pub iv_checkpoint_file: String,
    pub positions_file: String,
    pub journal_file: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig {
                timezone: "Asia/Kolkata".to_string(),
                open: NaiveTime::from_hms_opt(9, 15, 0).unwrap(),
                close: NaiveTime::from_hms_opt(15, 30, 0).unwrap(),
                entry_cutoff: NaiveTime::from_hms_opt(14, 45, 0).unwrap(),
                square_off: NaiveTime::from_hms_opt(15, 15, 0).unwrap(),
            },
            indicators: IndicatorConfig {
                candle_interval_mins: 5,
                ema_periods: vec![9, 21, 50],
                candle_capacity: 500,
            },
            pricing: PricingConfig {
                risk_free_rate: 0.05,
            },
            analytics: AnalyticsConfig {
                iv_sample_secs: 300,
                iv_cold_sample_secs: 60,
                iv_history_capacity: 500,
                oi_snapshot_secs: 180,
                hedge_delta_threshold: 50.0,
                strike_step: Decimal::from(50),
                max_pain_strike_span: 10,
            },
            strategy: StrategyConfig {
                min_dte: 2,
                defined_risk_iv_ceiling: 85.0,
                unlimited_risk_iv_ceiling: 70.0,
                momentum_threshold_pct: 0.15,
                confirmation_candles: 2,
                min_premium: Decimal::from(20),
                min_credit: Decimal::from(40),
                credit_delta_band: 0.15,
                min_greeks_quality: 50,
            },
            positions: PositionConfig {
                stop_loss_pct: 0.30,
                target_pct: 0.60,
                trail_activation_pct: 0.25,
                trail_gap_pct: 0.10,
            },
            risk: RiskConfig {
                account_balance: Decimal::from(500_000),
                risk_per_trade_pct: 0.02,
                max_daily_loss: Decimal::from(15_000),
                max_open_positions: 3,
                max_quantity: 20,
            },
            execution: ExecutionConfig {
                partial_fill_policy: PartialFillPolicy::CancelFilled,
                lot_size: 25,
            },
            feed: FeedConfig {
                underlying: "NIFTY".to_string(),
                tick_queue_depth: 4096,
                reconnect_base_ms: 500,
                reconnect_max_ms: 30_000,
                poll_interval_secs: 5,
                atm_window_strikes: 3,
            },
            persistence: PersistenceConfig {
                data_dir: "data".to_string(),
                iv_checkpoint_file: "iv_history.json".to_string(),
                positions_file: "open_positions.json".to_string(),
                journal_file: "trades.jsonl".to_string(),
            },
        }
    }
}
