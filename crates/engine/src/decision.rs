//! The single decision task.
//!
//! Owns every piece of mutable trading state (indicators, analytics,
//! positions, risk ledger, the tracked chain) and serializes all mutation
//! through `on_tick`. Exactly one pass is in flight at a time; a fault in
//! one instrument's processing is logged and never stalls the next tick.

use anyhow::Result;
use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, Utc};
use chrono_tz::Tz;
use rust_decimal::prelude::ToPrimitive;
use std::collections::HashMap;
use std::sync::Arc;
use strike_analytics::modules::{
    BreadthTracker, ImbalanceTracker, OiFlowTracker, PortfolioGreeksTracker, RegimeClassifier,
    VolRankTracker,
};
use strike_analytics::{keys, AnalyticsRegistry, AnalyticsUpdate};
use strike_core::{
    AppConfig, ConfidenceModel, OptionQuote, OrderLeg, ReferenceData, Tick, TickKind, TradeRecord,
};
use strike_execution::ExecutionCoordinator;
use strike_indicators::IndicatorEngine;
use strike_positions::{ExitIntent, ExitReason, PositionBook};
use strike_pricing::{greeks, implied_volatility, PricingParams};
use strike_risk::{position_size, RiskLedger};
use strike_strategy::{
    ConfluenceEngine, DirectionalDebit, MomentumBreakout, RangeCredit, SignalAction, SignalInputs,
    TradeSignal,
};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::atm::{AtmWindow, WindowShift};
use crate::persistence::Persistence;
use crate::snapshot::EngineSnapshot;

/// All decision state for one underlying and its option chain.
pub struct DecisionEngine {
    config: AppConfig,
    indicators: IndicatorEngine,
    analytics: AnalyticsRegistry,
    confluence: ConfluenceEngine,
    breach_detector: RangeCredit,
    book: PositionBook,
    ledger: RiskLedger,
    coordinator: ExecutionCoordinator,
    reference: Arc<dyn ReferenceData>,
    persistence: Persistence,
    window: AtmWindow,
    chain: HashMap<String, OptionQuote>,
    spot: Option<f64>,
    expiry: Option<NaiveDate>,
    squared_off: bool,
    ticks_processed: u64,
    last_signal: Option<TradeSignal>,
    snapshot_tx: watch::Sender<EngineSnapshot>,
}

impl DecisionEngine {
    pub fn new(
        config: AppConfig,
        coordinator: ExecutionCoordinator,
        reference: Arc<dyn ReferenceData>,
        confidence_model: Option<Box<dyn ConfidenceModel>>,
        snapshot_tx: watch::Sender<EngineSnapshot>,
    ) -> Self {
        let indicators = IndicatorEngine::new(
            ChronoDuration::minutes(config.indicators.candle_interval_mins),
            config.indicators.candle_capacity,
            &config.indicators.ema_periods,
        );

        let mut analytics = AnalyticsRegistry::new();
        analytics.register(Box::new(RegimeClassifier::default()));
        analytics.register(Box::new(VolRankTracker::new(
            config.analytics.iv_sample_secs,
            config.analytics.iv_cold_sample_secs,
            config.analytics.iv_history_capacity,
        )));
        analytics.register(Box::new(OiFlowTracker::new(
            config.analytics.oi_snapshot_secs,
            config.analytics.max_pain_strike_span,
        )));
        analytics.register(Box::new(ImbalanceTracker::default()));
        analytics.register(Box::new(BreadthTracker::default()));
        analytics.register(Box::new(PortfolioGreeksTracker::new(
            config.analytics.hedge_delta_threshold,
        )));

        let mut confluence = ConfluenceEngine::new(config.session.clone());
        confluence.register(Box::new(RangeCredit));
        confluence.register(Box::new(DirectionalDebit::new(
            config.analytics.strike_step,
        )));
        confluence.register(Box::new(MomentumBreakout::new(
            config.analytics.strike_step,
        )));
        if let Some(model) = confidence_model {
            confluence.set_confidence_model(model);
        }

        let book = PositionBook::new(config.positions.clone(), config.session.clone());
        let ledger = RiskLedger::new(config.risk.clone(), Utc::now().date_naive());
        let persistence = Persistence::new(&config.persistence);
        let window = AtmWindow::new(
            config.feed.underlying.clone(),
            config.analytics.strike_step,
            config.feed.atm_window_strikes,
        );

        Self {
            config,
            indicators,
            analytics,
            confluence,
            breach_detector: RangeCredit,
            book,
            ledger,
            coordinator,
            reference,
            persistence,
            window,
            chain: HashMap::new(),
            spot: None,
            expiry: None,
            squared_off: false,
            ticks_processed: 0,
            last_signal: None,
            snapshot_tx,
        }
    }

    /// Loads persisted state: open positions and analytics checkpoints.
    pub fn restore(&mut self) {
        if let Some(positions) = self.persistence.load_positions() {
            self.book.restore(positions);
        }
        if let Some(checkpoints) = self.persistence.load_iv_checkpoint() {
            self.analytics.restore_checkpoints(checkpoints);
            info!("analytics checkpoints restored");
        }
    }

    /// Saves checkpointable state. Called on an interval and at shutdown;
    /// failures are logged inside and never propagate.
    pub fn checkpoint(&self) {
        self.persistence
            .save_iv_checkpoint(&self.analytics.checkpoints());
        self.persistence.save_positions(&self.book.all().to_vec());
    }

    /// One decision pass. Returns a subscription diff when the ATM window
    /// rolled and the feed task must re-subscribe.
    pub async fn on_tick(&mut self, tick: Tick) -> Option<WindowShift> {
        self.ticks_processed += 1;
        self.roll_session(tick.timestamp);

        let shift = match tick.kind {
            TickKind::Underlying => self.on_underlying_tick(&tick).await,
            TickKind::Option => {
                self.on_option_tick(&tick).await;
                None
            }
        };

        self.publish_snapshot(tick.timestamp);
        shift
    }

    /// Applies fallback-polled quotes as if they were option readings, so
    /// gaps in the live stream do not blind position monitoring.
    pub async fn apply_polled_quotes(&mut self, quotes: Vec<OptionQuote>, now: DateTime<Utc>) {
        let mut prices = HashMap::new();
        for quote in quotes {
            prices.insert(quote.instrument.clone(), quote.last_price);
            self.chain.insert(quote.instrument.clone(), quote);
        }
        if !prices.is_empty() {
            let intents = self.book.on_prices(&prices, now);
            self.settle_closes(intents, now).await;
            self.publish_snapshot(now);
        }
    }

    /// Open legs whose quotes have gone stale; targets for the fallback
    /// poller.
    #[must_use]
    pub fn stale_legs(&self, now: DateTime<Utc>, max_age: ChronoDuration) -> Vec<String> {
        self.book
            .open_legs()
            .into_iter()
            .map(|leg| leg.instrument)
            .filter(|instrument| {
                self.chain
                    .get(instrument)
                    .map_or(true, |q| now - q.updated_at > max_age)
            })
            .collect()
    }

    /// Square-off for shutdown: closes every open position at market.
    pub async fn square_off_all(&mut self, reason: ExitReason, now: DateTime<Utc>) {
        let open_legs = self.book.open_legs();
        if open_legs.is_empty() {
            return;
        }
        if let Err(e) = self.coordinator.execute_exit(&open_legs).await {
            error!(error = %e, "square-off exits failed; positions remain live");
            return;
        }
        let records = self.book.close_all(reason, now);
        for record in records {
            self.ledger.record_close(record.realized_pnl);
            self.persistence.append_trade(&record);
        }
        self.checkpoint();
    }

    async fn on_underlying_tick(&mut self, tick: &Tick) -> Option<WindowShift> {
        let price = tick.price.to_f64().unwrap_or(0.0);
        if price <= 0.0 {
            warn!(instrument = %tick.instrument, "non-positive underlying price dropped");
            return None;
        }
        self.spot = Some(price);

        self.indicators.on_tick(tick.price, tick.volume, tick.timestamp);

        if self.expiry.is_none() {
            match self.reference.nearest_expiry(tick.timestamp.date_naive()).await {
                Ok(expiry) => self.expiry = Some(expiry),
                Err(e) => {
                    warn!(error = %e, "nearest expiry unavailable; chain window deferred");
                }
            }
        }

        self.update_analytics(tick);

        if self.past_square_off(tick.timestamp) {
            if !self.squared_off && self.book.open_count() > 0 {
                info!("session square-off reached");
                self.square_off_all(ExitReason::TimeCutoff, tick.timestamp).await;
            }
            self.squared_off = true;
        } else {
            self.squared_off = false;
            self.maybe_enter(tick.timestamp).await;
        }

        match self.expiry {
            Some(expiry) => self.window.roll(price, expiry),
            None => None,
        }
    }

    async fn on_option_tick(&mut self, tick: &Tick) {
        if let Err(e) = self.refresh_quote(tick).await {
            // One instrument's failure must not stall the loop.
            error!(instrument = %tick.instrument, error = %e, "option tick dropped");
            return;
        }

        self.update_analytics(tick);

        let prices = HashMap::from([(tick.instrument.clone(), tick.price)]);
        let intents = self.book.on_prices(&prices, tick.timestamp);
        self.settle_closes(intents, tick.timestamp).await;
    }

    /// Updates the tracked chain row for an option tick, repricing its
    /// Greeks from the latest spot.
    async fn refresh_quote(&mut self, tick: &Tick) -> Result<()> {
        if !self.chain.contains_key(&tick.instrument) {
            let meta = self
                .reference
                .instrument_meta(&tick.instrument)
                .await
                .map_err(|e| strike_core::EngineError::FeedGap {
                    instrument: tick.instrument.clone(),
                    detail: e.to_string(),
                })?;
            self.chain.insert(
                tick.instrument.clone(),
                OptionQuote {
                    instrument: meta.instrument,
                    strike: meta.strike,
                    right: meta.right,
                    expiry: meta.expiry,
                    last_price: tick.price,
                    open_interest: tick.open_interest.unwrap_or_default(),
                    volume: tick.volume,
                    bid_price: None,
                    bid_qty: None,
                    ask_price: None,
                    ask_qty: None,
                    greeks: None,
                    updated_at: tick.timestamp,
                },
            );
        }

        let spot = self.spot;
        let rate = self.config.pricing.risk_free_rate;
        let Some(quote) = self.chain.get_mut(&tick.instrument) else {
            return Ok(());
        };
        quote.last_price = tick.price;
        if let Some(oi) = tick.open_interest {
            quote.open_interest = oi;
        }
        quote.volume = tick.volume;
        quote.updated_at = tick.timestamp;

        if let Some(spot) = spot {
            let t_years = quote.days_to_expiry(tick.timestamp).max(0) as f64 / 365.0;
            let strike = quote.strike.to_f64().unwrap_or(0.0);
            let market = tick.price.to_f64().unwrap_or(0.0);
            if strike > 0.0 && market > 0.0 {
                let iv = implied_volatility(market, spot, strike, t_years, rate, quote.right);
                let params = PricingParams {
                    spot,
                    strike,
                    t_years,
                    vol: iv,
                    rate,
                };
                quote.greeks = Some(greeks(&params, quote.right));
            }
        }
        Ok(())
    }

    fn update_analytics(&mut self, tick: &Tick) {
        let view = self.indicators.view();
        let mut update = AnalyticsUpdate::at(tick.timestamp)
            .with_instrument(tick.instrument.clone())
            .with_scalar(keys::PRICE, tick.price.to_f64().unwrap_or(0.0))
            .with_scalar(keys::TREND_STRENGTH_PCT, view.trend_strength_pct)
            .with_scalar(keys::BAND_WIDTH_PCT, view.band_width_pct)
            .with_scalar(keys::RANGE_PCT, view.avg_range_pct);

        if let Some(spot) = self.spot {
            update = update.with_scalar(keys::SPOT, spot);
        }
        if let Some(iv) = self.atm_iv() {
            update = update.with_scalar(keys::ATM_IV, iv);
        }
        if !self.chain.is_empty() {
            update = update.with_chain(self.chain.values().cloned().collect());
        }
        let open_legs = self.book.open_legs();
        if !open_legs.is_empty() {
            update = update.with_open_legs(open_legs);
        }

        self.analytics.update_all(&update);
    }

    /// Implied vol of the nearest-to-ATM quote with Greeks, feeding the
    /// vol-rank sampler.
    fn atm_iv(&self) -> Option<f64> {
        let spot = self.spot?;
        self.chain
            .values()
            .filter_map(|q| {
                let greeks = q.greeks?;
                if greeks.implied_vol <= 0.0 {
                    return None;
                }
                let distance = (q.strike.to_f64()? - spot).abs();
                Some((distance, greeks.implied_vol))
            })
            .min_by(|a, b| a.0.total_cmp(&b.0))
            .map(|(_, iv)| iv)
    }

    async fn maybe_enter(&mut self, now: DateTime<Utc>) {
        let Some(spot) = self.spot else { return };

        let view = self.indicators.view();
        let snapshot = self.analytics.snapshot();
        let chain: Vec<OptionQuote> = self.chain.values().cloned().collect();

        // Open credit structures take priority over fresh entries.
        let open_legs = self.book.open_legs();
        if let Some(adjust) = self.breach_detector.check_breach(spot, &open_legs) {
            warn!(reasoning = %adjust.reasoning, "short strike breached");
            self.last_signal = Some(adjust);
            return;
        }

        let inputs = SignalInputs {
            timestamp: now,
            spot,
            chain: &chain,
            indicators: &view,
            analytics: &snapshot,
            config: &self.config.strategy,
            lot_size: self.config.execution.lot_size,
        };
        let signal = self.confluence.evaluate(&inputs);
        let is_enter = signal.action == SignalAction::Enter;
        self.last_signal = Some(signal.clone());
        if !is_enter {
            debug!(reasoning = %signal.reasoning, "holding");
            return;
        }

        // Risk gate: a rejection is a normal hold with a reason.
        let permission = self.ledger.can_trade(self.book.open_count());
        if !permission.allowed {
            info!(reason = %permission.reason, strategy = %signal.strategy, "entry blocked by risk gate");
            return;
        }

        let legs = match self.sized_legs(&signal) {
            Ok(legs) => legs,
            Err(e) => {
                warn!(error = %e, strategy = %signal.strategy, "sizing failed; entry skipped");
                return;
            }
        };

        match self.coordinator.execute_entry(&legs).await {
            Ok(outcome) if outcome.opens_position() => {
                let kept = outcome.kept_legs();
                self.book.open_position(
                    signal.strategy.clone(),
                    kept,
                    now,
                    signal.confidence,
                    signal.features.clone(),
                );
                self.checkpoint();
            }
            Ok(_) => {
                info!(strategy = %signal.strategy, "entry abandoned after execution");
            }
            Err(e) => {
                error!(error = %e, strategy = %signal.strategy, "entry placement failed");
            }
        }
    }

    /// Scales signal legs by the risk-sized lot count.
    fn sized_legs(&self, signal: &TradeSignal) -> Result<Vec<OrderLeg>> {
        let per_unit: rust_decimal::Decimal = signal
            .legs
            .iter()
            .map(|leg| leg.price)
            .sum();
        anyhow::ensure!(
            per_unit > rust_decimal::Decimal::ZERO,
            "degenerate entry pricing"
        );

        let lots = position_size(
            per_unit,
            self.config.positions.stop_loss_pct,
            self.config.risk.account_balance,
            self.config.risk.risk_per_trade_pct,
            self.config.risk.max_quantity,
        )?;

        Ok(signal
            .legs
            .iter()
            .map(|leg| {
                let mut sized = leg.clone();
                sized.quantity = leg.quantity * lots;
                sized
            })
            .collect())
    }

    /// Places closing orders first and confirms the close in the book only
    /// once they are out. A router failure leaves the position open; the
    /// exit rule fires again on the next refresh.
    async fn settle_closes(&mut self, intents: Vec<ExitIntent>, now: DateTime<Utc>) {
        for intent in intents {
            if let Err(e) = self.coordinator.execute_exit(&intent.legs).await {
                error!(
                    position = %intent.position_id,
                    error = %e,
                    "exit orders failed; position stays open"
                );
                continue;
            }
            if let Some(record) = self
                .book
                .close_position(&intent.position_id, intent.reason, now)
            {
                self.ledger.record_close(record.realized_pnl);
                self.persistence.append_trade(&record);
            }
        }
    }

    fn roll_session(&mut self, now: DateTime<Utc>) {
        let before = self.ledger.session_date();
        self.ledger.roll_session(now);
        if self.ledger.session_date() != before {
            self.analytics.reset_all();
            self.squared_off = false;
        }
    }

    fn past_square_off(&self, now: DateTime<Utc>) -> bool {
        let tz: Tz = self
            .config
            .session
            .timezone
            .parse()
            .unwrap_or(chrono_tz::Asia::Kolkata);
        now.with_timezone(&tz).time() >= self.config.session.square_off
    }

    fn publish_snapshot(&self, as_of: DateTime<Utc>) {
        let snapshot = EngineSnapshot {
            as_of: Some(as_of),
            spot: self.spot,
            last_signal: self.last_signal.clone(),
            analytics: self.analytics.snapshot(),
            open_positions: self.book.open_positions().into_iter().cloned().collect(),
            session_pnl: self.ledger.session_pnl(),
            trades_closed: self.ledger.trades_closed(),
            recent_trades: self.persistence.recent_trades(20),
            ticks_processed: self.ticks_processed,
        };
        // Receivers may come and go; a lapsed watch is not an error.
        let _ = self.snapshot_tx.send(snapshot);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use strike_core::{
        BatchOrderRequest, FillReport, FillStatus, InstrumentMeta, OptionRight, OrderRequest,
        OrderRouter, PartialFillPolicy,
    };

    struct FillEverything;

    #[async_trait]
    impl OrderRouter for FillEverything {
        async fn place_order(&self, request: &OrderRequest) -> Result<FillReport> {
            Ok(FillReport {
                correlation_id: request.correlation_id.clone(),
                order_id: format!("ord-{}", request.instrument),
                status: FillStatus::Filled,
                fill_price: dec!(100),
                filled_quantity: request.quantity,
                timestamp: Utc::now(),
            })
        }

        async fn place_batch(&self, batch: &BatchOrderRequest) -> Result<Vec<FillReport>> {
            let mut reports = Vec::new();
            for order in &batch.orders {
                reports.push(self.place_order(order).await?);
            }
            Ok(reports)
        }

        async fn cancel_order(&self, _order_id: &str) -> Result<()> {
            Ok(())
        }
    }

    struct StubReference;

    #[async_trait]
    impl ReferenceData for StubReference {
        async fn instrument_meta(&self, instrument: &str) -> Result<InstrumentMeta> {
            // NIFTY-YYYYMMDD-STRIKE-RIGHT
            let parts: Vec<&str> = instrument.split('-').collect();
            anyhow::ensure!(parts.len() == 4, "unrecognized symbol {instrument}");
            Ok(InstrumentMeta {
                instrument: instrument.to_string(),
                strike: parts[2].parse()?,
                right: if parts[3] == "CE" {
                    OptionRight::Call
                } else {
                    OptionRight::Put
                },
                expiry: NaiveDate::parse_from_str(parts[1], "%Y%m%d")?,
                lot_size: 25,
            })
        }

        async fn nearest_expiry(&self, from: NaiveDate) -> Result<NaiveDate> {
            Ok(from + ChronoDuration::days(7))
        }

        async fn poll_quote(&self, _instrument: &str) -> Result<OptionQuote> {
            anyhow::bail!("not used in these tests")
        }
    }

    struct DownRouter;

    #[async_trait]
    impl OrderRouter for DownRouter {
        async fn place_order(&self, _request: &OrderRequest) -> Result<FillReport> {
            anyhow::bail!("venue unreachable")
        }

        async fn place_batch(&self, _batch: &BatchOrderRequest) -> Result<Vec<FillReport>> {
            anyhow::bail!("venue unreachable")
        }

        async fn cancel_order(&self, _order_id: &str) -> Result<()> {
            Ok(())
        }
    }

    fn engine_with(
        dir: &std::path::Path,
        router: Arc<dyn OrderRouter>,
    ) -> (DecisionEngine, watch::Receiver<EngineSnapshot>) {
        let mut config = AppConfig::default();
        config.persistence.data_dir = dir.to_string_lossy().into_owned();
        let (tx, rx) = watch::channel(EngineSnapshot::default());
        let coordinator = ExecutionCoordinator::new(router, PartialFillPolicy::CancelFilled);
        let engine = DecisionEngine::new(config, coordinator, Arc::new(StubReference), None, tx);
        (engine, rx)
    }

    fn engine_in(dir: &std::path::Path) -> (DecisionEngine, watch::Receiver<EngineSnapshot>) {
        engine_with(dir, Arc::new(FillEverything))
    }

    fn underlying_tick(price: Decimal, at: DateTime<Utc>) -> Tick {
        Tick {
            instrument: "NIFTY".to_string(),
            price,
            open_interest: None,
            volume: dec!(1),
            timestamp: at,
            kind: TickKind::Underlying,
        }
    }

    fn option_tick(instrument: &str, price: Decimal, at: DateTime<Utc>) -> Tick {
        Tick {
            instrument: instrument.to_string(),
            price,
            open_interest: Some(dec!(1000)),
            volume: dec!(10),
            timestamp: at,
            kind: TickKind::Option,
        }
    }

    fn session_time(min: u32) -> DateTime<Utc> {
        // 10:30 IST onward
        chrono::TimeZone::with_ymd_and_hms(&Utc, 2024, 9, 2, 5, min, 0).unwrap()
    }

    #[tokio::test]
    async fn underlying_ticks_roll_the_atm_window() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _rx) = engine_in(dir.path());

        let shift = engine
            .on_tick(underlying_tick(dec!(24500), session_time(0)))
            .await
            .expect("first tick opens the window");
        // Default span 3 -> 7 strikes x 2 rights.
        assert_eq!(shift.subscribe.len(), 14);

        // Tiny move: no roll.
        assert!(engine
            .on_tick(underlying_tick(dec!(24510), session_time(1)))
            .await
            .is_none());
    }

    #[tokio::test]
    async fn option_ticks_build_the_chain_with_greeks() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, rx) = engine_in(dir.path());

        engine
            .on_tick(underlying_tick(dec!(24500), session_time(0)))
            .await;
        engine
            .on_tick(option_tick("NIFTY-20240909-24500-CE", dec!(180), session_time(1)))
            .await;

        let quote = engine.chain.get("NIFTY-20240909-24500-CE").unwrap();
        let greeks = quote.greeks.expect("greeks priced from spot");
        assert!(greeks.delta > 0.0 && greeks.delta <= 1.0);
        assert!(greeks.implied_vol > 0.0);

        let snapshot = rx.borrow();
        assert_eq!(snapshot.ticks_processed, 2);
        assert_eq!(snapshot.spot, Some(24_500.0));
    }

    #[tokio::test]
    async fn snapshot_reflects_last_hold_signal() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, rx) = engine_in(dir.path());

        engine
            .on_tick(underlying_tick(dec!(24500), session_time(0)))
            .await;

        let snapshot = rx.borrow();
        let signal = snapshot.last_signal.as_ref().expect("a pass was evaluated");
        assert_eq!(signal.action, SignalAction::Hold);
    }

    #[tokio::test]
    async fn bad_option_symbol_does_not_stall_the_loop() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _rx) = engine_in(dir.path());

        engine
            .on_tick(underlying_tick(dec!(24500), session_time(0)))
            .await;
        // Unparseable instrument: logged and dropped.
        engine
            .on_tick(option_tick("garbage", dec!(10), session_time(1)))
            .await;
        // The loop keeps processing.
        engine
            .on_tick(underlying_tick(dec!(24505), session_time(2)))
            .await;
        assert_eq!(engine.ticks_processed, 3);
        assert!(engine.chain.is_empty());
    }

    fn quote(instrument: &str, last_price: Decimal, at: DateTime<Utc>) -> OptionQuote {
        OptionQuote {
            instrument: instrument.to_string(),
            strike: dec!(24500),
            right: OptionRight::Call,
            expiry: NaiveDate::from_ymd_opt(2024, 9, 9).unwrap(),
            last_price,
            open_interest: Decimal::ZERO,
            volume: Decimal::ZERO,
            bid_price: None,
            bid_qty: None,
            ask_price: None,
            ask_qty: None,
            greeks: None,
            updated_at: at,
        }
    }

    #[tokio::test]
    async fn failed_exit_orders_leave_the_position_open() {
        let dir = tempfile::tempdir().unwrap();
        let (mut engine, _rx) = engine_with(dir.path(), Arc::new(DownRouter));
        engine.book.open_position(
            "directional_debit".to_string(),
            vec![OrderLeg {
                instrument: "NIFTY-20240909-24500-CE".to_string(),
                strike: dec!(24500),
                right: OptionRight::Call,
                expiry: NaiveDate::from_ymd_opt(2024, 9, 9).unwrap(),
                side: strike_core::OrderSide::Buy,
                quantity: 25,
                price: dec!(180),
                greeks: None,
            }],
            session_time(0),
            0.6,
            Vec::new(),
        );

        // Target hit, but the closing orders cannot be placed. The book and
        // the journal must not record a close the venue never saw.
        engine
            .apply_polled_quotes(
                vec![quote("NIFTY-20240909-24500-CE", dec!(288), session_time(5))],
                session_time(5),
            )
            .await;

        assert_eq!(engine.book.open_count(), 1);
        assert_eq!(engine.ledger.trades_closed(), 0);
        assert!(engine.persistence.recent_trades(10).is_empty());
    }

    #[tokio::test]
    async fn checkpoint_and_restore_round_trip_positions() {
        let dir = tempfile::tempdir().unwrap();
        {
            let (mut engine, _rx) = engine_in(dir.path());
            engine.book.open_position(
                "range_credit".to_string(),
                vec![OrderLeg {
                    instrument: "NIFTY-20240909-24700-CE".to_string(),
                    strike: dec!(24700),
                    right: OptionRight::Call,
                    expiry: NaiveDate::from_ymd_opt(2024, 9, 9).unwrap(),
                    side: strike_core::OrderSide::Sell,
                    quantity: 25,
                    price: dec!(42),
                    greeks: None,
                }],
                session_time(0),
                0.5,
                Vec::new(),
            );
            engine.checkpoint();
        }

        let (mut engine, _rx) = engine_in(dir.path());
        engine.restore();
        assert_eq!(engine.book.open_count(), 1);
    }
}
