//! The engine crate wires the decision core to its boundaries.
//!
//! One feed-supervisor task produces ticks into a bounded queue; one
//! decision task consumes them and owns all trading state. Periodic timers
//! drive the fallback quote poll and state checkpoints. Consumers observe
//! the engine only through the snapshot `watch` channel.

pub mod atm;
pub mod decision;
pub mod feed;
pub mod persistence;
pub mod refresh;
pub mod snapshot;

pub use atm::{option_symbol, AtmWindow, WindowShift};
pub use decision::DecisionEngine;
pub use feed::{FeedHandles, SubscriptionChange};
pub use persistence::Persistence;
pub use refresh::QuotePoller;
pub use snapshot::EngineSnapshot;

use anyhow::Result;
use chrono::{Duration as ChronoDuration, Utc};
use std::sync::Arc;
use std::time::Duration;
use strike_core::{AppConfig, ConfidenceModel, MarketFeed, OrderRouter, ReferenceData};
use strike_execution::ExecutionCoordinator;
use tokio::sync::watch;
use tracing::{info, warn};

/// Fully wired engine, ready to run until shutdown.
pub struct Engine {
    decision: DecisionEngine,
    handles: FeedHandles,
    poller: QuotePoller,
    shutdown: watch::Receiver<bool>,
    snapshot_rx: watch::Receiver<EngineSnapshot>,
    poll_interval: Duration,
}

impl Engine {
    pub fn new(
        config: AppConfig,
        market_feed: Box<dyn MarketFeed>,
        router: Arc<dyn OrderRouter>,
        reference: Arc<dyn ReferenceData>,
        confidence_model: Option<Box<dyn ConfidenceModel>>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        let poll_interval = Duration::from_secs(config.feed.poll_interval_secs.max(1));
        let coordinator =
            ExecutionCoordinator::new(router, config.execution.partial_fill_policy);
        let poller = QuotePoller::new(Arc::clone(&reference), poll_interval);

        let (snapshot_tx, snapshot_rx) = watch::channel(EngineSnapshot::default());
        let mut decision = DecisionEngine::new(
            config.clone(),
            coordinator,
            reference,
            confidence_model,
            snapshot_tx,
        );
        decision.restore();

        let handles = feed::spawn(
            market_feed,
            config.feed.clone(),
            vec![config.feed.underlying.clone()],
            shutdown.clone(),
        );

        Self {
            decision,
            handles,
            poller,
            shutdown,
            snapshot_rx,
            poll_interval,
        }
    }

    /// Read side of the snapshot channel; clone freely for each consumer.
    #[must_use]
    pub fn snapshots(&self) -> watch::Receiver<EngineSnapshot> {
        self.snapshot_rx.clone()
    }

    /// Runs the decision loop until shutdown or the feed task exits.
    /// State is checkpointed on the way out; open positions are persisted,
    /// not closed.
    pub async fn run(mut self) -> Result<()> {
        let mut poll_timer = tokio::time::interval(self.poll_interval);
        let mut checkpoint_timer = tokio::time::interval(Duration::from_secs(60));
        // The first interval tick fires immediately; skip both.
        poll_timer.tick().await;
        checkpoint_timer.tick().await;

        let stale_after = ChronoDuration::seconds(self.poll_interval.as_secs() as i64);

        loop {
            tokio::select! {
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("engine shutting down");
                        break;
                    }
                }
                tick = self.handles.ticks.recv() => {
                    let Some(tick) = tick else {
                        warn!("tick stream closed; stopping");
                        break;
                    };
                    if let Some(shift) = self.decision.on_tick(tick).await {
                        let change = SubscriptionChange {
                            subscribe: shift.subscribe,
                            unsubscribe: shift.unsubscribe,
                        };
                        if self.handles.subscriptions.send(change).await.is_err() {
                            warn!("feed supervisor gone; stopping");
                            break;
                        }
                    }
                }
                _ = poll_timer.tick() => {
                    let now = Utc::now();
                    let stale = self.decision.stale_legs(now, stale_after);
                    if !stale.is_empty() {
                        let quotes = self.poller.poll(&stale).await;
                        self.decision.apply_polled_quotes(quotes, now).await;
                    }
                }
                _ = checkpoint_timer.tick() => {
                    self.decision.checkpoint();
                }
            }
        }

        self.decision.checkpoint();
        Ok(())
    }
}
