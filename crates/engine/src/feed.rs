//! Feed supervision.
//!
//! Owns the `MarketFeed` connection on its own task: forwards ticks into a
//! bounded queue, applies subscription changes from the decision task, and
//! reconnects with exponential backoff when the stream drops. A disconnect
//! never touches positions; the decision task keeps its book and resumes
//! monitoring when ticks return.

use std::collections::BTreeSet;
use std::time::Duration;

use strike_core::{EngineError, FeedConfig, MarketFeed, Tick};
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

/// Subscription change requested by the decision task (an ATM-window roll).
#[derive(Debug, Clone)]
pub struct SubscriptionChange {
    pub subscribe: Vec<String>,
    pub unsubscribe: Vec<String>,
}

/// Handles returned to the caller when the supervisor task starts.
pub struct FeedHandles {
    pub ticks: mpsc::Receiver<Tick>,
    pub subscriptions: mpsc::Sender<SubscriptionChange>,
}

/// Spawns the supervisor task. `initial` is subscribed before the first tick
/// is read (normally just the underlying).
pub fn spawn(
    feed: Box<dyn MarketFeed>,
    config: FeedConfig,
    initial: Vec<String>,
    shutdown: watch::Receiver<bool>,
) -> FeedHandles {
    let (tick_tx, tick_rx) = mpsc::channel(config.tick_queue_depth.max(1));
    let (sub_tx, sub_rx) = mpsc::channel(64);

    let supervisor = Supervisor {
        feed,
        config,
        subscribed: initial.into_iter().collect(),
        ticks: tick_tx,
        changes: sub_rx,
        shutdown,
    };
    tokio::spawn(supervisor.run());

    FeedHandles {
        ticks: tick_rx,
        subscriptions: sub_tx,
    }
}

struct Supervisor {
    feed: Box<dyn MarketFeed>,
    config: FeedConfig,
    /// Everything currently subscribed; replayed in full after a reconnect.
    subscribed: BTreeSet<String>,
    ticks: mpsc::Sender<Tick>,
    changes: mpsc::Receiver<SubscriptionChange>,
    shutdown: watch::Receiver<bool>,
}

impl Supervisor {
    async fn run(mut self) {
        let instruments: Vec<String> = self.subscribed.iter().cloned().collect();
        if let Err(e) = self.feed.subscribe(&instruments).await {
            error!(error = %e, "initial subscription failed");
            if !self.reconnect_with_backoff().await {
                return;
            }
        }
        info!(count = self.subscribed.len(), "feed supervisor started");

        loop {
            // `next_tick` may be ready on every poll (a replay file, a hot
            // in-memory stream); without an explicit yield this loop would
            // monopolize its worker and starve the rest of the runtime.
            tokio::task::yield_now().await;
            tokio::select! {
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        info!("feed supervisor shutting down");
                        return;
                    }
                }
                change = self.changes.recv() => {
                    match change {
                        Some(change) => self.apply_change(change).await,
                        // Decision task gone; nothing left to feed.
                        None => return,
                    }
                }
                tick = self.feed.next_tick() => {
                    match tick {
                        Ok(Some(tick)) => self.forward(tick),
                        Ok(None) => {
                            warn!("feed stream ended");
                            if !self.reconnect_with_backoff().await {
                                return;
                            }
                        }
                        Err(e) => {
                            warn!(
                                error = %EngineError::FeedDisconnected(e.to_string()),
                                "feed read failed"
                            );
                            if !self.reconnect_with_backoff().await {
                                return;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Forwards a tick, dropping it when the decision task has fallen
    /// behind. A dropped tick is cheaper than an unbounded queue; the next
    /// tick carries a fresher price anyway.
    fn forward(&self, tick: Tick) {
        if let Err(mpsc::error::TrySendError::Full(tick)) = self.ticks.try_send(tick) {
            warn!(instrument = %tick.instrument, "tick queue full; tick dropped");
        }
    }

    async fn apply_change(&mut self, change: SubscriptionChange) {
        if !change.subscribe.is_empty() {
            if let Err(e) = self.feed.subscribe(&change.subscribe).await {
                warn!(error = %e, "subscribe failed; will replay on next reconnect");
            }
            self.subscribed.extend(change.subscribe);
        }
        if !change.unsubscribe.is_empty() {
            if let Err(e) = self.feed.unsubscribe(&change.unsubscribe).await {
                warn!(error = %e, "unsubscribe failed");
            }
            for instrument in &change.unsubscribe {
                self.subscribed.remove(instrument);
            }
        }
    }

    /// Reconnects with doubling backoff, then replays the subscription set.
    /// Returns false when shutdown was requested mid-backoff.
    async fn reconnect_with_backoff(&mut self) -> bool {
        let mut delay = Duration::from_millis(self.config.reconnect_base_ms.max(1));
        let ceiling = Duration::from_millis(self.config.reconnect_max_ms.max(1));

        loop {
            info!(delay_ms = delay.as_millis() as u64, "reconnecting feed");
            tokio::select! {
                _ = self.shutdown.changed() => {
                    if *self.shutdown.borrow() {
                        return false;
                    }
                }
                () = tokio::time::sleep(delay) => {}
            }

            match self.feed.reconnect().await {
                Ok(()) => {
                    let instruments: Vec<String> = self.subscribed.iter().cloned().collect();
                    match self.feed.subscribe(&instruments).await {
                        Ok(()) => {
                            info!(count = instruments.len(), "feed reconnected");
                            return true;
                        }
                        Err(e) => {
                            warn!(error = %e, "subscription replay failed");
                        }
                    }
                }
                Err(e) => {
                    warn!(error = %e, "reconnect failed");
                }
            }
            delay = (delay * 2).min(ceiling);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anyhow::Result;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use strike_core::TickKind;

    fn tick(instrument: &str) -> Tick {
        Tick {
            instrument: instrument.to_string(),
            price: dec!(100),
            open_interest: None,
            volume: dec!(1),
            timestamp: Utc::now(),
            kind: TickKind::Underlying,
        }
    }

    /// Emits a fixed number of ticks, then fails once, then emits again
    /// after a reconnect.
    struct FlakyFeed {
        before_failure: usize,
        emitted: usize,
        failed: bool,
        reconnects: Arc<AtomicUsize>,
        subscriptions: Arc<Mutex<Vec<Vec<String>>>>,
    }

    #[async_trait]
    impl MarketFeed for FlakyFeed {
        async fn next_tick(&mut self) -> Result<Option<Tick>> {
            if self.emitted < self.before_failure {
                self.emitted += 1;
                return Ok(Some(tick("NIFTY")));
            }
            if !self.failed {
                self.failed = true;
                anyhow::bail!("socket closed");
            }
            self.emitted += 1;
            Ok(Some(tick("NIFTY")))
        }

        async fn subscribe(&mut self, instruments: &[String]) -> Result<()> {
            self.subscriptions
                .lock()
                .unwrap()
                .push(instruments.to_vec());
            Ok(())
        }

        async fn unsubscribe(&mut self, _instruments: &[String]) -> Result<()> {
            Ok(())
        }

        async fn reconnect(&mut self) -> Result<()> {
            self.reconnects.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn fast_config() -> FeedConfig {
        FeedConfig {
            underlying: "NIFTY".to_string(),
            tick_queue_depth: 16,
            reconnect_base_ms: 1,
            reconnect_max_ms: 4,
            poll_interval_secs: 5,
            atm_window_strikes: 3,
        }
    }

    #[tokio::test]
    async fn reconnects_and_replays_subscriptions_after_failure() {
        let reconnects = Arc::new(AtomicUsize::new(0));
        let subscriptions = Arc::new(Mutex::new(Vec::new()));
        let feed = FlakyFeed {
            before_failure: 2,
            emitted: 0,
            failed: false,
            reconnects: Arc::clone(&reconnects),
            subscriptions: Arc::clone(&subscriptions),
        };
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut handles = spawn(
            Box::new(feed),
            fast_config(),
            vec!["NIFTY".to_string()],
            shutdown_rx,
        );

        // Two ticks before the failure, then more after the reconnect.
        for _ in 0..4 {
            let tick = handles.ticks.recv().await.expect("tick after reconnect");
            assert_eq!(tick.instrument, "NIFTY");
        }

        assert_eq!(reconnects.load(Ordering::SeqCst), 1);
        let subs = subscriptions.lock().unwrap();
        // Initial subscription plus the post-reconnect replay.
        assert!(subs.len() >= 2);
        assert_eq!(subs.last().unwrap(), &vec!["NIFTY".to_string()]);
    }

    #[tokio::test]
    async fn shutdown_stops_the_supervisor() {
        let feed = FlakyFeed {
            before_failure: usize::MAX,
            emitted: 0,
            failed: false,
            reconnects: Arc::new(AtomicUsize::new(0)),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut handles = spawn(
            Box::new(feed),
            fast_config(),
            vec!["NIFTY".to_string()],
            shutdown_rx,
        );
        handles.ticks.recv().await.expect("stream is live");

        shutdown_tx.send(true).expect("supervisor is listening");

        // The sender side closes once the task exits.
        loop {
            match handles.ticks.try_recv() {
                Ok(_) => continue,
                Err(mpsc::error::TryRecvError::Disconnected) => break,
                Err(mpsc::error::TryRecvError::Empty) => {
                    tokio::task::yield_now().await;
                }
            }
        }
    }

    #[tokio::test]
    async fn always_ready_feed_does_not_starve_the_runtime() {
        let feed = FlakyFeed {
            before_failure: usize::MAX,
            emitted: 0,
            failed: false,
            reconnects: Arc::new(AtomicUsize::new(0)),
            subscriptions: Arc::new(Mutex::new(Vec::new())),
        };
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let _handles = spawn(
            Box::new(feed),
            fast_config(),
            vec!["NIFTY".to_string()],
            shutdown_rx,
        );

        // A sibling task must still get scheduled while the feed spins.
        let side = tokio::spawn(async { 42 });
        assert_eq!(side.await.unwrap(), 42);
    }

    #[tokio::test]
    async fn subscription_changes_reach_the_feed() {
        let subscriptions = Arc::new(Mutex::new(Vec::new()));
        let feed = FlakyFeed {
            before_failure: usize::MAX,
            emitted: 0,
            failed: false,
            reconnects: Arc::new(AtomicUsize::new(0)),
            subscriptions: Arc::clone(&subscriptions),
        };
        let (_shutdown_tx, shutdown_rx) = watch::channel(false);

        let mut handles = spawn(
            Box::new(feed),
            fast_config(),
            vec!["NIFTY".to_string()],
            shutdown_rx,
        );
        handles.ticks.recv().await.expect("stream is live");

        handles
            .subscriptions
            .send(SubscriptionChange {
                subscribe: vec!["NIFTY-20240926-24500-CE".to_string()],
                unsubscribe: Vec::new(),
            })
            .await
            .expect("supervisor is listening");

        // Drain ticks until the change has been applied.
        loop {
            let _ = handles.ticks.recv().await;
            let subs = subscriptions.lock().unwrap();
            if subs
                .iter()
                .any(|s| s.contains(&"NIFTY-20240926-24500-CE".to_string()))
            {
                break;
            }
        }
    }
}
