//! Boundary traits for the external collaborators.
//!
//! The decision core never talks to a vendor wire protocol directly; these
//! seams are implemented by the adapter crates (or mocks in tests).

use crate::market::{InstrumentMeta, OptionQuote, Tick};
use crate::orders::{BatchOrderRequest, FillReport, OrderRequest};
use anyhow::Result;
use async_trait::async_trait;
use chrono::NaiveDate;

/// De-duplicated normalized tick stream plus subscription management.
#[async_trait]
pub trait MarketFeed: Send + Sync {
    /// Next tick, or `None` once the stream has ended cleanly.
    async fn next_tick(&mut self) -> Result<Option<Tick>>;

    async fn subscribe(&mut self, instruments: &[String]) -> Result<()>;

    async fn unsubscribe(&mut self, instruments: &[String]) -> Result<()>;

    /// Re-establishes the connection; the caller replays subscriptions after.
    async fn reconnect(&mut self) -> Result<()>;
}

/// Instrument-master lookup and the throttled quote-poll fallback.
#[async_trait]
pub trait ReferenceData: Send + Sync {
    async fn instrument_meta(&self, instrument: &str) -> Result<InstrumentMeta>;

    /// Nearest expiry on or after `from` for the tracked underlying.
    async fn nearest_expiry(&self, from: NaiveDate) -> Result<NaiveDate>;

    /// One-shot quote for a leg the stream has not yet covered.
    async fn poll_quote(&self, instrument: &str) -> Result<OptionQuote>;
}

/// Order placement and cancellation.
#[async_trait]
pub trait OrderRouter: Send + Sync {
    async fn place_order(&self, request: &OrderRequest) -> Result<FillReport>;

    /// Places every order of the batch; one report per leg, in order.
    async fn place_batch(&self, batch: &BatchOrderRequest) -> Result<Vec<FillReport>>;

    async fn cancel_order(&self, order_id: &str) -> Result<()>;
}

/// Optional offline-trained win-probability model.
///
/// Never gates a decision on its own; callers only use the returned
/// probability to adjust an already-computed confidence score.
pub trait ConfidenceModel: Send + Sync {
    /// Win probability in `[0, 1]`, or `None` when the model is unavailable.
    fn win_probability(&self, features: &[f64]) -> Option<f64>;
}
