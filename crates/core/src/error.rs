//! Domain error taxonomy.
//!
//! Only conditions the decision path has to branch on get a variant here;
//! everything else travels as `anyhow::Error` context. A risk-gate rejection
//! is a normal Hold, not an error, and never appears in this enum.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    /// A leg is missing a live price or Greeks; the decision is held and the
    /// fallback poll takes over. Synthetic values are never substituted.
    #[error("feed data gap for {instrument}: {detail}")]
    FeedGap { instrument: String, detail: String },

    /// Some legs of a batch filled while others failed; resolved per policy.
    #[error("partial execution: {filled} filled, {failed} failed in batch {batch_id}")]
    PartialExecution {
        batch_id: String,
        filled: usize,
        failed: usize,
    },

    /// The feed connection dropped; supervision reconnects with backoff.
    #[error("feed disconnected: {0}")]
    FeedDisconnected(String),

    /// Checkpoint/journal write failed; in-memory state keeps operating.
    #[error("persistence failure at {path}: {source}")]
    Persistence {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Order placement rejected by the venue.
    #[error("order rejected for {instrument}: {reason}")]
    OrderRejected { instrument: String, reason: String },
}
