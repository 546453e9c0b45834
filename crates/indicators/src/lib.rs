//! Streaming indicator engine.
//!
//! Owns per-underlying candle aggregation and the exponentially-smoothed
//! averages that track them. Incremental updates reproduce, tick by tick, the
//! trajectory a full batch recomputation over the same history would give.

pub mod candle;
pub mod ema;
pub mod engine;

pub use candle::{CandleAggregator, RolloverOutcome};
pub use ema::StreamingEma;
pub use engine::{IndicatorEngine, IndicatorView};
