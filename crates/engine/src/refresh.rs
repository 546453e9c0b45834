//! Fallback quote polling for legs the live stream has not covered.

use governor::clock::DefaultClock;
use governor::state::keyed::DefaultKeyedStateStore;
use governor::{Quota, RateLimiter};
use std::sync::Arc;
use std::time::Duration;
use strike_core::{OptionQuote, ReferenceData};
use tracing::{debug, warn};

type KeyedLimiter = RateLimiter<String, DefaultKeyedStateStore<String>, DefaultClock>;

/// Polls reference data for quotes, throttled per instrument so no target
/// is hit more than once per poll interval regardless of how often the
/// decision loop asks.
pub struct QuotePoller {
    reference: Arc<dyn ReferenceData>,
    limiter: KeyedLimiter,
}

impl QuotePoller {
    #[must_use]
    pub fn new(reference: Arc<dyn ReferenceData>, poll_interval: Duration) -> Self {
        let period = if poll_interval.is_zero() {
            Duration::from_secs(5)
        } else {
            poll_interval
        };
        let quota = Quota::with_period(period).unwrap_or_else(|| {
            Quota::with_period(Duration::from_secs(5)).expect("static nonzero period")
        });
        Self {
            reference,
            limiter: RateLimiter::keyed(quota),
        }
    }

    /// Polls each named instrument that is inside its throttle budget.
    /// Instruments over budget are skipped this round, not queued.
    pub async fn poll(&self, instruments: &[String]) -> Vec<OptionQuote> {
        let mut quotes = Vec::new();
        for instrument in instruments {
            if self.limiter.check_key(instrument).is_err() {
                continue;
            }
            match self.reference.poll_quote(instrument).await {
                Ok(quote) => {
                    debug!(instrument = %instrument, "fallback quote polled");
                    quotes.push(quote);
                }
                Err(e) => {
                    warn!(instrument = %instrument, error = %e, "fallback quote poll failed");
                }
            }
        }
        quotes
    }
}
