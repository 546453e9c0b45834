//! Rolling implied-volatility rank and percentile.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::context::{ModuleContext, VolRankContext};
use crate::registry::AnalyticsModule;
use crate::update::{keys, AnalyticsUpdate};

/// History size below which the faster cold-start cadence applies.
const COLD_START_SAMPLES: usize = 20;
/// Samples needed before rank/percentile are considered meaningful.
const MIN_READY_SAMPLES: usize = 5;

/// Serializable checkpoint: samples plus the last sample time, enough to
/// resume the throttle exactly where it left off across restarts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IvHistoryCheckpoint {
    pub samples: Vec<f64>,
    pub last_sample_at: Option<DateTime<Utc>>,
}

/// Tracks where current IV sits inside its own rolling history.
///
/// Sampling is throttled: the steady cadence applies once warmed up, a
/// faster one while the history is still cold. Rank deliberately exceeds
/// [0, 100] when current IV falls outside the historical range; that is the
/// signal, not a defect.
pub struct VolRankTracker {
    sample_interval: Duration,
    cold_sample_interval: Duration,
    capacity: usize,
    samples: Vec<f64>,
    last_sample_at: Option<DateTime<Utc>>,
    current_iv: Option<f64>,
}

impl VolRankTracker {
    #[must_use]
    pub fn new(sample_secs: i64, cold_sample_secs: i64, capacity: usize) -> Self {
        Self {
            sample_interval: Duration::seconds(sample_secs),
            cold_sample_interval: Duration::seconds(cold_sample_secs),
            capacity,
            samples: Vec::new(),
            last_sample_at: None,
            current_iv: None,
        }
    }

    fn due_for_sample(&self, now: DateTime<Utc>) -> bool {
        let interval = if self.samples.len() < COLD_START_SAMPLES {
            self.cold_sample_interval
        } else {
            self.sample_interval
        };
        match self.last_sample_at {
            None => true,
            Some(last) => now - last >= interval,
        }
    }

    fn record_sample(&mut self, iv: f64, now: DateTime<Utc>) {
        self.samples.push(iv);
        if self.samples.len() > self.capacity {
            let excess = self.samples.len() - self.capacity;
            self.samples.drain(..excess);
        }
        self.last_sample_at = Some(now);
    }

    #[must_use]
    pub fn checkpoint_state(&self) -> IvHistoryCheckpoint {
        IvHistoryCheckpoint {
            samples: self.samples.clone(),
            last_sample_at: self.last_sample_at,
        }
    }

    pub fn restore_state(&mut self, checkpoint: IvHistoryCheckpoint) {
        self.samples = checkpoint.samples;
        if self.samples.len() > self.capacity {
            let excess = self.samples.len() - self.capacity;
            self.samples.drain(..excess);
        }
        self.last_sample_at = checkpoint.last_sample_at;
    }

    fn compute(&self) -> VolRankContext {
        let Some(iv) = self.current_iv else {
            return VolRankContext::default();
        };
        if self.samples.len() < MIN_READY_SAMPLES {
            return VolRankContext {
                current_iv: iv,
                samples: self.samples.len(),
                ..VolRankContext::default()
            };
        }

        let min = self.samples.iter().cloned().fold(f64::MAX, f64::min);
        let max = self.samples.iter().cloned().fold(f64::MIN, f64::max);

        let rank = if (max - min).abs() < f64::EPSILON {
            50.0
        } else {
            (iv - min) / (max - min) * 100.0
        };

        let below = self.samples.iter().filter(|&&s| s < iv).count();
        let percentile = below as f64 / self.samples.len() as f64 * 100.0;

        VolRankContext {
            current_iv: iv,
            rank,
            percentile,
            samples: self.samples.len(),
            ready: true,
        }
    }
}

impl AnalyticsModule for VolRankTracker {
    fn name(&self) -> &str {
        "vol_rank"
    }

    fn update(&mut self, update: &AnalyticsUpdate) {
        let Some(iv) = update.scalar(keys::ATM_IV) else {
            return;
        };
        if iv <= 0.0 {
            return;
        }

        self.current_iv = Some(iv);
        let now = update.timestamp_or_now();
        if self.due_for_sample(now) {
            self.record_sample(iv, now);
        }
    }

    fn context(&self) -> ModuleContext {
        ModuleContext::VolRank(self.compute())
    }

    fn reset(&mut self) {
        self.samples.clear();
        self.last_sample_at = None;
        self.current_iv = None;
    }

    fn checkpoint(&self) -> Option<serde_json::Value> {
        serde_json::to_value(self.checkpoint_state()).ok()
    }

    fn restore(&mut self, state: serde_json::Value) {
        match serde_json::from_value::<IvHistoryCheckpoint>(state) {
            Ok(checkpoint) => self.restore_state(checkpoint),
            Err(e) => tracing::warn!(error = %e, "malformed IV checkpoint ignored"),
        }
    }
}
