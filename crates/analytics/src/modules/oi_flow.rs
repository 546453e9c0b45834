//! Open-interest flow classification and max pain.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::context::{BuildupRegime, ModuleContext, OiFlowContext};
use crate::registry::AnalyticsModule;
use crate::update::{keys, AnalyticsUpdate};
use strike_core::{OptionQuote, OptionRight};

/// Price or OI moves smaller than this fraction count as unchanged and keep
/// the previous classification.
const MIN_MOVE_FRACTION: f64 = 0.0005;

struct OiSnapshot {
    spot: f64,
    total_oi: Decimal,
    taken_at: DateTime<Utc>,
}

/// Classifies OI buildup on a fixed cadence and scans the chain for the
/// strike with minimum aggregate writer payout (max pain).
pub struct OiFlowTracker {
    snapshot_interval: Duration,
    strike_span: usize,
    previous: Option<OiSnapshot>,
    latest: OiFlowContext,
}

impl OiFlowTracker {
    #[must_use]
    pub fn new(snapshot_secs: i64, strike_span: u32) -> Self {
        Self {
            snapshot_interval: Duration::seconds(snapshot_secs),
            strike_span: strike_span as usize,
            previous: None,
            latest: OiFlowContext::default(),
        }
    }

    /// Writer payout if the underlying settles exactly at `settle`.
    fn writer_payout(chain: &[OptionQuote], settle: Decimal) -> Decimal {
        chain
            .iter()
            .map(|quote| {
                let intrinsic = match quote.right {
                    OptionRight::Call => (settle - quote.strike).max(Decimal::ZERO),
                    OptionRight::Put => (quote.strike - settle).max(Decimal::ZERO),
                };
                intrinsic * quote.open_interest
            })
            .sum()
    }

    /// Strike minimizing aggregate writer payout. Candidates are the `span`
    /// listed strikes on each side of spot; far wings stay out of the scan.
    #[must_use]
    pub fn max_pain(chain: &[OptionQuote], spot: f64, span: usize) -> Option<Decimal> {
        use rust_decimal::prelude::FromPrimitive;

        let mut strikes: Vec<Decimal> = chain.iter().map(|q| q.strike).collect();
        strikes.sort();
        strikes.dedup();
        let spot = Decimal::from_f64(spot)?;

        let above = strikes.partition_point(|s| *s < spot);
        let lo = above.saturating_sub(span);
        let hi = (above + span).min(strikes.len());

        strikes[lo..hi]
            .iter()
            .map(|&strike| (strike, Self::writer_payout(chain, strike)))
            .min_by(|a, b| a.1.cmp(&b.1))
            .map(|(strike, _)| strike)
    }

    fn classify(
        &self,
        spot: f64,
        total_oi: Decimal,
        prev: &OiSnapshot,
    ) -> Option<BuildupRegime> {
        use rust_decimal::prelude::ToPrimitive;

        if prev.spot <= 0.0 {
            return None;
        }
        let price_change = (spot - prev.spot) / prev.spot;

        let prev_oi = prev.total_oi.to_f64().unwrap_or(0.0);
        if prev_oi <= 0.0 {
            return None;
        }
        let oi_change = (total_oi.to_f64().unwrap_or(0.0) - prev_oi) / prev_oi;

        if price_change.abs() < MIN_MOVE_FRACTION || oi_change.abs() < MIN_MOVE_FRACTION {
            return self.latest.buildup;
        }

        Some(match (price_change > 0.0, oi_change > 0.0) {
            (true, true) => BuildupRegime::LongBuildup,
            (false, true) => BuildupRegime::ShortBuildup,
            (true, false) => BuildupRegime::ShortCovering,
            (false, false) => BuildupRegime::LongUnwinding,
        })
    }
}

impl AnalyticsModule for OiFlowTracker {
    fn name(&self) -> &str {
        "oi_flow"
    }

    fn update(&mut self, update: &AnalyticsUpdate) {
        let Some(chain) = update.chain.as_deref() else {
            return;
        };
        let Some(spot) = update.scalar(keys::SPOT) else {
            return;
        };
        if chain.is_empty() {
            return;
        }

        let now = update.timestamp_or_now();
        if let Some(prev) = &self.previous {
            if now - prev.taken_at < self.snapshot_interval {
                return;
            }
        }

        let total_call_oi: Decimal = chain
            .iter()
            .filter(|q| q.right == OptionRight::Call)
            .map(|q| q.open_interest)
            .sum();
        let total_put_oi: Decimal = chain
            .iter()
            .filter(|q| q.right == OptionRight::Put)
            .map(|q| q.open_interest)
            .sum();
        let total_oi = total_call_oi + total_put_oi;

        let buildup = self
            .previous
            .as_ref()
            .and_then(|prev| self.classify(spot, total_oi, prev));

        let pcr = {
            use rust_decimal::prelude::ToPrimitive;
            let calls = total_call_oi.to_f64().unwrap_or(0.0);
            let puts = total_put_oi.to_f64().unwrap_or(0.0);
            (calls > 0.0).then(|| puts / calls)
        };

        self.latest = OiFlowContext {
            buildup,
            max_pain: Self::max_pain(chain, spot, self.strike_span),
            pcr,
            total_call_oi,
            total_put_oi,
            ready: true,
        };
        self.previous = Some(OiSnapshot {
            spot,
            total_oi,
            taken_at: now,
        });
    }

    fn context(&self) -> ModuleContext {
        ModuleContext::OiFlow(self.latest.clone())
    }

    fn reset(&mut self) {
        self.previous = None;
        self.latest = OiFlowContext::default();
    }
}
