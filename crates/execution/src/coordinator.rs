//! Turns an entry signal's legs into router orders and resolves the result.

use anyhow::Result;
use std::sync::Arc;
use strike_core::{
    BatchOrderRequest, EngineError, FillReport, FillStatus, OrderKind, OrderLeg, OrderRequest,
    OrderRouter, PartialFillPolicy, TimeInForce,
};
use tracing::{error, info, warn};
use uuid::Uuid;

/// One leg paired with the router's verdict on it.
#[derive(Debug, Clone)]
pub struct LegFill {
    pub leg: OrderLeg,
    pub report: FillReport,
}

/// Outcome of one placement attempt.
#[derive(Debug)]
pub enum ExecutionOutcome {
    /// Every leg filled; the position can open with these fills.
    Filled(Vec<LegFill>),
    /// Some legs filled under `keep-filled`; the position opens with only
    /// the filled subset.
    PartiallyKept {
        filled: Vec<LegFill>,
        rejected: Vec<LegFill>,
    },
    /// Nothing survives: either every leg was rejected, or the partial fill
    /// was unwound under `cancel-filled`.
    Abandoned { rejected: Vec<LegFill> },
}

impl ExecutionOutcome {
    /// Legs that should become position legs, priced at their fills.
    #[must_use]
    pub fn kept_legs(&self) -> Vec<OrderLeg> {
        let kept = match self {
            Self::Filled(fills) => fills.as_slice(),
            Self::PartiallyKept { filled, .. } => filled.as_slice(),
            Self::Abandoned { .. } => &[],
        };
        kept.iter()
            .map(|f| {
                let mut leg = f.leg.clone();
                leg.price = f.report.fill_price;
                leg
            })
            .collect()
    }

    #[must_use]
    pub const fn opens_position(&self) -> bool {
        !matches!(self, Self::Abandoned { .. })
    }
}

/// Places signal legs through the order-router boundary. Multi-leg entries
/// go out as one atomic batch; a partial fill is resolved by the configured
/// policy and always logged leg by leg.
pub struct ExecutionCoordinator {
    router: Arc<dyn OrderRouter>,
    partial_fill_policy: PartialFillPolicy,
}

impl ExecutionCoordinator {
    pub fn new(router: Arc<dyn OrderRouter>, partial_fill_policy: PartialFillPolicy) -> Self {
        Self {
            router,
            partial_fill_policy,
        }
    }

    /// Executes the legs of an entry signal.
    ///
    /// # Errors
    /// Fails only on transport errors from the router; rejected legs are
    /// reported through the outcome, not as errors.
    pub async fn execute_entry(&self, legs: &[OrderLeg]) -> Result<ExecutionOutcome> {
        anyhow::ensure!(!legs.is_empty(), "entry signal carried no legs");

        if legs.len() == 1 {
            let request = leg_to_request(&legs[0]);
            let report = self.router.place_order(&request).await?;
            let fill = LegFill {
                leg: legs[0].clone(),
                report,
            };
            return Ok(match fill.report.status {
                FillStatus::Filled => {
                    info!(
                        correlation_id = %fill.report.correlation_id,
                        fill_price = %fill.report.fill_price,
                        "single-leg entry filled"
                    );
                    ExecutionOutcome::Filled(vec![fill])
                }
                FillStatus::Rejected => {
                    warn!(
                        correlation_id = %fill.report.correlation_id,
                        instrument = %fill.leg.instrument,
                        "single-leg entry rejected"
                    );
                    ExecutionOutcome::Abandoned {
                        rejected: vec![fill],
                    }
                }
            });
        }

        let batch = BatchOrderRequest {
            batch_id: Uuid::new_v4().to_string(),
            orders: legs.iter().map(leg_to_request).collect(),
        };
        let reports = self.router.place_batch(&batch).await?;
        anyhow::ensure!(
            reports.len() == legs.len(),
            "router returned {} reports for {} legs",
            reports.len(),
            legs.len()
        );

        // One report per leg, in order.
        let (filled, rejected): (Vec<LegFill>, Vec<LegFill>) = legs
            .iter()
            .cloned()
            .zip(reports)
            .map(|(leg, report)| LegFill { leg, report })
            .partition(|f| f.report.status == FillStatus::Filled);

        if rejected.is_empty() {
            info!(
                batch_id = %batch.batch_id,
                legs = filled.len(),
                "multi-leg entry fully filled"
            );
            return Ok(ExecutionOutcome::Filled(filled));
        }
        if filled.is_empty() {
            warn!(batch_id = %batch.batch_id, legs = rejected.len(), "every leg rejected");
            return Ok(ExecutionOutcome::Abandoned { rejected });
        }

        self.resolve_partial(&batch.batch_id, filled, rejected).await
    }

    async fn resolve_partial(
        &self,
        batch_id: &str,
        filled: Vec<LegFill>,
        rejected: Vec<LegFill>,
    ) -> Result<ExecutionOutcome> {
        let filled_legs: Vec<&str> = filled.iter().map(|f| f.leg.instrument.as_str()).collect();
        let rejected_legs: Vec<&str> = rejected.iter().map(|f| f.leg.instrument.as_str()).collect();
        warn!(
            error = %EngineError::PartialExecution {
                batch_id: batch_id.to_string(),
                filled: filled.len(),
                failed: rejected.len(),
            },
            policy = ?self.partial_fill_policy,
            filled = ?filled_legs,
            rejected = ?rejected_legs,
            "partial fill on multi-leg entry"
        );

        match self.partial_fill_policy {
            PartialFillPolicy::CancelFilled => {
                for fill in &filled {
                    if let Err(e) = self.router.cancel_order(&fill.report.order_id).await {
                        // Residual exposure the operator must know about.
                        error!(
                            order_id = %fill.report.order_id,
                            instrument = %fill.leg.instrument,
                            error = %e,
                            "failed to cancel filled leg after partial fill"
                        );
                    }
                }
                info!(batch_id, cancelled = filled.len(), "partial fill unwound");
                Ok(ExecutionOutcome::Abandoned { rejected })
            }
            PartialFillPolicy::KeepFilled => {
                info!(batch_id, kept = filled.len(), "partial fill kept open");
                Ok(ExecutionOutcome::PartiallyKept { filled, rejected })
            }
        }
    }

    /// Closing orders for a position's legs: side flipped, same quantity.
    ///
    /// # Errors
    /// Fails on router transport errors.
    pub async fn execute_exit(&self, legs: &[OrderLeg]) -> Result<Vec<FillReport>> {
        let mut reports = Vec::with_capacity(legs.len());
        for leg in legs {
            let mut request = leg_to_request(leg);
            request.side = leg.side.opposite();
            let report = self.router.place_order(&request).await?;
            if report.status == FillStatus::Rejected {
                warn!(
                    correlation_id = %report.correlation_id,
                    instrument = %request.instrument,
                    "exit leg rejected; position leg remains live"
                );
            }
            reports.push(report);
        }
        Ok(reports)
    }
}

fn leg_to_request(leg: &OrderLeg) -> OrderRequest {
    OrderRequest {
        correlation_id: Uuid::new_v4().to_string(),
        instrument: leg.instrument.clone(),
        side: leg.side,
        quantity: leg.quantity,
        kind: OrderKind::Market,
        limit_price: None,
        time_in_force: TimeInForce::Day,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;
    use std::sync::Mutex;
    use strike_core::{OptionRight, OrderSide};

    /// Router that rejects any instrument on its blocklist and counts
    /// cancels.
    struct ScriptedRouter {
        reject: Vec<String>,
        cancelled: Mutex<Vec<String>>,
    }

    impl ScriptedRouter {
        fn new(reject: &[&str]) -> Self {
            Self {
                reject: reject.iter().map(ToString::to_string).collect(),
                cancelled: Mutex::new(Vec::new()),
            }
        }

        fn report_for(&self, request: &OrderRequest) -> FillReport {
            let rejected = self.reject.contains(&request.instrument);
            FillReport {
                correlation_id: request.correlation_id.clone(),
                order_id: format!("ord-{}", request.instrument),
                status: if rejected {
                    FillStatus::Rejected
                } else {
                    FillStatus::Filled
                },
                fill_price: if rejected { Decimal::ZERO } else { dec!(100) },
                filled_quantity: if rejected { 0 } else { request.quantity },
                timestamp: Utc::now(),
            }
        }
    }

    #[async_trait]
    impl OrderRouter for ScriptedRouter {
        async fn place_order(&self, request: &OrderRequest) -> Result<FillReport> {
            Ok(self.report_for(request))
        }

        async fn place_batch(&self, batch: &BatchOrderRequest) -> Result<Vec<FillReport>> {
            Ok(batch.orders.iter().map(|o| self.report_for(o)).collect())
        }

        async fn cancel_order(&self, order_id: &str) -> Result<()> {
            self.cancelled.lock().unwrap().push(order_id.to_string());
            Ok(())
        }
    }

    fn leg(instrument: &str, side: OrderSide) -> OrderLeg {
        OrderLeg {
            instrument: instrument.to_string(),
            strike: dec!(24500),
            right: OptionRight::Call,
            expiry: chrono::NaiveDate::from_ymd_opt(2024, 9, 26).unwrap(),
            side,
            quantity: 25,
            price: dec!(100),
            greeks: None,
        }
    }

    fn four_legs() -> Vec<OrderLeg> {
        vec![
            leg("LEG-A", OrderSide::Sell),
            leg("LEG-B", OrderSide::Sell),
            leg("LEG-C", OrderSide::Buy),
            leg("LEG-D", OrderSide::Buy),
        ]
    }

    #[tokio::test]
    async fn full_fill_opens_position() {
        let router = Arc::new(ScriptedRouter::new(&[]));
        let coordinator = ExecutionCoordinator::new(router, PartialFillPolicy::CancelFilled);
        let outcome = coordinator.execute_entry(&four_legs()).await.unwrap();
        assert!(outcome.opens_position());
        assert_eq!(outcome.kept_legs().len(), 4);
        // Kept legs are repriced at the fill.
        assert!(outcome.kept_legs().iter().all(|l| l.price == dec!(100)));
    }

    #[tokio::test]
    async fn cancel_filled_unwinds_partial_four_leg_batch() {
        // 2 of 4 legs fill; cancel-filled must cancel both and abandon.
        let router = Arc::new(ScriptedRouter::new(&["LEG-C", "LEG-D"]));
        let coordinator =
            ExecutionCoordinator::new(router.clone(), PartialFillPolicy::CancelFilled);
        let outcome = coordinator.execute_entry(&four_legs()).await.unwrap();
        assert!(!outcome.opens_position());
        assert_eq!(outcome.kept_legs().len(), 0);
        assert_eq!(router.cancelled.lock().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn keep_filled_retains_exactly_the_filled_legs() {
        let router = Arc::new(ScriptedRouter::new(&["LEG-C", "LEG-D"]));
        let coordinator = ExecutionCoordinator::new(router.clone(), PartialFillPolicy::KeepFilled);
        let outcome = coordinator.execute_entry(&four_legs()).await.unwrap();
        assert!(outcome.opens_position());
        let kept = outcome.kept_legs();
        assert_eq!(kept.len(), 2);
        assert!(kept.iter().all(|l| l.instrument != "LEG-C" && l.instrument != "LEG-D"));
        assert!(router.cancelled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn single_leg_skips_batching() {
        let router = Arc::new(ScriptedRouter::new(&[]));
        let coordinator = ExecutionCoordinator::new(router, PartialFillPolicy::CancelFilled);
        let outcome = coordinator
            .execute_entry(&[leg("LEG-A", OrderSide::Buy)])
            .await
            .unwrap();
        assert!(matches!(outcome, ExecutionOutcome::Filled(ref f) if f.len() == 1));
    }

    #[tokio::test]
    async fn all_rejected_abandons_without_cancels() {
        let router = Arc::new(ScriptedRouter::new(&["LEG-A", "LEG-B", "LEG-C", "LEG-D"]));
        let coordinator =
            ExecutionCoordinator::new(router.clone(), PartialFillPolicy::CancelFilled);
        let outcome = coordinator.execute_entry(&four_legs()).await.unwrap();
        assert!(!outcome.opens_position());
        assert!(router.cancelled.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn exit_flips_leg_sides() {
        struct CaptureRouter(Mutex<Vec<OrderSide>>);

        #[async_trait]
        impl OrderRouter for CaptureRouter {
            async fn place_order(&self, request: &OrderRequest) -> Result<FillReport> {
                self.0.lock().unwrap().push(request.side);
                Ok(FillReport {
                    correlation_id: request.correlation_id.clone(),
                    order_id: "ord-1".to_string(),
                    status: FillStatus::Filled,
                    fill_price: dec!(90),
                    filled_quantity: request.quantity,
                    timestamp: Utc::now(),
                })
            }

            async fn place_batch(&self, _batch: &BatchOrderRequest) -> Result<Vec<FillReport>> {
                unimplemented!("exits never batch")
            }

            async fn cancel_order(&self, _order_id: &str) -> Result<()> {
                Ok(())
            }
        }

        let router = Arc::new(CaptureRouter(Mutex::new(Vec::new())));
        let coordinator = ExecutionCoordinator::new(router.clone(), PartialFillPolicy::KeepFilled);
        let legs = vec![leg("LEG-A", OrderSide::Sell), leg("LEG-B", OrderSide::Buy)];
        coordinator.execute_exit(&legs).await.unwrap();
        assert_eq!(
            *router.0.lock().unwrap(),
            vec![OrderSide::Buy, OrderSide::Sell]
        );
    }
}
