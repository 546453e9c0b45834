//! Evaluator orchestration: one pass, one resulting signal.

use strike_core::{ConfidenceModel, SessionConfig};
use tracing::{debug, info};

use crate::gates;
use crate::signal::{SignalAction, SignalEvaluator, SignalInputs, TradeSignal};

/// Runs every registered evaluator over the same inputs and keeps the most
/// confident Enter. Everything-held passes produce one Hold whose reasoning
/// joins each evaluator's blocked gate.
pub struct ConfluenceEngine {
    session: SessionConfig,
    evaluators: Vec<Box<dyn SignalEvaluator>>,
    confidence_model: Option<Box<dyn ConfidenceModel>>,
}

impl ConfluenceEngine {
    #[must_use]
    pub fn new(session: SessionConfig) -> Self {
        Self {
            session,
            evaluators: Vec::new(),
            confidence_model: None,
        }
    }

    pub fn register(&mut self, evaluator: Box<dyn SignalEvaluator>) {
        debug!(strategy = evaluator.name(), "registered signal evaluator");
        self.evaluators.push(evaluator);
    }

    /// Confidence model is optional; without one, raw evaluator confidence
    /// passes through untouched.
    pub fn set_confidence_model(&mut self, model: Box<dyn ConfidenceModel>) {
        self.confidence_model = Some(model);
    }

    #[must_use]
    pub fn evaluator_names(&self) -> Vec<&'static str> {
        self.evaluators.iter().map(|e| e.name()).collect()
    }

    /// One decision pass. The session gate short-circuits every evaluator;
    /// otherwise the best Enter wins and its confidence is blended with the
    /// model's win probability. The model adjusts, it never blocks.
    #[must_use]
    pub fn evaluate(&self, inputs: &SignalInputs<'_>) -> TradeSignal {
        if let Err(reason) = gates::session_window(inputs.timestamp, &self.session) {
            return TradeSignal::hold("confluence", reason);
        }

        let mut best_enter: Option<TradeSignal> = None;
        let mut hold_reasons: Vec<String> = Vec::new();

        for evaluator in &self.evaluators {
            let signal = evaluator.generate_signal(inputs);
            match signal.action {
                SignalAction::Enter => {
                    let better = best_enter
                        .as_ref()
                        .map_or(true, |current| signal.confidence > current.confidence);
                    if better {
                        best_enter = Some(signal);
                    }
                }
                SignalAction::Hold => {
                    hold_reasons.push(format!("{}: {}", signal.strategy, signal.reasoning));
                }
                SignalAction::Adjust => {
                    // Adjustments from a fresh-entry pass take precedence
                    // over a competing entry; open exposure comes first.
                    return signal;
                }
            }
        }

        match best_enter {
            Some(mut signal) => {
                if let Some(model) = &self.confidence_model {
                    if let Some(win_prob) = model.win_probability(&signal.features) {
                        let blended = (signal.confidence + win_prob) / 2.0;
                        debug!(
                            strategy = %signal.strategy,
                            base = signal.confidence,
                            win_prob,
                            blended,
                            "confidence adjusted by model"
                        );
                        signal.confidence = blended.clamp(0.0, 1.0);
                    }
                }
                info!(
                    strategy = %signal.strategy,
                    confidence = signal.confidence,
                    legs = signal.legs.len(),
                    "entry signal selected"
                );
                signal
            }
            None => TradeSignal::hold("confluence", hold_reasons.join("; ")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signal::RiskClass;
    use chrono::{TimeZone, Utc};
    use strike_analytics::AnalyticsSnapshot;
    use strike_core::AppConfig;
    use strike_indicators::IndicatorView;

    struct Fixed {
        name: &'static str,
        signal_confidence: Option<f64>,
    }

    impl SignalEvaluator for Fixed {
        fn name(&self) -> &'static str {
            self.name
        }

        fn risk_class(&self) -> RiskClass {
            RiskClass::Defined
        }

        fn generate_signal(&self, inputs: &SignalInputs<'_>) -> TradeSignal {
            match self.signal_confidence {
                Some(confidence) => TradeSignal {
                    action: SignalAction::Enter,
                    strategy: self.name.to_string(),
                    legs: Vec::new(),
                    reasoning: "test entry".to_string(),
                    confidence,
                    max_risk: None,
                    max_reward: None,
                    features: inputs.feature_vector(),
                },
                None => TradeSignal::hold(self.name, "blocked gate"),
            }
        }
    }

    struct HalfModel;

    impl strike_core::ConfidenceModel for HalfModel {
        fn win_probability(&self, _features: &[f64]) -> Option<f64> {
            Some(0.9)
        }
    }

    fn mid_session() -> chrono::DateTime<Utc> {
        // 10:30 IST
        Utc.with_ymd_and_hms(2024, 9, 2, 5, 0, 0).unwrap()
    }

    fn run(engine: &ConfluenceEngine, at: chrono::DateTime<Utc>) -> TradeSignal {
        let cfg = AppConfig::default().strategy;
        let view = IndicatorView::empty();
        let snap = AnalyticsSnapshot::default();
        let inputs = SignalInputs {
            timestamp: at,
            spot: 24_500.0,
            chain: &[],
            indicators: &view,
            analytics: &snap,
            config: &cfg,
            lot_size: 25,
        };
        engine.evaluate(&inputs)
    }

    #[test]
    fn most_confident_entry_wins() {
        let mut engine = ConfluenceEngine::new(AppConfig::default().session);
        engine.register(Box::new(Fixed { name: "a", signal_confidence: Some(0.4) }));
        engine.register(Box::new(Fixed { name: "b", signal_confidence: Some(0.7) }));
        let signal = run(&engine, mid_session());
        assert_eq!(signal.action, SignalAction::Enter);
        assert_eq!(signal.strategy, "b");
    }

    #[test]
    fn all_holds_join_reasons() {
        let mut engine = ConfluenceEngine::new(AppConfig::default().session);
        engine.register(Box::new(Fixed { name: "a", signal_confidence: None }));
        engine.register(Box::new(Fixed { name: "b", signal_confidence: None }));
        let signal = run(&engine, mid_session());
        assert_eq!(signal.action, SignalAction::Hold);
        assert!(signal.reasoning.contains("a: blocked gate"));
        assert!(signal.reasoning.contains("b: blocked gate"));
    }

    #[test]
    fn session_gate_short_circuits() {
        let mut engine = ConfluenceEngine::new(AppConfig::default().session);
        engine.register(Box::new(Fixed { name: "a", signal_confidence: Some(0.9) }));
        // 02:00 IST, hours before the open.
        let pre_open = Utc.with_ymd_and_hms(2024, 9, 1, 20, 30, 0).unwrap();
        let signal = run(&engine, pre_open);
        assert_eq!(signal.action, SignalAction::Hold);
        assert!(signal.reasoning.contains("session"));
    }

    #[test]
    fn model_blends_confidence_without_gating() {
        let mut engine = ConfluenceEngine::new(AppConfig::default().session);
        engine.register(Box::new(Fixed { name: "a", signal_confidence: Some(0.5) }));
        engine.set_confidence_model(Box::new(HalfModel));
        let signal = run(&engine, mid_session());
        assert_eq!(signal.action, SignalAction::Enter);
        assert!((signal.confidence - 0.7).abs() < 1e-9);
    }
}
