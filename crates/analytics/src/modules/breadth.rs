//! Advance/decline breadth across the tracked instruments.

use std::collections::HashMap;

use crate::context::{BreadthContext, ModuleContext};
use crate::registry::AnalyticsModule;
use crate::update::{keys, AnalyticsUpdate};

struct InstrumentState {
    session_open: f64,
    last: f64,
}

/// Counts instruments trading above/below their first observed price of the
/// session. The universe is whatever the engine has fed a price for.
#[derive(Default)]
pub struct BreadthTracker {
    instruments: HashMap<String, InstrumentState>,
}

impl BreadthTracker {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

impl AnalyticsModule for BreadthTracker {
    fn name(&self) -> &str {
        "breadth"
    }

    fn update(&mut self, update: &AnalyticsUpdate) {
        let (Some(instrument), Some(price)) =
            (update.instrument.as_deref(), update.scalar(keys::PRICE))
        else {
            return;
        };
        if price <= 0.0 {
            return;
        }

        self.instruments
            .entry(instrument.to_string())
            .and_modify(|state| state.last = price)
            .or_insert(InstrumentState {
                session_open: price,
                last: price,
            });
    }

    fn context(&self) -> ModuleContext {
        let mut advancing = 0;
        let mut declining = 0;
        let mut unchanged = 0;

        for state in self.instruments.values() {
            if state.last > state.session_open {
                advancing += 1;
            } else if state.last < state.session_open {
                declining += 1;
            } else {
                unchanged += 1;
            }
        }

        let moved = advancing + declining;
        let breadth_ratio = if moved == 0 {
            0.5
        } else {
            advancing as f64 / moved as f64
        };

        ModuleContext::Breadth(BreadthContext {
            advancing,
            declining,
            unchanged,
            breadth_ratio,
            ready: !self.instruments.is_empty(),
        })
    }

    fn reset(&mut self) {
        self.instruments.clear();
    }
}
