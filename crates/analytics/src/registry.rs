//! Name-keyed registry of analytics modules.
//!
//! Modules are independent: no shared mutable state, individually
//! enabled/disabled, and a failure in one never blocks the others.

use std::collections::HashMap;

use crate::context::{AnalyticsSnapshot, ModuleContext};
use crate::update::AnalyticsUpdate;

/// Capability interface every analytics module implements.
///
/// `update` consumes only the keys the module recognizes; `context` never
/// fails and returns neutral defaults while the module is cold.
pub trait AnalyticsModule: Send {
    fn name(&self) -> &str;

    fn update(&mut self, update: &AnalyticsUpdate);

    fn context(&self) -> ModuleContext;

    fn reset(&mut self);

    /// Serialized state to persist across restarts. Stateless modules keep
    /// the default `None`.
    fn checkpoint(&self) -> Option<serde_json::Value> {
        None
    }

    /// Restores state saved by `checkpoint`. Malformed payloads are ignored;
    /// the module just starts cold.
    fn restore(&mut self, _state: serde_json::Value) {}
}

struct Entry {
    module: Box<dyn AnalyticsModule>,
    enabled: bool,
}

/// Orchestrator over the module set; addable without touching callers.
#[derive(Default)]
pub struct AnalyticsRegistry {
    modules: HashMap<String, Entry>,
}

impl AnalyticsRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            modules: HashMap::new(),
        }
    }

    /// Registers a module, replacing any existing module of the same name.
    pub fn register(&mut self, module: Box<dyn AnalyticsModule>) {
        let name = module.name().to_string();
        self.modules.insert(
            name,
            Entry {
                module,
                enabled: true,
            },
        );
    }

    /// Enables or disables a module by name. Returns false if unknown.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.modules.get_mut(name) {
            Some(entry) => {
                entry.enabled = enabled;
                true
            }
            None => false,
        }
    }

    #[must_use]
    pub fn is_enabled(&self, name: &str) -> bool {
        self.modules.get(name).is_some_and(|e| e.enabled)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.modules.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.modules.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Feeds the update to every enabled module.
    pub fn update_all(&mut self, update: &AnalyticsUpdate) {
        for entry in self.modules.values_mut() {
            if entry.enabled {
                entry.module.update(update);
            }
        }
    }

    /// Merges enabled modules' contexts into one snapshot.
    #[must_use]
    pub fn snapshot(&self) -> AnalyticsSnapshot {
        let mut snapshot = AnalyticsSnapshot::default();
        for (name, entry) in &self.modules {
            if entry.enabled {
                snapshot
                    .contexts
                    .insert(name.clone(), entry.module.context());
            }
        }
        snapshot
    }

    /// Resets every module to its cold state (session roll).
    pub fn reset_all(&mut self) {
        for entry in self.modules.values_mut() {
            entry.module.reset();
        }
    }

    /// Mutable access for checkpoint restore.
    pub fn get_mut(&mut self, name: &str) -> Option<&mut Box<dyn AnalyticsModule>> {
        self.modules.get_mut(name).map(|e| &mut e.module)
    }

    /// Module-name -> state for every module that persists anything.
    #[must_use]
    pub fn checkpoints(&self) -> HashMap<String, serde_json::Value> {
        self.modules
            .iter()
            .filter_map(|(name, entry)| Some((name.clone(), entry.module.checkpoint()?)))
            .collect()
    }

    /// Hands each saved state back to its module. Unknown names are skipped.
    pub fn restore_checkpoints(&mut self, states: HashMap<String, serde_json::Value>) {
        for (name, state) in states {
            if let Some(entry) = self.modules.get_mut(&name) {
                entry.module.restore(state);
            }
        }
    }
}

impl std::fmt::Debug for AnalyticsRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AnalyticsRegistry")
            .field("modules", &self.names())
            .finish()
    }
}
