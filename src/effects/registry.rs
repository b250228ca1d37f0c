//! Active-effects registry

use serde::Serialize;
use std::collections::HashMap;
use std::sync::Mutex;

/// A currently active effect with its strongly-typed parameter snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "effect", rename_all = "camelCase")]
pub enum ActiveEffect {
    #[serde(rename_all = "camelCase")]
    NoiseSuppression { level: f32 },
    #[serde(rename_all = "camelCase")]
    BackgroundBlur { amount: f32 },
    #[serde(rename_all = "camelCase")]
    VirtualBackground { source: String },
}

impl ActiveEffect {
    /// Registry key; one entry per effect name
    pub fn name(&self) -> &'static str {
        match self {
            ActiveEffect::NoiseSuppression { .. } => "noiseSuppression",
            ActiveEffect::BackgroundBlur { .. } => "backgroundBlur",
            ActiveEffect::VirtualBackground { .. } => "virtualBackground",
        }
    }
}

/// Tracks which effects are active.
///
/// Insertion order is irrelevant; the registry only answers "is anything
/// active" and "what is active".
#[derive(Debug, Default)]
pub struct ActiveEffectsRegistry {
    entries: Mutex<HashMap<&'static str, ActiveEffect>>,
}

impl ActiveEffectsRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an effect, overwriting any prior entry under the same name
    pub fn record(&self, effect: ActiveEffect) {
        self.entries.lock().unwrap().insert(effect.name(), effect);
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }

    /// Snapshot of the active effects. Name-sorted purely for stability
    /// within a single call.
    pub fn snapshot(&self) -> Vec<(&'static str, ActiveEffect)> {
        let mut entries: Vec<_> = self
            .entries
            .lock()
            .unwrap()
            .iter()
            .map(|(name, effect)| (*name, effect.clone()))
            .collect();
        entries.sort_by_key(|(name, _)| *name);
        entries
    }
}
