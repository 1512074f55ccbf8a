//! Published debug values.
//!
//! Collaborators publish named getters; the debug server evaluates all of
//! them on every `/debug/vars` request.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;

type Getter = Arc<dyn Fn() -> Value + Send + Sync>;

/// Concurrent registry of named value getters.
#[derive(Clone, Default)]
pub struct DebugParams {
    getters: Arc<DashMap<String, Getter>>,
}

impl DebugParams {
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish `getter` under `name`, replacing any previous getter.
    pub fn publish<F, T>(&self, name: impl Into<String>, getter: F)
    where
        F: Fn() -> T + Send + Sync + 'static,
        T: Serialize,
    {
        let getter: Getter = Arc::new(move || {
            serde_json::to_value(getter())
                .unwrap_or_else(|e| serde_json::json!({ "error": e.to_string() }))
        });
        self.getters.insert(name.into(), getter);
    }

    /// Remove a published value. Returns false when it was not published.
    pub fn remove(&self, name: &str) -> bool {
        self.getters.remove(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.getters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.getters.is_empty()
    }

    /// Evaluate every getter, ordered by name.
    pub fn snapshot(&self) -> BTreeMap<String, Value> {
        // Clone the getters out first so no shard lock is held while they run.
        let getters: Vec<(String, Getter)> = self
            .getters
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        getters
            .into_iter()
            .map(|(name, getter)| (name, getter()))
            .collect()
    }
}

impl std::fmt::Debug for DebugParams {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DebugParams")
            .field("published", &self.getters.len())
            .finish()
    }
}
