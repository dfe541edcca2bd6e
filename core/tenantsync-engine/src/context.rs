//! Run-scoped context threaded between handlers.
//!
//! Handlers never mutate the context. Each stage function returns a
//! [`ContextDelta`] and the orchestrator folds it into a new
//! [`AssetContext`] before the next handler runs.

use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;
use tenantsync_types::AssetCollections;

/// Context key holding the client name → client id map.
pub const CLIENT_IDS: &str = "clientIds";

/// Entries one handler contributes to the context.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ContextDelta(BTreeMap<String, Value>);

impl ContextDelta {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }
}

/// The desired assets plus everything earlier handlers contributed.
#[derive(Debug, Clone)]
pub struct AssetContext {
    assets: Arc<AssetCollections>,
    entries: BTreeMap<String, Value>,
}

impl AssetContext {
    pub fn new(assets: AssetCollections) -> Self {
        Self {
            assets: Arc::new(assets),
            entries: BTreeMap::new(),
        }
    }

    /// The caller's desired configuration.
    pub fn assets(&self) -> &AssetCollections {
        &self.assets
    }

    /// A contributed entry.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.entries.get(key)
    }

    /// Client name → client id, as contributed by the clients handler.
    pub fn client_ids(&self) -> BTreeMap<String, String> {
        match self.entries.get(CLIENT_IDS) {
            Some(Value::Object(map)) => map
                .iter()
                .filter_map(|(name, id)| id.as_str().map(|id| (name.clone(), id.to_string())))
                .collect(),
            _ => BTreeMap::new(),
        }
    }

    /// Returns a new context with `delta` applied.
    ///
    /// Object entries are merged key by key so several handlers can
    /// contribute to one map; any other value replaces the previous one.
    #[must_use]
    pub fn fold(&self, delta: ContextDelta) -> Self {
        let mut entries = self.entries.clone();
        for (key, value) in delta.0 {
            match (entries.get_mut(&key), value) {
                (Some(Value::Object(current)), Value::Object(update)) => current.extend(update),
                (_, value) => {
                    entries.insert(key, value);
                }
            }
        }
        Self {
            assets: Arc::clone(&self.assets),
            entries,
        }
    }
}
