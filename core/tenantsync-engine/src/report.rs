//! Run accounting: per-type counters, the action log, warnings.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Mutex, PoisonError};
use tracing::{info, warn};

/// What happened to one resource type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeCounts {
    pub created: usize,
    pub updated: usize,
    pub deleted: usize,
}

/// Serialisable snapshot of a finished (or aborted) run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub counts: BTreeMap<String, TypeCounts>,
    /// Human-readable actions in the order they completed.
    pub actions: Vec<String>,
    pub warnings: Vec<String>,
}

impl RunSummary {
    /// Counts for one type; zero when nothing happened to it.
    pub fn counts_for(&self, resource_type: &str) -> TypeCounts {
        self.counts.get(resource_type).copied().unwrap_or_default()
    }
}

/// Collects results while handlers run concurrently inside a phase.
#[derive(Debug, Default)]
pub struct RunReport {
    state: Mutex<RunSummary>,
}

impl RunReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn created(&self, resource_type: &str, item: &str) {
        self.record(resource_type, format!("Created [{resource_type}] {item}"), |c| {
            c.created += 1;
        });
    }

    pub fn updated(&self, resource_type: &str, item: &str) {
        self.record(resource_type, format!("Updated [{resource_type}] {item}"), |c| {
            c.updated += 1;
        });
    }

    pub fn deleted(&self, resource_type: &str, item: &str) {
        self.record(resource_type, format!("Deleted [{resource_type}] {item}"), |c| {
            c.deleted += 1;
        });
    }

    /// Logs a temporary rename. Renames are not counted.
    pub fn renamed(&self, resource_type: &str, item: &str) {
        let action = format!("Renamed [{resource_type}] {item}");
        info!("{action}");
        self.lock().actions.push(action);
    }

    /// Adds a non-fatal warning.
    pub fn warn(&self, message: impl Into<String>) {
        let message = message.into();
        warn!("{message}");
        self.lock().warnings.push(message);
    }

    /// A copy of everything recorded so far.
    pub fn summary(&self) -> RunSummary {
        self.lock().clone()
    }

    fn record(&self, resource_type: &str, action: String, bump: impl FnOnce(&mut TypeCounts)) {
        info!("{action}");
        let mut state = self.lock();
        bump(state.counts.entry(resource_type.to_string()).or_default());
        state.actions.push(action);
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, RunSummary> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
