//! Reconciliation engine for tenantsync.
//!
//! Diffs a declarative configuration against a remote tenant and applies
//! the difference:
//!
//! - [`ChangeCalculator`]: pairs assets with existing records and partitions
//!   them into create / update / delete, plus temporary renames
//! - [`ResourceHandler`]: one resource type's fetch / validate / apply
//! - [`Orchestrator`]: schema check, then `validate` and `processChanges`
//!   over every handler in priority order, threading an [`AssetContext`]
//! - [`RunReport`]: counters, action log and warnings of a run
//!
//! Remote access (pagination, rate limits, the shared task pool) lives in
//! `tenantsync-api`.

mod changes;
mod config;
mod context;
mod error;
mod handler;
pub mod handlers;
mod orchestrator;
mod report;
mod validation;

pub use changes::{calculate_changes, ChangeCalculator, ChangeSet};
pub use config::DeployConfig;
pub use context::{AssetContext, ContextDelta, CLIENT_IDS};
pub use error::{DeployError, DeployResult};
pub use handler::{
    apply_changes, check_duplicates, describe, desired_records, exclude_named, existing_records,
    fetch_records, reconcile, record_id, Applied, Existing, ExistingCache, ResourceHandler,
    RunScope, RunState,
};
pub use orchestrator::Orchestrator;
pub use report::{RunReport, RunSummary, TypeCounts};
pub use validation::{check_schema, schema_violations};
