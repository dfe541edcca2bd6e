//! The resource handler contract and the helpers handlers compose.
//!
//! A handler owns one resource type. The orchestrator calls `validate` for
//! every handler, then `process_changes`. The free functions below carry the
//! shared behaviour: fetching and caching remote state, duplicate checks,
//! diffing, and applying a change set in four sequential phases (delete,
//! rename, create, update), each phase fanned out through the run's pool.

use crate::changes::{ChangeCalculator, ChangeSet};
use crate::context::{AssetContext, ContextDelta};
use crate::error::{DeployError, DeployResult};
use crate::report::RunReport;
use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, PoisonError};
use tenantsync_api::{ApiError, Gateway};
use tenantsync_types::{
    is_truthy, Asset, ExistingRecord, HandlerDescriptor, Policy, Record, ResourceSchema,
};
use tokio::sync::OnceCell;
use tracing::{debug, info, warn};

/// Remote state of one resource type.
#[derive(Debug, Clone, PartialEq)]
pub enum Existing {
    Records(Vec<ExistingRecord>),
    /// Listing failed with 404 or 501: the tenant predates the feature.
    Unsupported { status: u16 },
}

/// Run-wide collaborators handed to every stage call.
#[derive(Clone, Copy)]
pub struct RunScope<'a> {
    pub gateway: &'a Gateway,
    pub policy: &'a Policy,
    pub report: &'a RunReport,
    /// Remote state fetched so far in this run.
    pub existing: &'a ExistingCache,
}

/// Everything one run accumulates. A fresh state means a fresh fetch of
/// every resource type.
#[derive(Debug, Default)]
pub struct RunState {
    pub report: RunReport,
    pub existing: ExistingCache,
}

impl RunState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn scope<'a>(&'a self, gateway: &'a Gateway, policy: &'a Policy) -> RunScope<'a> {
        RunScope {
            gateway,
            policy,
            report: &self.report,
            existing: &self.existing,
        }
    }
}

/// One resource type's unit of work.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    fn descriptor(&self) -> &HandlerDescriptor;

    /// Declared shape of this type's assets, checked before any stage runs.
    fn schema(&self) -> ResourceSchema;

    /// Lists this type's remote records. Not cached; handlers go through
    /// [`existing_records`], which fetches at most once per run.
    async fn fetch_existing(&self, gateway: &Gateway) -> DeployResult<Existing> {
        fetch_records(self.descriptor(), gateway).await
    }

    /// Local checks on the desired records. Defaults to rejecting duplicate
    /// identifier values.
    async fn validate(
        &self,
        _scope: &RunScope<'_>,
        ctx: &AssetContext,
    ) -> DeployResult<ContextDelta> {
        if let Some(assets) = desired_records(self.descriptor(), ctx)? {
            check_duplicates(self.descriptor(), &assets)?;
        }
        Ok(ContextDelta::new())
    }

    /// Diffs and applies; returns what later handlers should see.
    async fn process_changes(
        &self,
        scope: &RunScope<'_>,
        ctx: &AssetContext,
    ) -> DeployResult<ContextDelta>;
}

/// Remote state per resource type, fetched at most once per run.
#[derive(Debug, Default)]
pub struct ExistingCache(Mutex<BTreeMap<String, Arc<OnceCell<Existing>>>>);

impl ExistingCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// The cached state of the handler's type, fetching it on first use.
    /// A failed fetch is not cached.
    pub async fn get_or_fetch<H: ResourceHandler + ?Sized>(
        &self,
        handler: &H,
        gateway: &Gateway,
    ) -> DeployResult<Existing> {
        let cell = self.cell(&handler.descriptor().resource_type);
        cell.get_or_try_init(|| handler.fetch_existing(gateway))
            .await
            .cloned()
    }

    fn cell(&self, resource_type: &str) -> Arc<OnceCell<Existing>> {
        let mut cells = self.0.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(cells.entry(resource_type.to_string()).or_default())
    }
}

/// Records actually written by [`apply_changes`], as the API returned them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Applied {
    pub deleted: Vec<ExistingRecord>,
    pub created: Vec<Record>,
    pub updated: Vec<Record>,
}

/// Lists every record of the descriptor's type.
pub async fn fetch_records(
    descriptor: &HandlerDescriptor,
    gateway: &Gateway,
) -> DeployResult<Existing> {
    let resource_type = descriptor.resource_type.as_str();
    let items = match gateway
        .get_all(&descriptor.path, &descriptor.collection_key, descriptor.paginate)
        .await
    {
        Ok(items) => items,
        Err(e) if e.is_unsupported() => {
            let status = e.status_code().unwrap_or(404);
            warn!(resource_type, status, "Not supported by this tenant");
            return Ok(Existing::Unsupported { status });
        }
        Err(source) => {
            return Err(DeployError::Fetch {
                resource_type: resource_type.to_string(),
                source,
            });
        }
    };

    let records = items
        .into_iter()
        .map(|item| {
            Record::try_from(item).map_err(|e| DeployError::Fetch {
                resource_type: resource_type.to_string(),
                source: ApiError::UnexpectedResponse(e.to_string()),
            })
        })
        .collect::<DeployResult<Vec<_>>>()?;
    debug!(resource_type, count = records.len(), "Fetched existing records");
    Ok(Existing::Records(records))
}

/// The handler's existing records as fetched once in this run, or `None`
/// when the tenant does not support the type and there is nothing to
/// reconcile.
pub async fn existing_records<H: ResourceHandler + ?Sized>(
    handler: &H,
    scope: &RunScope<'_>,
) -> DeployResult<Option<Vec<ExistingRecord>>> {
    match scope.existing.get_or_fetch(handler, scope.gateway).await? {
        Existing::Records(records) => Ok(Some(records)),
        Existing::Unsupported { status } => {
            info!(
                resource_type = %handler.descriptor().resource_type,
                status,
                "Skipping, nothing to reconcile"
            );
            Ok(None)
        }
    }
}

/// The desired records of the descriptor's type; `None` when the type is not
/// configured.
pub fn desired_records(
    descriptor: &HandlerDescriptor,
    ctx: &AssetContext,
) -> DeployResult<Option<Vec<Asset>>> {
    ctx.assets()
        .records(&descriptor.resource_type)
        .map_err(|e| DeployError::invalid_assets(&descriptor.resource_type, e.to_string()))
}

/// Rejects desired records sharing a value of any single-field identifier
/// or of the id field.
pub fn check_duplicates(descriptor: &HandlerDescriptor, assets: &[Asset]) -> DeployResult<()> {
    let mut fields: Vec<&str> = descriptor
        .identifiers
        .iter()
        .filter_map(|identifier| match identifier.fields() {
            [only] => Some(only.as_str()),
            _ => None,
        })
        .collect();
    if !fields.contains(&descriptor.id_field.as_str()) {
        fields.push(&descriptor.id_field);
    }

    for field in fields {
        let mut seen = BTreeSet::new();
        let mut duplicates = Vec::new();
        for value in assets.iter().filter_map(|a| a.get(field)).filter(|v| is_truthy(v)) {
            if !seen.insert(value.to_string()) {
                duplicates.push(value_text(value));
            }
        }
        if !duplicates.is_empty() {
            return Err(DeployError::validation(
                &descriptor.resource_type,
                format!(
                    "Multiple {} with the same {field} found: {}",
                    descriptor.resource_type,
                    duplicates.join(", ")
                ),
            ));
        }
    }
    Ok(())
}

/// Drops records whose `name` is in `names`.
pub fn exclude_named(records: Vec<Record>, names: &[String]) -> Vec<Record> {
    if names.is_empty() {
        return records;
    }
    records
        .into_iter()
        .filter(|r| !r.get_str("name").is_some_and(|n| names.iter().any(|x| x == n)))
        .collect()
}

/// Human-readable identity of a record: its identifier fields that are set,
/// e.g. `id: 1, name: A`.
pub fn describe(descriptor: &HandlerDescriptor, record: &Record) -> String {
    let mut fields: Vec<&str> = vec![descriptor.id_field.as_str()];
    for field in descriptor.identifiers.iter().flat_map(|i| i.fields()) {
        if !fields.contains(&field.as_str()) {
            fields.push(field);
        }
    }
    let parts: Vec<String> = fields
        .into_iter()
        .filter_map(|f| {
            record
                .get(f)
                .filter(|v| is_truthy(v))
                .map(|v| format!("{f}: {}", value_text(v)))
        })
        .collect();
    if parts.is_empty() {
        "(unidentified)".to_string()
    } else {
        parts.join(", ")
    }
}

/// The id used in update and delete calls.
pub fn record_id(descriptor: &HandlerDescriptor, record: &Record) -> DeployResult<String> {
    record
        .get(&descriptor.id_field)
        .filter(|v| is_truthy(v))
        .map(value_text)
        .ok_or_else(|| DeployError::MissingId {
            resource_type: descriptor.resource_type.clone(),
            item: describe(descriptor, record),
        })
}

/// Applies exclusions, diffs and applies. The usual body of
/// `process_changes` once the desired and existing records are known.
pub async fn reconcile(
    descriptor: &HandlerDescriptor,
    desired: Vec<Asset>,
    existing: Vec<ExistingRecord>,
    scope: &RunScope<'_>,
) -> DeployResult<Applied> {
    let resource_type = descriptor.resource_type.as_str();
    let excluded = scope.policy.excluded(resource_type);
    let desired = exclude_named(desired, &excluded);
    let existing = exclude_named(existing, &excluded);

    let changes = ChangeCalculator::new(&descriptor.identifiers)
        .carrying(&[descriptor.id_field.as_str()])
        .deletions_enabled(scope.policy.allows_delete(resource_type))
        .calculate(desired, existing);

    if changes.is_empty() {
        debug!(resource_type, "No changes");
        return Ok(Applied::default());
    }
    apply_changes(descriptor, changes, scope).await
}

/// Applies a change set: deletes, then conflict renames, then creates, then
/// updates. Each phase waits for the previous one; the first failed item
/// ends the run.
pub async fn apply_changes(
    descriptor: &HandlerDescriptor,
    changes: ChangeSet,
    scope: &RunScope<'_>,
) -> DeployResult<Applied> {
    let resource_type = descriptor.resource_type.as_str();
    let pool = scope.gateway.pool();
    info!(
        resource_type,
        delete = changes.delete.len(),
        rename = changes.conflicts.len(),
        create = changes.create.len(),
        update = changes.update.len(),
        "Applying changes"
    );

    let mut applied = Applied::default();

    if !changes.delete.is_empty() {
        if scope.policy.allows_delete(resource_type) {
            applied.deleted = pool
                .run_each(changes.delete, |record| delete_one(descriptor, scope, record))
                .await?;
        } else {
            let listing: Vec<String> = changes
                .delete
                .iter()
                .map(|r| describe(descriptor, r))
                .collect();
            scope.report.warn(format!(
                "Detected the following {resource_type} should be deleted. Doing so may be destructive.\n\
                 You can enable deletes by setting '{}' to true in the config\n{}",
                Policy::ALLOW_DELETE,
                listing.join("\n")
            ));
        }
    }

    pool.run_each(changes.conflicts, |record| rename_one(descriptor, scope, record))
        .await?;

    applied.created = pool
        .run_each(changes.create, |asset| create_one(descriptor, scope, asset))
        .await?;

    applied.updated = pool
        .run_each(changes.update, |asset| update_one(descriptor, scope, asset))
        .await?;

    Ok(applied)
}

async fn delete_one(
    descriptor: &HandlerDescriptor,
    scope: &RunScope<'_>,
    record: ExistingRecord,
) -> DeployResult<ExistingRecord> {
    let item = describe(descriptor, &record);
    let id = record_id(descriptor, &record)?;
    scope
        .gateway
        .delete(&descriptor.path, &id)
        .await
        .map_err(|source| operation_error(descriptor, "deleting", &item, source))?;
    scope.report.deleted(&descriptor.resource_type, &item);
    Ok(record)
}

async fn rename_one(
    descriptor: &HandlerDescriptor,
    scope: &RunScope<'_>,
    record: ExistingRecord,
) -> DeployResult<()> {
    let item = describe(descriptor, &record);
    let id = record_id(descriptor, &record)?;
    let payload = json!({ "name": record.get("name") });
    scope
        .gateway
        .update(&descriptor.path, &id, &payload)
        .await
        .map_err(|source| operation_error(descriptor, "renaming", &item, source))?;
    scope.report.renamed(&descriptor.resource_type, &item);
    Ok(())
}

async fn create_one(
    descriptor: &HandlerDescriptor,
    scope: &RunScope<'_>,
    asset: Asset,
) -> DeployResult<Record> {
    let item = describe(descriptor, &asset);
    let payload = asset.clone().into_value();
    let created = scope
        .gateway
        .create(&descriptor.path, &payload)
        .await
        .map_err(|source| operation_error(descriptor, "creating", &item, source))?;
    scope.report.created(&descriptor.resource_type, &item);
    Ok(stored_or(created, asset))
}

async fn update_one(
    descriptor: &HandlerDescriptor,
    scope: &RunScope<'_>,
    asset: Asset,
) -> DeployResult<Record> {
    let item = describe(descriptor, &asset);
    let id = record_id(descriptor, &asset)?;
    let payload = asset.without(&descriptor.strip_update_fields).into_value();
    let updated = scope
        .gateway
        .update(&descriptor.path, &id, &payload)
        .await
        .map_err(|source| operation_error(descriptor, "updating", &item, source))?;
    scope.report.updated(&descriptor.resource_type, &item);
    Ok(stored_or(updated, asset))
}

fn operation_error(
    descriptor: &HandlerDescriptor,
    verb: &str,
    item: &str,
    source: ApiError,
) -> DeployError {
    DeployError::Operation {
        resource_type: descriptor.resource_type.clone(),
        action: format!("Problem {verb} {} {item}", descriptor.resource_type),
        source,
    }
}

/// The API's representation when it returned an object, else what was sent.
fn stored_or(response: Value, sent: Asset) -> Record {
    Record::try_from(response).unwrap_or(sent)
}

/// Strings verbatim, anything else as JSON.
fn value_text(value: &Value) -> String {
    value
        .as_str()
        .map_or_else(|| value.to_string(), str::to_string)
}
