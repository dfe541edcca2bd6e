use crate::context::{AssetContext, ContextDelta, CLIENT_IDS};
use crate::error::DeployResult;
use crate::handler::{desired_records, existing_records, reconcile, ResourceHandler, RunScope};
use async_trait::async_trait;
use serde_json::{Map, Value};
use std::collections::BTreeSet;
use tenantsync_types::{ExistingRecord, FieldSpec, HandlerDescriptor, Policy, Priority, ResourceSchema};
use tracing::debug;

pub const CLIENTS: &str = "clients";

/// Applications. Publishes `clientIds` (name → client_id) for handlers
/// that reference clients by name.
pub struct ClientsHandler {
    descriptor: HandlerDescriptor,
}

impl ClientsHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new(CLIENTS, "client_id")
                .strip_on_update(&["client_id", "client_secret"])
                .with_priority(Priority::uniform(Priority::DEFAULT)),
        }
    }
}

impl Default for ClientsHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// The deploying client and the tenant-global client are never touched.
fn is_managed(client: &ExistingRecord, deploying: Option<&str>) -> bool {
    if client.get_bool("global") == Some(true) {
        return false;
    }
    deploying.is_none_or(|id| client.get_str("client_id") != Some(id))
}

#[async_trait]
impl ResourceHandler for ClientsHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::array(
            CLIENTS,
            vec![
                FieldSpec::string("name").required(),
                FieldSpec::enumeration(
                    "app_type",
                    &["native", "spa", "regular_web", "non_interactive"],
                ),
                FieldSpec::string("description"),
                FieldSpec::array("callbacks"),
                FieldSpec::array("allowed_origins"),
                FieldSpec::array("grant_types"),
                FieldSpec::bool("is_first_party"),
            ],
        )
    }

    async fn process_changes(
        &self,
        scope: &RunScope<'_>,
        ctx: &AssetContext,
    ) -> DeployResult<ContextDelta> {
        let Some(desired) = desired_records(&self.descriptor, ctx)? else {
            return Ok(ContextDelta::new());
        };
        let Some(existing) = existing_records(self, scope).await? else {
            return Ok(ContextDelta::new());
        };

        let deploying = scope.policy.string(Policy::CLIENT_ID);
        let managed = existing
            .iter()
            .filter(|c| is_managed(c, deploying))
            .cloned()
            .collect();
        let applied = reconcile(&self.descriptor, desired, managed, scope).await?;

        let deleted: BTreeSet<&str> = applied
            .deleted
            .iter()
            .filter_map(|c| c.get_str("client_id"))
            .collect();
        let mut ids = Map::new();
        for client in existing.iter().chain(&applied.created).chain(&applied.updated) {
            if let (Some(name), Some(id)) = (client.get_str("name"), client.get_str("client_id"))
                && !deleted.contains(id)
            {
                ids.insert(name.to_string(), Value::String(id.to_string()));
            }
        }
        debug!(count = ids.len(), "Publishing client ids");
        Ok(ContextDelta::new().with(CLIENT_IDS, Value::Object(ids)))
    }
}
