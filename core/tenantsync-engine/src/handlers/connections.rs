use crate::context::{AssetContext, ContextDelta, CLIENT_IDS};
use crate::error::{DeployError, DeployResult};
use crate::handler::{describe, desired_records, existing_records, reconcile, ResourceHandler, RunScope};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeSet;
use tenantsync_types::{Asset, FieldSpec, HandlerDescriptor, Priority, ResourceSchema};

pub const CONNECTIONS: &str = "connections";
const ENABLED_CLIENTS: &str = "enabled_clients";

/// Identity provider connections. `enabled_clients` may name clients; names
/// are swapped for client ids published by the clients handler.
pub struct ConnectionsHandler {
    descriptor: HandlerDescriptor,
}

impl ConnectionsHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new(CONNECTIONS, "id")
                .strip_on_update(&["id", "name", "strategy"])
                .with_priority(Priority::uniform(60)),
        }
    }

    /// Resolves client names in `enabled_clients`. Values that already are
    /// known client ids pass through. Without a `clientIds` entry in the
    /// context (clients not configured) the lists are sent as given.
    fn resolve_clients(&self, connections: Vec<Asset>, ctx: &AssetContext) -> DeployResult<Vec<Asset>> {
        if ctx.get(CLIENT_IDS).is_none() {
            return Ok(connections);
        }
        let ids = ctx.client_ids();
        let known: BTreeSet<&str> = ids.values().map(String::as_str).collect();

        connections
            .into_iter()
            .map(|mut connection| {
                let Some(Value::Array(clients)) = connection.get(ENABLED_CLIENTS) else {
                    return Ok(connection);
                };
                let resolved = clients
                    .iter()
                    .map(|client| {
                        let name = client.as_str().unwrap_or_default();
                        if let Some(id) = ids.get(name) {
                            Ok(Value::String(id.clone()))
                        } else if known.contains(name) {
                            Ok(client.clone())
                        } else {
                            Err(DeployError::invalid_assets(
                                CONNECTIONS,
                                format!(
                                    "{} enables unknown client {client}",
                                    describe(&self.descriptor, &connection)
                                ),
                            ))
                        }
                    })
                    .collect::<DeployResult<Vec<_>>>()?;
                connection.insert(ENABLED_CLIENTS, Value::Array(resolved));
                Ok(connection)
            })
            .collect()
    }
}

impl Default for ConnectionsHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceHandler for ConnectionsHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::array(
            CONNECTIONS,
            vec![
                FieldSpec::string("name").required(),
                FieldSpec::string("strategy").required(),
                FieldSpec::string("display_name"),
                FieldSpec::array(ENABLED_CLIENTS),
                FieldSpec::object("options"),
                FieldSpec::bool("is_domain_connection"),
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
        let desired = self.resolve_clients(desired, ctx)?;
        let Some(existing) = existing_records(self, scope).await? else {
            return Ok(ContextDelta::new());
        };
        reconcile(&self.descriptor, desired, existing, scope).await?;
        Ok(ContextDelta::new())
    }
}
