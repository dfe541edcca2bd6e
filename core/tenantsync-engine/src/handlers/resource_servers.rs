use crate::context::{AssetContext, ContextDelta};
use crate::error::{DeployError, DeployResult};
use crate::handler::{check_duplicates, desired_records, existing_records, reconcile, ResourceHandler, RunScope};
use async_trait::async_trait;
use tenantsync_types::{
    ExistingRecord, FieldSpec, HandlerDescriptor, Identifier, Policy, Priority, ResourceSchema,
};

pub const RESOURCE_SERVERS: &str = "resourceServers";

/// APIs (resource servers), matched by id then by their audience
/// `identifier`. The management API itself and system servers are left
/// alone.
pub struct ResourceServersHandler {
    descriptor: HandlerDescriptor,
}

impl ResourceServersHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new(RESOURCE_SERVERS, "id")
                .with_path("resource-servers")
                .with_collection_key("resource_servers")
                .with_identifiers(vec![Identifier::field("id"), Identifier::field("identifier")])
                .strip_on_update(&["id", "identifier"])
                .with_priority(Priority::uniform(Priority::DEFAULT)),
        }
    }
}

impl Default for ResourceServersHandler {
    fn default() -> Self {
        Self::new()
    }
}

fn is_managed(server: &ExistingRecord, management_audience: Option<&str>) -> bool {
    if server.get_bool("is_system") == Some(true) {
        return false;
    }
    management_audience.is_none_or(|audience| server.get_str("identifier") != Some(audience))
}

#[async_trait]
impl ResourceHandler for ResourceServersHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::array(
            RESOURCE_SERVERS,
            vec![
                FieldSpec::string("name").required(),
                FieldSpec::string("identifier").required(),
                FieldSpec::array("scopes"),
                FieldSpec::enumeration("signing_alg", &["HS256", "RS256", "PS256"]),
                FieldSpec::integer("token_lifetime"),
                FieldSpec::bool("allow_offline_access"),
                FieldSpec::bool("skip_consent_for_verifiable_first_party_clients"),
            ],
        )
    }

    async fn validate(
        &self,
        scope: &RunScope<'_>,
        ctx: &AssetContext,
    ) -> DeployResult<ContextDelta> {
        let Some(servers) = desired_records(&self.descriptor, ctx)? else {
            return Ok(ContextDelta::new());
        };
        check_duplicates(&self.descriptor, &servers)?;

        if let Some(audience) = scope.policy.string(Policy::MANAGEMENT_AUDIENCE)
            && servers.iter().any(|s| s.get_str("identifier") == Some(audience))
        {
            return Err(DeployError::validation(
                RESOURCE_SERVERS,
                format!("The management API ({audience}) can not be configured"),
            ));
        }
        Ok(ContextDelta::new())
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

        let audience = scope.policy.string(Policy::MANAGEMENT_AUDIENCE);
        let existing = existing
            .into_iter()
            .filter(|s| is_managed(s, audience))
            .collect();
        reconcile(&self.descriptor, desired, existing, scope).await?;
        Ok(ContextDelta::new())
    }
}
