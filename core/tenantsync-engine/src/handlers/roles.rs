use crate::context::{AssetContext, ContextDelta};
use crate::error::DeployResult;
use crate::handler::{desired_records, existing_records, reconcile, ResourceHandler, RunScope};
use async_trait::async_trait;
use tenantsync_types::{FieldSpec, HandlerDescriptor, Priority, ResourceSchema};

pub const ROLES: &str = "roles";

/// Roles, matched by id then name.
pub struct RolesHandler {
    descriptor: HandlerDescriptor,
}

impl RolesHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new(ROLES, "id").with_priority(Priority::uniform(60)),
        }
    }
}

impl Default for RolesHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ResourceHandler for RolesHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::array(
            ROLES,
            vec![
                FieldSpec::string("name").required(),
                FieldSpec::string("description"),
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
        reconcile(&self.descriptor, desired, existing, scope).await?;
        Ok(ContextDelta::new())
    }
}
