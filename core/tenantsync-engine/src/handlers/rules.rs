use crate::context::{AssetContext, ContextDelta};
use crate::error::{DeployError, DeployResult};
use crate::handler::{check_duplicates, desired_records, existing_records, reconcile, ResourceHandler, RunScope};
use async_trait::async_trait;
use std::collections::BTreeMap;
use tenantsync_types::{Asset, FieldSpec, HandlerDescriptor, Priority, ResourceSchema};

pub const RULES: &str = "rules";

/// Rules. The stage is fixed at creation, so it never goes into updates.
pub struct RulesHandler {
    descriptor: HandlerDescriptor,
}

impl RulesHandler {
    pub fn new() -> Self {
        Self {
            descriptor: HandlerDescriptor::new(RULES, "id")
                .strip_on_update(&["id", "stage"])
                .with_priority(Priority::uniform(70)),
        }
    }
}

impl Default for RulesHandler {
    fn default() -> Self {
        Self::new()
    }
}

/// Names sharing an `order`, as `order: a, b` entries.
fn shared_orders(rules: &[Asset]) -> Vec<String> {
    let mut by_order: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for rule in rules {
        if let Some(order) = rule.get("order").filter(|v| !v.is_null()) {
            by_order
                .entry(order.to_string())
                .or_default()
                .push(rule.get_str("name").unwrap_or("(unnamed)"));
        }
    }
    by_order
        .into_iter()
        .filter(|(_, names)| names.len() > 1)
        .map(|(order, names)| format!("{order}: {}", names.join(", ")))
        .collect()
}

#[async_trait]
impl ResourceHandler for RulesHandler {
    fn descriptor(&self) -> &HandlerDescriptor {
        &self.descriptor
    }

    fn schema(&self) -> ResourceSchema {
        ResourceSchema::array(
            RULES,
            vec![
                FieldSpec::string("name").required(),
                FieldSpec::string("script").required(),
                FieldSpec::integer("order"),
                FieldSpec::bool("enabled"),
                FieldSpec::enumeration("stage", &["login_success", "login_failure", "pre_authorize"]),
            ],
        )
    }

    async fn validate(
        &self,
        _scope: &RunScope<'_>,
        ctx: &AssetContext,
    ) -> DeployResult<ContextDelta> {
        let Some(rules) = desired_records(&self.descriptor, ctx)? else {
            return Ok(ContextDelta::new());
        };
        check_duplicates(&self.descriptor, &rules)?;

        let shared = shared_orders(&rules);
        if !shared.is_empty() {
            return Err(DeployError::validation(
                RULES,
                format!("Multiple rules share the same order: {}", shared.join("; ")),
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
        reconcile(&self.descriptor, desired, existing, scope).await?;
        Ok(ContextDelta::new())
    }
}
