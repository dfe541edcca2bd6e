//! Pre-flight shape check of the whole desired configuration.
//!
//! Purely local: runs before any handler stage and never touches the
//! network.

use crate::error::{DeployError, DeployResult};
use crate::handler::ResourceHandler;
use tenantsync_types::AssetCollections;

/// Every shape violation across all configured types. Types no handler
/// knows are violations too; null collections are skipped.
pub fn schema_violations(
    assets: &AssetCollections,
    handlers: &[Box<dyn ResourceHandler>],
) -> Vec<String> {
    let mut violations = Vec::new();
    for resource_type in assets.resource_types() {
        let Some(value) = assets.get(resource_type).filter(|v| !v.is_null()) else {
            continue;
        };
        match handlers
            .iter()
            .find(|h| h.descriptor().resource_type == resource_type)
        {
            Some(handler) => violations.extend(handler.schema().violations(value)),
            None => violations.push(format!("{resource_type} is not a supported resource type")),
        }
    }
    violations
}

/// Fails with every violation at once.
pub fn check_schema(
    assets: &AssetCollections,
    handlers: &[Box<dyn ResourceHandler>],
) -> DeployResult<()> {
    let violations = schema_violations(assets, handlers);
    if violations.is_empty() {
        Ok(())
    } else {
        Err(DeployError::Schema { violations })
    }
}
