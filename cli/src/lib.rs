//! Loading and overriding for the `tenantsync` binary.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::Path;
use tenantsync_engine::{DeployConfig, Orchestrator, RunSummary};
use tenantsync_types::{AssetCollections, Policy};
use tracing::info;

/// Command-line values that take precedence over the config file.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub base_url: Option<String>,
    pub token: Option<String>,
    pub allow_delete: bool,
    pub concurrency: Option<usize>,
    pub rate: Option<usize>,
    /// Raw `key=value` policy entries.
    pub policy: Vec<String>,
}

impl Overrides {
    pub fn apply(&self, config: &mut DeployConfig) -> Result<()> {
        if let Some(base_url) = &self.base_url {
            config.api.base_url = base_url.clone();
        }
        if let Some(token) = &self.token {
            config.api.token = token.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.pool.max_concurrent = concurrency;
        }
        if let Some(rate) = self.rate {
            config.pool.max_per_second = rate;
        }
        if self.allow_delete {
            config.policy.set(Policy::ALLOW_DELETE, true);
        }
        for entry in &self.policy {
            let (key, value) = parse_policy_entry(entry)?;
            config.policy.set(key, value);
        }
        Ok(())
    }
}

/// Splits `key=value`. The value is read as JSON when it parses, otherwise
/// kept as a plain string.
pub fn parse_policy_entry(entry: &str) -> Result<(String, Value)> {
    let Some((key, raw)) = entry.split_once('=') else {
        bail!("policy entry '{entry}' must look like key=value");
    };
    let key = key.trim();
    if key.is_empty() {
        bail!("policy entry '{entry}' has an empty key");
    }
    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

/// Reads the config file, or defaults when none is given.
pub fn load_config(path: Option<&Path>) -> Result<DeployConfig> {
    match path {
        Some(path) => DeployConfig::from_file(path)
            .with_context(|| format!("loading config from {}", path.display())),
        None => Ok(DeployConfig::default()),
    }
}

/// Reads the desired configuration.
pub fn load_assets(path: &Path) -> Result<AssetCollections> {
    let json = std::fs::read_to_string(path)
        .with_context(|| format!("reading assets from {}", path.display()))?;
    AssetCollections::from_json_str(&json)
        .with_context(|| format!("parsing assets in {}", path.display()))
}

/// Deploys `assets` to the tenant described by `config`.
pub async fn deploy(config: &DeployConfig, assets: AssetCollections) -> Result<RunSummary> {
    let gateway = config.http_gateway()?;
    info!(
        base_url = %config.api.base_url,
        max_concurrent = config.pool.max_concurrent,
        max_per_second = config.pool.max_per_second,
        "Deploying"
    );
    let orchestrator = Orchestrator::with_default_handlers(gateway, config.policy.clone());
    Ok(orchestrator.deploy(assets).await?)
}
