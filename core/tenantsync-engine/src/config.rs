//! Deploy configuration.
//!
//! Every section has defaults, so a partial JSON file is enough:
//!
//! ```json
//! {
//!   "api": { "base_url": "https://tenant.example.com" },
//!   "pool": { "max_concurrent": 5 },
//!   "policy": { "allow_delete": true, "excluded.rules": ["legacy"] }
//! }
//! ```

use crate::error::{DeployError, DeployResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Arc;
use tenantsync_api::{
    Gateway, HttpClientConfig, HttpManagementClient, ManagementApi, PoolConfig, RetryPolicy,
    TaskPool,
};
use tenantsync_types::Policy;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DeployConfig {
    pub api: HttpClientConfig,
    pub pool: PoolConfig,
    pub retry: RetryPolicy,
    /// Records per page when listing.
    pub page_size: usize,
    pub policy: Policy,
}

impl Default for DeployConfig {
    fn default() -> Self {
        Self {
            api: HttpClientConfig::default(),
            pool: PoolConfig::default(),
            retry: RetryPolicy::default(),
            page_size: Gateway::DEFAULT_PAGE_SIZE,
            policy: Policy::default(),
        }
    }
}

impl DeployConfig {
    pub fn from_json_str(json: &str) -> DeployResult<Self> {
        serde_json::from_str(json)
            .map_err(|e| DeployError::Config(format!("invalid deploy config: {e}")))
    }

    pub fn from_file(path: impl AsRef<Path>) -> DeployResult<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path)
            .map_err(|e| DeployError::Config(format!("failed to read {}: {e}", path.display())))?;
        Self::from_json_str(&json)
    }

    /// A gateway over `api` with this config's pool, retry policy and page
    /// size. One gateway serves one run.
    pub fn gateway(&self, api: Arc<dyn ManagementApi>) -> Gateway {
        Gateway::new(api, Arc::new(TaskPool::new(self.pool)), self.retry.clone())
            .with_page_size(self.page_size)
    }

    /// A gateway over the HTTP management API.
    pub fn http_gateway(&self) -> DeployResult<Gateway> {
        let client = HttpManagementClient::new(self.api.clone())
            .map_err(|e| DeployError::Config(e.to_string()))?;
        Ok(self.gateway(Arc::new(client)))
    }
}
