#![allow(dead_code)]

use serde_json::Value;
use std::sync::Arc;
use tenantsync_api::mock::InMemoryApi;
use tenantsync_api::{Gateway, PoolConfig, RetryPolicy, TaskPool};
use tenantsync_engine::{AssetContext, ExistingCache, RunReport, RunScope};
use tenantsync_types::{AssetCollections, Policy, Record};

/// Builds a record from a JSON object literal.
pub fn rec(value: Value) -> Record {
    Record::try_from(value).expect("test record must be an object")
}

/// Builds records from a JSON array literal.
pub fn recs(value: Value) -> Vec<Record> {
    match value {
        Value::Array(items) => items.into_iter().map(rec).collect(),
        other => panic!("expected array, got {other}"),
    }
}

pub fn context(assets: Value) -> AssetContext {
    AssetContext::new(AssetCollections::from_json_str(&assets.to_string()).unwrap())
}

pub fn gateway(api: &Arc<InMemoryApi>) -> Gateway {
    Gateway::new(
        api.clone(),
        Arc::new(TaskPool::new(PoolConfig::default())),
        RetryPolicy::default(),
    )
}

/// An in-memory API plus everything a handler needs to run against it.
pub struct Harness {
    pub api: Arc<InMemoryApi>,
    pub gateway: Gateway,
    pub policy: Policy,
    pub report: RunReport,
    pub existing: ExistingCache,
}

impl Harness {
    pub fn new(api: InMemoryApi) -> Self {
        let api = Arc::new(api);
        Self {
            gateway: gateway(&api),
            api,
            policy: Policy::new(),
            report: RunReport::new(),
            existing: ExistingCache::new(),
        }
    }

    pub fn with_policy(mut self, policy: Policy) -> Self {
        self.policy = policy;
        self
    }

    pub fn scope(&self) -> RunScope<'_> {
        RunScope {
            gateway: &self.gateway,
            policy: &self.policy,
            report: &self.report,
            existing: &self.existing,
        }
    }

    /// Names currently stored under `path`, sorted.
    pub fn names(&self, path: &str) -> Vec<String> {
        let mut names: Vec<String> = self
            .api
            .records(path)
            .iter()
            .filter_map(|r| r["name"].as_str().map(str::to_string))
            .collect();
        names.sort();
        names
    }
}
