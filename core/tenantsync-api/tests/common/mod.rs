#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Arc;
use tenantsync_api::mock::InMemoryApi;
use tenantsync_api::{Gateway, PoolConfig, RetryPolicy, TaskPool};

/// Wraps `api` in a gateway with the default retry policy and page size.
pub fn gateway_over(api: InMemoryApi, pool: PoolConfig) -> (Arc<InMemoryApi>, Gateway) {
    let api = Arc::new(api);
    let gateway = Gateway::new(
        api.clone(),
        Arc::new(TaskPool::new(pool)),
        RetryPolicy::default(),
    );
    (api, gateway)
}

/// `count` records with ids `"{id_field}-{n}"` and names `"item-{n}"`.
pub fn numbered(id_field: &str, count: usize) -> Vec<Value> {
    (0..count)
        .map(|n| {
            let mut record = json!({ "name": format!("item-{n}") });
            record[id_field] = json!(format!("{id_field}-{n}"));
            record
        })
        .collect()
}
