mod common;

use common::context;
use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use std::sync::Arc;
use tenantsync_api::mock::InMemoryApi;
use tenantsync_api::{PoolConfig, RetryPolicy};
use tenantsync_engine::{ContextDelta, DeployConfig, DeployError, RunReport, TypeCounts, CLIENT_IDS};
use tenantsync_types::Policy;

// ── Context ─────────────────────────────────────────────────────

#[test]
fn fold_returns_a_new_context() {
    let base = context(json!({"roles": []}));
    let next = base.fold(ContextDelta::new().with("seen", json!(["a"])));

    assert_eq!(base.get("seen"), None);
    assert_eq!(next.get("seen"), Some(&json!(["a"])));
    assert!(next.assets().get("roles").is_some());
}

#[test]
fn object_entries_merge_and_others_replace() {
    let ctx = context(json!({}))
        .fold(
            ContextDelta::new()
                .with(CLIENT_IDS, json!({"web": "c1"}))
                .with("count", 1),
        )
        .fold(
            ContextDelta::new()
                .with(CLIENT_IDS, json!({"api": "c2", "web": "c3"}))
                .with("count", 2),
        );

    assert_eq!(ctx.get(CLIENT_IDS), Some(&json!({"api": "c2", "web": "c3"})));
    assert_eq!(ctx.get("count"), Some(&json!(2)));
}

#[test]
fn client_ids_ignore_non_string_values() {
    let ctx = context(json!({})).fold(
        ContextDelta::new().with(CLIENT_IDS, json!({"web": "c1", "broken": 7})),
    );
    let ids = ctx.client_ids();
    assert_eq!(ids.len(), 1);
    assert_eq!(ids["web"], "c1");
    assert!(context(json!({})).client_ids().is_empty());
}

// ── Report ──────────────────────────────────────────────────────

#[test]
fn report_counts_per_type_and_keeps_action_order() {
    let report = RunReport::new();
    report.deleted("roles", "id: 1");
    report.renamed("roles", "id: 2, name: A-abcde");
    report.created("roles", "name: A");
    report.updated("clients", "client_id: c1");
    report.warn("careful");

    let summary = report.summary();
    assert_eq!(
        summary.counts_for("roles"),
        TypeCounts {
            created: 1,
            updated: 0,
            deleted: 1
        }
    );
    assert_eq!(summary.counts_for("clients").updated, 1);
    assert_eq!(summary.counts_for("rules"), TypeCounts::default());
    assert_eq!(
        summary.actions,
        vec![
            "Deleted [roles] id: 1",
            "Renamed [roles] id: 2, name: A-abcde",
            "Created [roles] name: A",
            "Updated [clients] client_id: c1",
        ]
    );
    assert_eq!(summary.warnings, vec!["careful"]);
}

#[test]
fn summary_serialises_counts_by_type() {
    let report = RunReport::new();
    report.created("roles", "name: A");
    let value = serde_json::to_value(report.summary()).unwrap();
    assert_eq!(value["counts"]["roles"], json!({"created": 1, "updated": 0, "deleted": 0}));
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn empty_config_uses_defaults() {
    let config = DeployConfig::from_json_str("{}").unwrap();
    assert_eq!(config.pool, PoolConfig::default());
    assert_eq!(config.retry, RetryPolicy::default());
    assert_eq!(config.page_size, 50);
    assert_eq!(config.policy, Policy::new());
    assert_eq!(config.api.timeout_secs, 60);
}

#[test]
fn partial_sections_fill_in_the_rest() {
    let config = DeployConfig::from_json_str(
        r#"{
            "api": {"base_url": "https://tenant.example.com"},
            "pool": {"max_concurrent": 5},
            "retry": {"max_retries": 0},
            "policy": {"allow_delete": true, "excluded.rules": ["legacy"]}
        }"#,
    )
    .unwrap();

    assert_eq!(config.api.base_url, "https://tenant.example.com");
    assert_eq!(config.pool.max_concurrent, 5);
    assert_eq!(config.pool.max_per_second, PoolConfig::default().max_per_second);
    assert_eq!(config.retry.max_retries, 0);
    assert_eq!(config.retry.max_wait_ms, 10_000);
    assert!(config.policy.allows_delete("roles"));
    assert_eq!(config.policy.excluded("rules"), vec!["legacy"]);
}

#[test]
fn malformed_config_is_a_config_error() {
    let err = DeployConfig::from_json_str(r#"{"pool": {"max_concurrent": "lots"}}"#).unwrap_err();
    assert!(matches!(err, DeployError::Config(ref m) if m.starts_with("invalid deploy config")));
}

#[test]
fn config_loads_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{"page_size": 100}}"#).unwrap();

    let config = DeployConfig::from_file(file.path()).unwrap();
    assert_eq!(config.page_size, 100);
}

#[test]
fn missing_file_is_a_config_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = DeployConfig::from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(matches!(err, DeployError::Config(ref m) if m.starts_with("failed to read")));
}

#[test]
fn gateway_uses_configured_page_size() {
    let mut config = DeployConfig::default();
    config.page_size = 25;
    let gateway = config.gateway(Arc::new(InMemoryApi::new()));
    assert_eq!(gateway.page_size(), 25);
    assert_eq!(gateway.pool().config(), config.pool);
}
