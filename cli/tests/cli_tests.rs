use pretty_assertions::assert_eq;
use serde_json::json;
use std::io::Write;
use tenantsync_cli::{deploy, load_assets, load_config, parse_policy_entry, Overrides};
use tenantsync_engine::DeployConfig;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn json_file(contents: &str) -> tempfile::NamedTempFile {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

// ── Overrides ───────────────────────────────────────────────────

#[test]
fn policy_entries_parse_json_or_fall_back_to_text() {
    assert_eq!(parse_policy_entry("allow_delete=true").unwrap(), ("allow_delete".into(), json!(true)));
    assert_eq!(
        parse_policy_entry(r#"excluded.rules=["a","b"]"#).unwrap(),
        ("excluded.rules".into(), json!(["a", "b"]))
    );
    assert_eq!(
        parse_policy_entry("client_id=abc123").unwrap(),
        ("client_id".into(), json!("abc123"))
    );
    assert!(parse_policy_entry("no-equals").is_err());
    assert!(parse_policy_entry("=value").is_err());
}

#[test]
fn overrides_win_over_file_values() {
    let mut config = DeployConfig::from_json_str(
        r#"{"api": {"base_url": "https://old.example.com"}, "pool": {"max_concurrent": 2}}"#,
    )
    .unwrap();
    Overrides {
        base_url: Some("https://new.example.com".into()),
        token: Some("t".into()),
        allow_delete: true,
        concurrency: None,
        rate: Some(4),
        policy: vec!["allow_delete.rules=false".into()],
    }
    .apply(&mut config)
    .unwrap();

    assert_eq!(config.api.base_url, "https://new.example.com");
    assert_eq!(config.api.token, "t");
    assert_eq!(config.pool.max_concurrent, 2);
    assert_eq!(config.pool.max_per_second, 4);
    assert!(config.policy.allows_delete("roles"));
    assert!(!config.policy.allows_delete("rules"));
}

// ── Loading ─────────────────────────────────────────────────────

#[test]
fn no_config_file_means_defaults() {
    let config = load_config(None).unwrap();
    assert_eq!(config.page_size, 50);
}

#[test]
fn load_errors_name_the_file() {
    let file = json_file("{ not json");
    let err = load_config(Some(file.path())).unwrap_err();
    assert!(format!("{err:#}").contains(&file.path().display().to_string()));

    let err = load_assets(file.path()).unwrap_err();
    assert!(err.to_string().starts_with("parsing assets in"));
}

#[test]
fn assets_load_from_file() {
    let file = json_file(r#"{"roles": [{"name": "admin"}], "rules": null}"#);
    let assets = load_assets(file.path()).unwrap();
    assert_eq!(assets.resource_types().collect::<Vec<_>>(), vec!["roles", "rules"]);
}

// ── Deploy over HTTP ────────────────────────────────────────────

#[tokio::test]
async fn deploy_reconciles_roles_over_http() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/roles"))
        .and(query_param("page", "0"))
        .and(query_param("include_totals", "true"))
        .and(header("authorization", "Bearer secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "roles": [{"id": "r1", "name": "stale"}],
            "total": 1
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/v2/roles"))
        .and(body_json(json!({"name": "admin"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "r2", "name": "admin"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/roles/r1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    let mut config = DeployConfig::default();
    Overrides {
        base_url: Some(server.uri()),
        token: Some("secret".into()),
        allow_delete: true,
        ..Default::default()
    }
    .apply(&mut config)
    .unwrap();
    let assets = load_assets(json_file(r#"{"roles": [{"name": "admin"}]}"#).path()).unwrap();

    let summary = deploy(&config, assets).await.unwrap();

    assert_eq!(
        summary.actions,
        vec!["Deleted [roles] id: r1, name: stale", "Created [roles] name: admin"]
    );
    assert!(summary.warnings.is_empty());
}

#[tokio::test]
async fn deploy_without_token_fails_before_any_request() {
    let config = DeployConfig::from_json_str(r#"{"api": {"base_url": "https://tenant.example.com"}}"#)
        .unwrap();
    let err = deploy(&config, Default::default()).await.unwrap_err();
    assert!(err.to_string().contains("token is required"));
}
