use chrono::{TimeZone, Utc};
use reqwest::header::{HeaderMap, HeaderValue};
use serde_json::json;
use tenantsync_api::{
    rate_limit_reset, ApiError, HttpClientConfig, HttpManagementClient, ListQuery, ManagementApi,
};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> HttpManagementClient {
    HttpManagementClient::new(HttpClientConfig {
        base_url: server.uri(),
        token: "test-token".into(),
        ..Default::default()
    })
    .unwrap()
}

// ── Config ──────────────────────────────────────────────────────

#[test]
fn config_defaults() {
    let cfg = HttpClientConfig::default();
    assert_eq!(cfg.timeout_secs, 60);
    assert!(cfg.user_agent.starts_with("tenantsync/"));
    assert!(cfg.base_url.is_empty());
}

#[test]
fn missing_base_url_or_token_is_rejected() {
    let no_url = HttpManagementClient::new(HttpClientConfig {
        token: "t".into(),
        ..Default::default()
    });
    assert!(matches!(no_url, Err(ApiError::Config(_))));

    let no_token = HttpManagementClient::new(HttpClientConfig {
        base_url: "https://tenant.example.com".into(),
        ..Default::default()
    });
    assert!(matches!(no_token, Err(ApiError::Config(_))));
}

// ── Rate-limit headers ──────────────────────────────────────────

#[test]
fn reset_header_is_epoch_seconds() {
    let mut headers = HeaderMap::new();
    headers.insert("x-ratelimit-reset", HeaderValue::from_static("1700000000"));
    let now = Utc.timestamp_opt(1_699_999_990, 0).unwrap();
    assert_eq!(
        rate_limit_reset(&headers, now),
        Utc.timestamp_opt(1_700_000_000, 0).single()
    );
}

#[test]
fn retry_after_is_relative() {
    let mut headers = HeaderMap::new();
    headers.insert("retry-after", HeaderValue::from_static("3"));
    let now = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
    assert_eq!(
        rate_limit_reset(&headers, now),
        Some(now + chrono::Duration::seconds(3))
    );
}

#[test]
fn no_or_garbled_headers_give_no_hint() {
    let now = Utc::now();
    assert_eq!(rate_limit_reset(&HeaderMap::new(), now), None);

    let mut headers = HeaderMap::new();
    headers.insert("retry-after", HeaderValue::from_static("soon"));
    assert_eq!(rate_limit_reset(&headers, now), None);
}

// ── Requests ────────────────────────────────────────────────────

#[tokio::test]
async fn get_all_sends_paging_and_auth() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/clients"))
        .and(header("authorization", "Bearer test-token"))
        .and(query_param("page", "2"))
        .and(query_param("per_page", "50"))
        .and(query_param("include_totals", "true"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "clients": [{"client_id": "c1"}],
            "total": 101,
            "start": 100
        })))
        .expect(1)
        .mount(&server)
        .await;

    let body = client_for(&server)
        .get_all("clients", &ListQuery::page(2, 50))
        .await
        .unwrap();
    assert_eq!(body["total"], 101);
    assert_eq!(body["clients"][0]["client_id"], "c1");
}

#[tokio::test]
async fn create_posts_json() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/roles"))
        .and(body_json(json!({"name": "admin"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"id": "r1", "name": "admin"})))
        .expect(1)
        .mount(&server)
        .await;

    let created = client_for(&server)
        .create("roles", &json!({"name": "admin"}))
        .await
        .unwrap();
    assert_eq!(created["id"], "r1");
}

#[tokio::test]
async fn update_patches_encoded_id() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/v2/resource-servers/https%3A%2F%2Fapi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"name": "api"})))
        .expect(1)
        .mount(&server)
        .await;

    let updated = client_for(&server)
        .update("resource-servers", "https://api", &json!({"name": "api"}))
        .await
        .unwrap();
    assert_eq!(updated["name"], "api");
}

#[tokio::test]
async fn delete_accepts_empty_body() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/v2/rules/rul_1"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&server)
        .await;

    client_for(&server).delete("rules", "rul_1").await.unwrap();
}

// ── Errors ──────────────────────────────────────────────────────

#[tokio::test]
async fn too_many_requests_maps_to_rate_limited() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/rules"))
        .respond_with(
            ResponseTemplate::new(429)
                .insert_header("x-ratelimit-reset", "1700000000")
                .set_body_json(json!({"message": "Global limit has been reached"})),
        )
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_all("rules", &ListQuery::all())
        .await
        .unwrap_err();

    assert!(err.is_rate_limited());
    assert_eq!(err.reset_at(), Utc.timestamp_opt(1_700_000_000, 0).single());
    assert!(err.to_string().contains("Global limit has been reached"));
}

#[tokio::test]
async fn not_found_is_unsupported() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/v2/hooks"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({"error": "Not Found"})))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .get_all("hooks", &ListQuery::all())
        .await
        .unwrap_err();

    assert_eq!(err.status_code(), Some(404));
    assert!(err.is_unsupported());
    assert!(matches!(err, ApiError::Status { ref message, .. } if message == "Not Found"));
}

#[tokio::test]
async fn plain_text_error_body_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/v2/clients"))
        .respond_with(ResponseTemplate::new(400).set_body_string("bad payload"))
        .mount(&server)
        .await;

    let err = client_for(&server)
        .create("clients", &json!({}))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        ApiError::Status { status: 400, ref message } if message == "bad payload"
    ));
    assert!(!err.is_unsupported());
}
