use pretty_assertions::assert_eq;
use serde_json::json;
use tenantsync_api::{ApiError, ListQuery, Page};

// ── ListQuery ───────────────────────────────────────────────────

#[test]
fn unpaged_query_has_no_pairs() {
    assert!(ListQuery::all().to_pairs().is_empty());
}

#[test]
fn paged_query_pairs() {
    assert_eq!(
        ListQuery::page(3, 50).to_pairs(),
        vec![
            ("page", "3".to_string()),
            ("per_page", "50".to_string()),
            ("include_totals", "true".to_string()),
        ]
    );
}

// ── Page ────────────────────────────────────────────────────────

#[test]
fn wrapped_response_carries_total() {
    let page = Page::from_response(
        json!({"clients": [{"name": "a"}], "total": 120, "start": 0, "limit": 50}),
        "clients",
    )
    .unwrap();
    assert_eq!(page.items, vec![json!({"name": "a"})]);
    assert_eq!(page.total, 120);
    assert!(page.has_totals);
}

#[test]
fn bare_array_has_no_total() {
    let page = Page::from_response(json!([{"name": "a"}, {"name": "b"}]), "clients").unwrap();
    assert_eq!(page.total, 2);
    assert!(!page.has_totals);
}

#[test]
fn wrapped_response_without_total_is_one_page() {
    let page = Page::from_response(json!({"roles": []}), "roles").unwrap();
    assert!(page.items.is_empty());
    assert!(!page.has_totals);
}

#[test]
fn missing_collection_key_is_unexpected() {
    let err = Page::from_response(json!({"total": 3}), "rules").unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedResponse(ref m) if m.contains("rules")));

    let err = Page::from_response(json!("nope"), "rules").unwrap_err();
    assert!(matches!(err, ApiError::UnexpectedResponse(_)));
}

// ── ApiError ────────────────────────────────────────────────────

#[test]
fn status_classification() {
    assert!(ApiError::status(404, "x").is_unsupported());
    assert!(ApiError::status(501, "x").is_unsupported());
    assert!(!ApiError::status(500, "x").is_unsupported());
    assert!(ApiError::status(429, "x").is_rate_limited());
    assert_eq!(ApiError::UnexpectedResponse("x".into()).status_code(), None);
}

#[test]
fn reset_only_on_rate_limits() {
    let err = ApiError::RateLimited {
        message: "slow down".into(),
        reset_at: None,
    };
    assert_eq!(err.status_code(), Some(429));
    assert_eq!(err.reset_at(), None);
    assert_eq!(err.to_string(), "rate limited: slow down");
}
