use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use tenantsync_api::{collect_pages, page_count, ApiError, Page, PoolConfig, TaskPool};

/// A page of synthetic records `{"n": i}` out of `total`.
fn page_of(page: usize, per_page: usize, total: usize) -> Page {
    let start = (page * per_page).min(total);
    let end = (start + per_page).min(total);
    Page {
        items: (start..end).map(|n| json!({ "n": n })).collect(),
        total,
        has_totals: true,
    }
}

#[test]
fn page_count_rounds_up() {
    assert_eq!(page_count(1029, 50), 21);
    assert_eq!(page_count(1000, 50), 20);
    assert_eq!(page_count(0, 50), 0);
    assert_eq!(page_count(1, 50), 1);
}

#[tokio::test(start_paused = true)]
async fn fetches_each_page_exactly_once() {
    let pool = TaskPool::new(PoolConfig::default());
    let fetches = &AtomicUsize::new(0);

    let items = collect_pages(&pool, 50, |page| async move {
        fetches.fetch_add(1, Ordering::SeqCst);
        Ok::<_, ApiError>(page_of(page, 50, 1029))
    })
    .await
    .unwrap();

    assert_eq!(fetches.load(Ordering::SeqCst), 21);
    assert_eq!(items.len(), 1029);
    let unique: HashSet<u64> = items.iter().filter_map(|i| i["n"].as_u64()).collect();
    assert_eq!(unique.len(), 1029);
}

#[tokio::test(start_paused = true)]
async fn single_page_needs_one_fetch() {
    let pool = TaskPool::default();
    let fetches = &AtomicUsize::new(0);

    let items = collect_pages(&pool, 50, |page| async move {
        fetches.fetch_add(1, Ordering::SeqCst);
        Ok::<_, ApiError>(page_of(page, 50, 7))
    })
    .await
    .unwrap();

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(items.len(), 7);
}

#[tokio::test(start_paused = true)]
async fn empty_total_returns_empty() {
    let pool = TaskPool::default();
    let items = collect_pages(&pool, 50, |page| async move {
        Ok::<_, ApiError>(page_of(page, 50, 0))
    })
    .await
    .unwrap();
    assert!(items.is_empty());
}

#[tokio::test(start_paused = true)]
async fn bare_array_is_returned_unpaged() {
    let pool = TaskPool::default();
    let fetches = &AtomicUsize::new(0);

    let items = collect_pages(&pool, 2, |_| async move {
        fetches.fetch_add(1, Ordering::SeqCst);
        Page::from_response(json!([{"id": 1}, {"id": 2}, {"id": 3}]), "roles")
    })
    .await
    .unwrap();

    assert_eq!(fetches.load(Ordering::SeqCst), 1);
    assert_eq!(items.len(), 3);
}

#[tokio::test(start_paused = true)]
async fn failing_page_fails_the_listing() {
    let pool = TaskPool::default();
    let result: Result<Vec<Value>, ApiError> = collect_pages(&pool, 10, |page| async move {
        if page == 3 {
            Err(ApiError::status(500, "page 3 unavailable"))
        } else {
            Ok(page_of(page, 10, 95))
        }
    })
    .await;

    assert_eq!(result.unwrap_err().status_code(), Some(500));
}
