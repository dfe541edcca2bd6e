//! Collects every page of a paged listing.

use crate::client::Page;
use crate::pool::TaskPool;
use std::future::Future;
use tracing::debug;

/// Number of pages needed for `total` records.
pub fn page_count(total: usize, page_size: usize) -> usize {
    total.div_ceil(page_size.max(1))
}

/// Fetches page 0 to learn the total, then the remaining pages concurrently
/// through `pool`.
///
/// Exactly `max(1, ceil(total / page_size))` fetches are made. Items are
/// concatenated page by page; no ordering or deduplication beyond that is
/// attempted. A first page without a total (a bare array) is returned as is.
pub async fn collect_pages<E, F, Fut>(
    pool: &TaskPool,
    page_size: usize,
    fetch_page: F,
) -> Result<Vec<serde_json::Value>, E>
where
    E: Send,
    F: Fn(usize) -> Fut + Sync,
    Fut: Future<Output = Result<Page, E>> + Send,
{
    let first = fetch_page(0).await?;
    if !first.has_totals {
        return Ok(first.items);
    }

    let pages_left = page_count(first.total, page_size).saturating_sub(1);
    debug!(total = first.total, page_size, pages_left, "Collecting pages");
    if pages_left == 0 {
        return Ok(first.items);
    }

    let rest = pool
        .run_each((1..=pages_left).collect(), |page| fetch_page(page))
        .await?;

    let mut items = first.items;
    items.reserve(rest.iter().map(|p| p.items.len()).sum());
    for page in rest {
        items.extend(page.items);
    }
    Ok(items)
}
