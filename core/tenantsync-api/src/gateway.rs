//! Run-scoped access to the management API.
//!
//! A [`Gateway`] bundles the API client with the single task pool and retry
//! policy of one reconciliation run. It is constructed once and passed by
//! reference to every handler, so all fan-outs share one rate budget.

use crate::client::{ListQuery, ManagementApi, Page};
use crate::error::ApiResult;
use crate::paginate::collect_pages;
use crate::pool::TaskPool;
use crate::retry::RetryPolicy;
use serde_json::Value;
use std::sync::Arc;

/// API client + shared pool + retry policy.
pub struct Gateway {
    api: Arc<dyn ManagementApi>,
    pool: Arc<TaskPool>,
    retry: RetryPolicy,
    page_size: usize,
}

impl Gateway {
    /// Records per page when listing.
    pub const DEFAULT_PAGE_SIZE: usize = 50;

    pub fn new(api: Arc<dyn ManagementApi>, pool: Arc<TaskPool>, retry: RetryPolicy) -> Self {
        Self {
            api,
            pool,
            retry,
            page_size: Self::DEFAULT_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn with_page_size(mut self, page_size: usize) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The run's shared task pool.
    pub fn pool(&self) -> &TaskPool {
        &self.pool
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    pub fn page_size(&self) -> usize {
        self.page_size
    }

    /// Lists every record under `path`.
    ///
    /// Paged listings fan out through the pool after the first page; each
    /// page request is retried on rate limits independently.
    pub async fn get_all(
        &self,
        path: &str,
        collection_key: &str,
        paginate: bool,
    ) -> ApiResult<Vec<Value>> {
        if !paginate {
            let query = ListQuery::all();
            let response = self
                .retry
                .execute(path, || self.api.get_all(path, &query))
                .await?;
            return Ok(Page::from_response(response, collection_key)?.items);
        }

        let page_size = self.page_size;
        collect_pages(&self.pool, page_size, |page| async move {
            let query = ListQuery::page(page, page_size);
            let response = self
                .retry
                .execute(path, || self.api.get_all(path, &query))
                .await?;
            Page::from_response(response, collection_key)
        })
        .await
    }

    /// Creates a record, retrying on rate limits.
    pub async fn create(&self, path: &str, payload: &Value) -> ApiResult<Value> {
        self.retry
            .execute(path, || self.api.create(path, payload))
            .await
    }

    /// Updates a record, retrying on rate limits.
    pub async fn update(&self, path: &str, id: &str, payload: &Value) -> ApiResult<Value> {
        self.retry
            .execute(path, || self.api.update(path, id, payload))
            .await
    }

    /// Deletes a record, retrying on rate limits.
    pub async fn delete(&self, path: &str, id: &str) -> ApiResult<()> {
        self.retry
            .execute(path, || self.api.delete(path, id))
            .await
    }
}
