//! The remote management API boundary.
//!
//! Every resource type is reached through the same four operations keyed by
//! an API path segment (`clients`, `resource-servers`, ...).

use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Listing parameters for `get_all`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListQuery {
    /// Zero-based page index; `None` requests an unpaged listing.
    pub page: Option<usize>,
    pub per_page: Option<usize>,
    /// Ask the server to wrap the page with a `total` count.
    pub include_totals: bool,
}

impl ListQuery {
    /// An unpaged listing.
    pub fn all() -> Self {
        Self::default()
    }

    /// One page of a paged listing, with totals.
    pub fn page(page: usize, per_page: usize) -> Self {
        Self {
            page: Some(page),
            per_page: Some(per_page),
            include_totals: true,
        }
    }

    /// Query-string pairs in a stable order.
    pub fn to_pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::new();
        if let Some(page) = self.page {
            pairs.push(("page", page.to_string()));
        }
        if let Some(per_page) = self.per_page {
            pairs.push(("per_page", per_page.to_string()));
        }
        if self.include_totals {
            pairs.push(("include_totals", "true".to_string()));
        }
        pairs
    }
}

/// One page of records, normalised from either response form.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    pub items: Vec<Value>,
    /// Total record count reported by the server (or the item count when the
    /// server returned a bare array).
    pub total: usize,
    /// Whether the response carried a `total`, i.e. paging is meaningful.
    pub has_totals: bool,
}

impl Page {
    /// Normalises a `get_all` response: either a raw array, or an object
    /// holding the array under `collection_key` plus a `total` count.
    pub fn from_response(response: Value, collection_key: &str) -> ApiResult<Self> {
        match response {
            Value::Array(items) => Ok(Self {
                total: items.len(),
                items,
                has_totals: false,
            }),
            Value::Object(mut map) => {
                let items = match map.remove(collection_key) {
                    Some(Value::Array(items)) => items,
                    Some(_) | None => {
                        return Err(ApiError::UnexpectedResponse(format!(
                            "response has no \"{collection_key}\" array"
                        )));
                    }
                };
                let total = map.get("total").and_then(Value::as_u64);
                Ok(Self {
                    total: total.map_or(items.len(), |t| t as usize),
                    has_totals: total.is_some(),
                    items,
                })
            }
            other => Err(ApiError::UnexpectedResponse(format!(
                "expected array or object, got {other}"
            ))),
        }
    }
}

/// Abstract management API.
#[async_trait]
pub trait ManagementApi: Send + Sync {
    /// Lists records; returns either a raw array or an object with the array
    /// and a `total` count, depending on the query and the endpoint.
    async fn get_all(&self, path: &str, query: &ListQuery) -> ApiResult<Value>;

    /// Creates a record and returns the stored representation.
    async fn create(&self, path: &str, payload: &Value) -> ApiResult<Value>;

    /// Updates the record with the given id and returns the stored
    /// representation.
    async fn update(&self, path: &str, id: &str, payload: &Value) -> ApiResult<Value>;

    /// Deletes the record with the given id.
    async fn delete(&self, path: &str, id: &str) -> ApiResult<()>;
}
