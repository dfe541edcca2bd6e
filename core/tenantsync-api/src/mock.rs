//! An in-memory management API for testing.
//!
//! Collections are plain vectors of JSON objects keyed by API path. Every
//! call is recorded; failures and unsupported endpoints can be injected.

use crate::client::{ListQuery, ManagementApi};
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Which operation a call or injected failure refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockOp {
    GetAll,
    Create,
    Update,
    Delete,
}

/// One recorded call.
#[derive(Debug, Clone, PartialEq)]
pub struct MockCall {
    pub op: MockOp,
    pub path: String,
    pub id: Option<String>,
    pub payload: Option<Value>,
    pub page: Option<usize>,
}

#[derive(Debug, Clone)]
struct Collection {
    id_field: String,
    collection_key: String,
    unique_field: Option<String>,
    records: Vec<Value>,
}

#[derive(Debug, Clone)]
struct Failure {
    op: MockOp,
    path: String,
    remaining: usize,
    status: u16,
    reset_in: Option<chrono::Duration>,
}

#[derive(Debug, Default)]
struct MockState {
    collections: BTreeMap<String, Collection>,
    unsupported: BTreeMap<String, u16>,
    failures: Vec<Failure>,
    calls: Vec<MockCall>,
}

/// In-memory [`ManagementApi`].
#[derive(Debug, Default)]
pub struct InMemoryApi {
    state: Mutex<MockState>,
    latency: Option<Duration>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl InMemoryApi {
    /// Creates an API with no collections.
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a collection. The collection key defaults to the path.
    #[must_use]
    pub fn with_collection(self, path: &str, id_field: &str, records: Vec<Value>) -> Self {
        self.lock().collections.insert(
            path.to_string(),
            Collection {
                id_field: id_field.to_string(),
                collection_key: path.to_string(),
                unique_field: None,
                records,
            },
        );
        self
    }

    /// Overrides the key wrapping paged responses for a seeded collection.
    #[must_use]
    pub fn with_collection_key(self, path: &str, key: &str) -> Self {
        if let Some(c) = self.lock().collections.get_mut(path) {
            c.collection_key = key.to_string();
        }
        self
    }

    /// Rejects creates/updates that would duplicate `field` with a 409.
    #[must_use]
    pub fn with_unique(self, path: &str, field: &str) -> Self {
        if let Some(c) = self.lock().collections.get_mut(path) {
            c.unique_field = Some(field.to_string());
        }
        self
    }

    /// Makes every call on `path` fail with `status` (404 or 501 mimic a
    /// tenant without the feature).
    #[must_use]
    pub fn with_unsupported(self, path: &str, status: u16) -> Self {
        self.lock()
            .unsupported
            .insert(path.to_string(), status);
        self
    }

    /// Sleeps this long inside every call.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = Some(latency);
        self
    }

    /// Fails the next `times` matching calls with `status`.
    pub fn fail_next(&self, op: MockOp, path: &str, times: usize, status: u16) {
        self.push_failure(op, path, times, status, None);
    }

    /// Fails the next `times` matching calls with a 429 whose reset lies
    /// `reset_in` after the moment of failure.
    pub fn rate_limit_next(&self, op: MockOp, path: &str, times: usize, reset_in: chrono::Duration) {
        self.push_failure(op, path, times, 429, Some(reset_in));
    }

    fn push_failure(
        &self,
        op: MockOp,
        path: &str,
        times: usize,
        status: u16,
        reset_in: Option<chrono::Duration>,
    ) {
        self.lock().failures.push(Failure {
            op,
            path: path.to_string(),
            remaining: times,
            status,
            reset_in,
        });
    }

    /// Current records of a collection.
    pub fn records(&self, path: &str) -> Vec<Value> {
        self.lock()
            .collections
            .get(path)
            .map(|c| c.records.clone())
            .unwrap_or_default()
    }

    /// Every call so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.lock().calls.clone()
    }

    /// Calls of one operation on one path.
    pub fn calls_to(&self, op: MockOp, path: &str) -> Vec<MockCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.op == op && c.path == path)
            .collect()
    }

    /// Highest number of calls observed in flight at once.
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn enter(&self, call: MockCall) -> ApiResult<()> {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if let Some(latency) = self.latency {
            tokio::time::sleep(latency).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let mut state = self.lock();
        let (op, path) = (call.op, call.path.clone());
        state.calls.push(call);

        if let Some(&status) = state.unsupported.get(&path) {
            return Err(ApiError::status(status, "feature not available on this tenant"));
        }
        if let Some(failure) = state
            .failures
            .iter_mut()
            .find(|f| f.op == op && f.path == path && f.remaining > 0)
        {
            failure.remaining -= 1;
            return Err(match failure.reset_in {
                Some(reset_in) => ApiError::RateLimited {
                    message: "Too Many Requests".into(),
                    reset_at: Some(Utc::now() + reset_in),
                },
                None => ApiError::status(failure.status, "injected failure"),
            });
        }
        Ok(())
    }
}

fn id_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn collection<'a>(state: &'a mut MockState, path: &str) -> &'a mut Collection {
    state
        .collections
        .entry(path.to_string())
        .or_insert_with(|| Collection {
            id_field: "id".into(),
            collection_key: path.to_string(),
            unique_field: None,
            records: Vec::new(),
        })
}

fn check_unique(c: &Collection, candidate: &Value, skip_id: Option<&str>) -> ApiResult<()> {
    let Some(field) = &c.unique_field else {
        return Ok(());
    };
    let Some(value) = candidate.get(field) else {
        return Ok(());
    };
    let clash = c.records.iter().any(|r| {
        r.get(field) == Some(value)
            && r.get(&c.id_field).and_then(id_string).as_deref() != skip_id
    });
    if clash {
        return Err(ApiError::status(409, format!("{field} {value} already exists")));
    }
    Ok(())
}

#[async_trait]
impl ManagementApi for InMemoryApi {
    async fn get_all(&self, path: &str, query: &ListQuery) -> ApiResult<Value> {
        self.enter(MockCall {
            op: MockOp::GetAll,
            path: path.to_string(),
            id: None,
            payload: None,
            page: query.page,
        })
        .await?;

        let mut state = self.lock();
        let c = collection(&mut state, path);
        let items: Vec<Value> = match (query.page, query.per_page) {
            (Some(page), Some(per_page)) => c
                .records
                .iter()
                .skip(page * per_page)
                .take(per_page)
                .cloned()
                .collect(),
            _ => c.records.clone(),
        };

        if query.include_totals {
            let mut body = serde_json::Map::new();
            body.insert(c.collection_key.clone(), Value::Array(items));
            body.insert("total".into(), json!(c.records.len()));
            body.insert("start".into(), json!(query.page.unwrap_or(0) * query.per_page.unwrap_or(0)));
            Ok(Value::Object(body))
        } else {
            Ok(Value::Array(items))
        }
    }

    async fn create(&self, path: &str, payload: &Value) -> ApiResult<Value> {
        self.enter(MockCall {
            op: MockOp::Create,
            path: path.to_string(),
            id: None,
            payload: Some(payload.clone()),
            page: None,
        })
        .await?;

        let mut state = self.lock();
        let c = collection(&mut state, path);
        let Value::Object(mut record) = payload.clone() else {
            return Err(ApiError::status(400, "payload must be an object"));
        };
        if !record.contains_key(&c.id_field) {
            record.insert(
                c.id_field.clone(),
                Value::String(uuid::Uuid::new_v4().simple().to_string()),
            );
        }
        let record = Value::Object(record);
        check_unique(c, &record, None)?;
        c.records.push(record.clone());
        Ok(record)
    }

    async fn update(&self, path: &str, id: &str, payload: &Value) -> ApiResult<Value> {
        self.enter(MockCall {
            op: MockOp::Update,
            path: path.to_string(),
            id: Some(id.to_string()),
            payload: Some(payload.clone()),
            page: None,
        })
        .await?;

        let mut state = self.lock();
        let c = collection(&mut state, path);
        check_unique(c, payload, Some(id))?;
        let id_field = c.id_field.clone();
        let record = c
            .records
            .iter_mut()
            .find(|r| r.get(&id_field).and_then(id_string).as_deref() == Some(id))
            .ok_or_else(|| ApiError::status(404, format!("{path}/{id} not found")))?;
        if let (Some(target), Some(changes)) = (record.as_object_mut(), payload.as_object()) {
            for (key, value) in changes {
                target.insert(key.clone(), value.clone());
            }
        }
        Ok(record.clone())
    }

    async fn delete(&self, path: &str, id: &str) -> ApiResult<()> {
        self.enter(MockCall {
            op: MockOp::Delete,
            path: path.to_string(),
            id: Some(id.to_string()),
            payload: None,
            page: None,
        })
        .await?;

        let mut state = self.lock();
        let c = collection(&mut state, path);
        let id_field = c.id_field.clone();
        let before = c.records.len();
        c.records
            .retain(|r| r.get(&id_field).and_then(id_string).as_deref() != Some(id));
        if c.records.len() == before {
            return Err(ApiError::status(404, format!("{path}/{id} not found")));
        }
        Ok(())
    }
}
