//! Management API access for tenantsync.
//!
//! Turns a paginated, rate-limited REST management API into bounded,
//! retry-safe operations:
//!
//! - [`ManagementApi`]: the remote boundary (`get_all`, `create`, `update`, `delete`)
//! - [`HttpManagementClient`]: reqwest implementation against `/api/v2`
//! - [`RetryPolicy`]: retries 429 responses until their reset hint, within bounds
//! - [`TaskPool`]: concurrency + per-second start limits shared by one run
//! - [`collect_pages`]: first page for the total, remaining pages through the pool
//! - [`Gateway`]: the run-scoped bundle handed to every resource handler
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use tenantsync_api::{mock::InMemoryApi, Gateway, PoolConfig, RetryPolicy, TaskPool};
//!
//! let api = Arc::new(InMemoryApi::new());
//! let pool = Arc::new(TaskPool::new(PoolConfig::default()));
//! let gateway = Gateway::new(api, pool, RetryPolicy::default());
//! assert_eq!(gateway.page_size(), 50);
//! ```

mod client;
mod error;
mod gateway;
mod http;
pub mod mock;
mod paginate;
mod pool;
mod retry;

pub use client::{ListQuery, ManagementApi, Page};
pub use error::{ApiError, ApiResult};
pub use gateway::Gateway;
pub use http::{rate_limit_reset, HttpClientConfig, HttpManagementClient};
pub use paginate::{collect_pages, page_count};
pub use pool::{PoolConfig, TaskPool, FREQUENCY_WINDOW};
pub use retry::{Retryable, RetryPolicy};
