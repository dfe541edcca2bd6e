//! reqwest implementation of [`ManagementApi`].
//!
//! Talks to `{base_url}/api/v2/{path}` with a bearer token.

use crate::client::{ListQuery, ManagementApi};
use crate::error::{ApiError, ApiResult};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::HeaderMap;
use reqwest::{Client, Response, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

/// Connection settings for the management API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpClientConfig {
    /// Tenant base URL (e.g. `https://tenant.example.com`).
    pub base_url: String,
    /// Management API access token.
    pub token: String,
    /// Per-request timeout.
    pub timeout_secs: u64,
    pub user_agent: String,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            token: String::new(),
            timeout_secs: 60,
            user_agent: format!("tenantsync/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

/// Management API client over HTTP.
pub struct HttpManagementClient {
    config: HttpClientConfig,
    client: Client,
}

impl HttpManagementClient {
    /// Creates a client. Fails if the base URL or token is missing.
    pub fn new(config: HttpClientConfig) -> ApiResult<Self> {
        if config.base_url.trim().is_empty() {
            return Err(ApiError::Config("base_url is required".into()));
        }
        if config.token.trim().is_empty() {
            return Err(ApiError::Config("token is required".into()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()?;

        Ok(Self { config, client })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/api/v2/{}",
            self.config.base_url.trim_end_matches('/'),
            path.trim_matches('/')
        )
    }

    fn item_url(&self, path: &str, id: &str) -> String {
        format!("{}/{}", self.url(path), urlencoding::encode(id))
    }

    /// Maps non-success responses to errors; passes successes through.
    async fn check(response: Response) -> ApiResult<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let reset_at = rate_limit_reset(response.headers(), Utc::now());
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body).unwrap_or_else(|| {
            status
                .canonical_reason()
                .map_or_else(|| status.to_string(), str::to_string)
        });

        if status == StatusCode::TOO_MANY_REQUESTS {
            Err(ApiError::RateLimited { message, reset_at })
        } else {
            Err(ApiError::status(status.as_u16(), message))
        }
    }

    async fn json_body(response: Response) -> ApiResult<Value> {
        let bytes = response.bytes().await?;
        if bytes.is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_slice(&bytes)?)
    }
}

#[async_trait]
impl ManagementApi for HttpManagementClient {
    async fn get_all(&self, path: &str, query: &ListQuery) -> ApiResult<Value> {
        debug!(path, page = ?query.page, "GET");
        let response = self
            .client
            .get(self.url(path))
            .bearer_auth(&self.config.token)
            .query(&query.to_pairs())
            .send()
            .await?;
        Self::json_body(Self::check(response).await?).await
    }

    async fn create(&self, path: &str, payload: &Value) -> ApiResult<Value> {
        debug!(path, "POST");
        let response = self
            .client
            .post(self.url(path))
            .bearer_auth(&self.config.token)
            .json(payload)
            .send()
            .await?;
        Self::json_body(Self::check(response).await?).await
    }

    async fn update(&self, path: &str, id: &str, payload: &Value) -> ApiResult<Value> {
        debug!(path, id, "PATCH");
        let response = self
            .client
            .patch(self.item_url(path, id))
            .bearer_auth(&self.config.token)
            .json(payload)
            .send()
            .await?;
        Self::json_body(Self::check(response).await?).await
    }

    async fn delete(&self, path: &str, id: &str) -> ApiResult<()> {
        debug!(path, id, "DELETE");
        let response = self
            .client
            .delete(self.item_url(path, id))
            .bearer_auth(&self.config.token)
            .send()
            .await?;
        Self::check(response).await?;
        Ok(())
    }
}

/// Reads the rate-limit reset hint: `x-ratelimit-reset` (epoch seconds)
/// first, then `retry-after` (seconds from now).
pub fn rate_limit_reset(headers: &HeaderMap, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
    let header = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse::<i64>().ok())
    };

    if let Some(epoch) = header("x-ratelimit-reset") {
        return DateTime::from_timestamp(epoch, 0);
    }
    header("retry-after").map(|secs| now + chrono::Duration::seconds(secs.max(0)))
}

/// Pulls a human-readable message out of a JSON error body, falling back to
/// the raw body text.
fn error_message(body: &str) -> Option<String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return None;
    }
    match serde_json::from_str::<Value>(trimmed) {
        Ok(json) => json
            .get("message")
            .or_else(|| json.get("error"))
            .and_then(Value::as_str)
            .map(str::to_string)
            .or_else(|| Some(trimmed.to_string())),
        Err(_) => Some(trimmed.to_string()),
    }
}
