//! Management API error types.

use chrono::{DateTime, Utc};
use thiserror::Error;

/// Result type for management API operations.
pub type ApiResult<T> = Result<T, ApiError>;

/// Errors that can occur talking to the management API.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("rate limited: {message}")]
    RateLimited {
        message: String,
        /// When the rate-limit window resets, if the server said so.
        reset_at: Option<DateTime<Utc>>,
    },

    #[error("API request failed with status {status}: {message}")]
    Status { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("unexpected response: {0}")]
    UnexpectedResponse(String),

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl ApiError {
    /// Builds a status error.
    pub fn status(status: u16, message: impl Into<String>) -> Self {
        ApiError::Status {
            status,
            message: message.into(),
        }
    }

    /// The HTTP status code behind this error, if any.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            ApiError::RateLimited { .. } => Some(429),
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Http(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }

    /// Returns true if this error represents a 429 rate-limit response.
    pub fn is_rate_limited(&self) -> bool {
        self.status_code() == Some(429)
    }

    /// Returns true if the tenant does not support the requested feature
    /// (404 or 501).
    pub fn is_unsupported(&self) -> bool {
        matches!(self.status_code(), Some(404 | 501))
    }

    /// The rate-limit reset time, if this is a rate-limit error carrying one.
    pub fn reset_at(&self) -> Option<DateTime<Utc>> {
        match self {
            ApiError::RateLimited { reset_at, .. } => *reset_at,
            _ => None,
        }
    }
}
