//! Error types for the reconciliation engine.

use tenantsync_api::ApiError;
use tenantsync_types::Stage;
use thiserror::Error;

/// Result type for engine operations.
pub type DeployResult<T> = Result<T, DeployError>;

/// Errors that end a reconciliation run.
#[derive(Debug, Error)]
pub enum DeployError {
    /// The desired configuration does not match the declared shapes.
    #[error("schema validation failed: {}", .violations.join("; "))]
    Schema { violations: Vec<String> },

    /// Local pre-flight check failed (duplicates, forbidden references).
    #[error("validation failed for {resource_type}: {message}")]
    Validation {
        resource_type: String,
        message: String,
    },

    /// Listing the remote records failed.
    #[error("failed to fetch existing {resource_type}: {source}")]
    Fetch {
        resource_type: String,
        #[source]
        source: ApiError,
    },

    /// A remote delete, rename, create or update failed.
    #[error("{action}: {source}")]
    Operation {
        resource_type: String,
        action: String,
        #[source]
        source: ApiError,
    },

    /// A record to update or delete carries no id.
    #[error("{resource_type} record has no id: {item}")]
    MissingId { resource_type: String, item: String },

    /// The assets could not be turned into API payloads.
    #[error("invalid {resource_type} assets: {message}")]
    InvalidAssets {
        resource_type: String,
        message: String,
    },

    /// A handler failed with an error that did not name its type.
    #[error("{stage} failed for {resource_type}: {source}")]
    Stage {
        stage: Stage,
        resource_type: String,
        #[source]
        source: Box<DeployError>,
    },

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl DeployError {
    pub(crate) fn validation(resource_type: &str, message: impl Into<String>) -> Self {
        DeployError::Validation {
            resource_type: resource_type.to_string(),
            message: message.into(),
        }
    }

    pub(crate) fn invalid_assets(resource_type: &str, message: impl Into<String>) -> Self {
        DeployError::InvalidAssets {
            resource_type: resource_type.to_string(),
            message: message.into(),
        }
    }

    /// The resource type the failure belongs to, when known.
    pub fn resource_type(&self) -> Option<&str> {
        match self {
            DeployError::Validation { resource_type, .. }
            | DeployError::Fetch { resource_type, .. }
            | DeployError::Operation { resource_type, .. }
            | DeployError::MissingId { resource_type, .. }
            | DeployError::InvalidAssets { resource_type, .. }
            | DeployError::Stage { resource_type, .. } => Some(resource_type),
            DeployError::Schema { .. } | DeployError::Config(_) => None,
        }
    }
}
