//! Core type definitions for tenantsync.
//!
//! This crate defines the plain data types shared by the API layer and the
//! reconciliation engine:
//! - [`Record`]: one untyped resource instance (desired asset or remote record)
//! - [`Identifier`]: a single or composite matching key
//! - [`AssetCollections`]: the desired configuration, keyed by resource type
//! - [`Policy`]: named flags queried by key (allow-delete, exclusions, ...)
//! - [`ResourceSchema`]: the declared shape of one resource type
//! - [`HandlerDescriptor`]: the static description of one resource handler
//!
//! Nothing here performs I/O.

mod collections;
mod descriptor;
mod identifier;
mod policy;
mod record;
mod schema;

pub use collections::AssetCollections;
pub use descriptor::{HandlerDescriptor, Priority, Stage};
pub use identifier::{Identifier, MatchKey};
pub use policy::Policy;
pub use record::{is_truthy, Asset, ExistingRecord, Record};
pub use schema::{FieldSpec, FieldType, ResourceSchema, Shape};

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in type operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("expected a JSON object, got {0}")]
    NotAnObject(&'static str),

    #[error("expected an array or object for {resource_type}, got {found}")]
    InvalidCollection {
        resource_type: String,
        found: &'static str,
    },
}

/// Short JSON type name used in error messages.
pub(crate) fn json_kind(value: &serde_json::Value) -> &'static str {
    match value {
        serde_json::Value::Null => "null",
        serde_json::Value::Bool(_) => "boolean",
        serde_json::Value::Number(_) => "number",
        serde_json::Value::String(_) => "string",
        serde_json::Value::Array(_) => "array",
        serde_json::Value::Object(_) => "object",
    }
}
