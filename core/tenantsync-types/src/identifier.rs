//! Identifier strategies used to pair desired assets with remote records.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::record::{is_truthy, Record};

/// A matching key: either one field or an ordered tuple of fields.
///
/// Serialises as a plain string (`"name"`) or an array of strings
/// (`["tenant", "name"]`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Identifier {
    Field(String),
    Composite(Vec<String>),
}

/// The key a record produces under one [`Identifier`].
#[derive(Debug, Clone, PartialEq)]
pub struct MatchKey(Vec<Value>);

impl MatchKey {
    /// The component values in identifier order.
    pub fn values(&self) -> &[Value] {
        &self.0
    }
}

impl Identifier {
    /// A single-field identifier.
    pub fn field(name: impl Into<String>) -> Self {
        Self::Field(name.into())
    }

    /// A composite identifier over several fields.
    pub fn composite<I, S>(fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Composite(fields.into_iter().map(Into::into).collect())
    }

    /// Component field names.
    pub fn fields(&self) -> &[String] {
        match self {
            Self::Field(name) => std::slice::from_ref(name),
            Self::Composite(fields) => fields,
        }
    }

    /// Whether this is exactly the single field `name`.
    pub fn is_field(&self, name: &str) -> bool {
        matches!(self.fields(), [only] if only == name)
    }

    /// Computes the record's key, or `None` if any component is missing or
    /// falsy.
    pub fn key_of(&self, record: &Record) -> Option<MatchKey> {
        let fields = self.fields();
        if fields.is_empty() {
            return None;
        }
        fields
            .iter()
            .map(|field| record.get(field).filter(|v| is_truthy(v)).cloned())
            .collect::<Option<Vec<_>>>()
            .map(MatchKey)
    }
}

impl From<&str> for Identifier {
    fn from(name: &str) -> Self {
        Self::field(name)
    }
}

impl From<String> for Identifier {
    fn from(name: String) -> Self {
        Self::Field(name)
    }
}

impl fmt::Display for Identifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.fields().join("+"))
    }
}
