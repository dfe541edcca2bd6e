use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::record::Record;
use crate::{json_kind, Error, Result};

/// The desired configuration: one JSON value per resource type.
///
/// List-shaped types hold an array of records, settings-shaped types hold a
/// single object. The map is immutable input to a run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetCollections(BTreeMap<String, Value>);

impl AssetCollections {
    /// Creates an empty collection set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses collections from a JSON document whose top level is an object.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let value: Value = serde_json::from_str(json)?;
        match value {
            Value::Object(map) => Ok(Self(map.into_iter().collect())),
            other => Err(Error::NotAnObject(json_kind(&other))),
        }
    }

    /// Sets the collection for a resource type.
    pub fn insert(&mut self, resource_type: impl Into<String>, value: Value) {
        self.0.insert(resource_type.into(), value);
    }

    /// Builder-style [`AssetCollections::insert`].
    #[must_use]
    pub fn with(mut self, resource_type: impl Into<String>, value: Value) -> Self {
        self.insert(resource_type, value);
        self
    }

    /// Returns the raw collection for a resource type.
    pub fn get(&self, resource_type: &str) -> Option<&Value> {
        self.0.get(resource_type)
    }

    /// Returns the records of a resource type, or `None` when the type is not
    /// configured at all (absent or null).
    pub fn records(&self, resource_type: &str) -> Result<Option<Vec<Record>>> {
        records_of(resource_type, self.0.get(resource_type))
    }

    /// Configured resource type names in sorted order.
    pub fn resource_types(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Number of configured resource types.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether nothing is configured.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Consumes the collections into the underlying map.
    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.0
    }
}

impl FromIterator<(String, Value)> for AssetCollections {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Interprets one collection value as records: arrays yield each element,
/// objects yield themselves, absence or null yields `None`.
fn records_of(resource_type: &str, value: Option<&Value>) -> Result<Option<Vec<Record>>> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Array(items)) => items
            .iter()
            .cloned()
            .map(Record::try_from)
            .collect::<Result<Vec<_>>>()
            .map(Some),
        Some(Value::Object(map)) => Ok(Some(vec![Record::from_map(map.clone())])),
        Some(other) => Err(Error::InvalidCollection {
            resource_type: resource_type.to_string(),
            found: json_kind(other),
        }),
    }
}
