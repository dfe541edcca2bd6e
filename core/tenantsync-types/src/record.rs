use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{json_kind, Error};

/// A single resource instance: a JSON object with arbitrary fields.
///
/// Both sides of a reconciliation use this type. Desired-state records are
/// called assets, remote-state records are called existing records; the
/// aliases below exist only to make signatures read better.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(Map<String, Value>);

/// One desired-state record supplied by the caller.
pub type Asset = Record;

/// One remote-state record as currently stored by the tenant.
pub type ExistingRecord = Record;

impl Record {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self(Map::new())
    }

    /// Wraps an existing JSON map.
    pub fn from_map(map: Map<String, Value>) -> Self {
        Self(map)
    }

    /// Returns a field value.
    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    /// Returns a field value if it is a string.
    pub fn get_str(&self, field: &str) -> Option<&str> {
        self.0.get(field).and_then(Value::as_str)
    }

    /// Returns a field value if it is a boolean.
    pub fn get_bool(&self, field: &str) -> Option<bool> {
        self.0.get(field).and_then(Value::as_bool)
    }

    /// Whether the field is present (any value, including null).
    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    /// Sets a field, returning the previous value.
    pub fn insert(&mut self, field: impl Into<String>, value: impl Into<Value>) -> Option<Value> {
        self.0.insert(field.into(), value.into())
    }

    /// Removes a field, returning its value.
    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    /// Builder-style [`Record::insert`].
    #[must_use]
    pub fn with(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(field, value);
        self
    }

    /// Returns a copy without the given fields.
    #[must_use]
    pub fn without<S: AsRef<str>>(&self, fields: &[S]) -> Self {
        let mut copy = self.clone();
        for field in fields {
            copy.remove(field.as_ref());
        }
        copy
    }

    /// Field names in map order.
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Borrows the underlying map.
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.0
    }

    /// Converts into a JSON object value.
    pub fn into_value(self) -> Value {
        Value::Object(self.0)
    }
}

impl TryFrom<Value> for Record {
    type Error = Error;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(map) => Ok(Self(map)),
            other => Err(Error::NotAnObject(json_kind(&other))),
        }
    }
}

impl From<Record> for Value {
    fn from(record: Record) -> Self {
        record.into_value()
    }
}

impl From<Map<String, Value>> for Record {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

/// JavaScript-style truthiness for JSON values.
///
/// `null`, `false`, `0`, and `""` are falsy; everything else (including empty
/// arrays and objects) is truthy. Identifier components must be truthy to
/// take part in matching.
pub fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
