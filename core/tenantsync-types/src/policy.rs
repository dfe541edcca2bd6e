use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Named run flags queried by key.
///
/// Values are free-form JSON so configuration files and CLI overrides can
/// both feed it. Booleans also accept `"true"`/`"false"` strings and numbers.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Policy(BTreeMap<String, Value>);

impl Policy {
    /// Global allow-delete flag.
    pub const ALLOW_DELETE: &'static str = "allow_delete";
    /// Prefix for per-type names that must never be touched (`excluded.rules`).
    pub const EXCLUDED: &'static str = "excluded";
    /// The client id the deployment authenticates as; never deleted.
    pub const CLIENT_ID: &'static str = "client_id";
    /// Audience of the management API resource server; never reconciled.
    pub const MANAGEMENT_AUDIENCE: &'static str = "management_audience";

    /// Creates an empty policy (everything disabled).
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets a key.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    /// Builder-style [`Policy::set`].
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.set(key, value);
        self
    }

    /// Raw value for a key.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    /// Boolean flag; missing or unparseable values read as `false`.
    pub fn flag(&self, key: &str) -> bool {
        self.0.get(key).and_then(as_flag).unwrap_or(false)
    }

    /// String value for a key.
    pub fn string(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// List of strings: a JSON array of strings or a comma-separated string.
    pub fn strings(&self, key: &str) -> Vec<String> {
        match self.0.get(key) {
            Some(Value::Array(items)) => items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect(),
            Some(Value::String(s)) => s
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Whether deletions are allowed for a resource type. A per-type
    /// `allow_delete.<type>` key overrides the global flag.
    pub fn allows_delete(&self, resource_type: &str) -> bool {
        let scoped = format!("{}.{resource_type}", Self::ALLOW_DELETE);
        match self.0.get(&scoped).and_then(as_flag) {
            Some(allowed) => allowed,
            None => self.flag(Self::ALLOW_DELETE),
        }
    }

    /// Names of a resource type excluded from reconciliation.
    pub fn excluded(&self, resource_type: &str) -> Vec<String> {
        self.strings(&format!("{}.{resource_type}", Self::EXCLUDED))
    }
}

fn as_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(b) => Some(*b),
        Value::String(s) => match s.trim().to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Some(true),
            "false" | "no" | "0" | "" => Some(false),
            _ => None,
        },
        Value::Number(n) => n.as_f64().map(|f| f != 0.0),
        _ => None,
    }
}
