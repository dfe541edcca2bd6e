use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::json_kind;

/// Describes the accepted shape of one resource type's desired configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceSchema {
    pub resource_type: String,
    pub shape: Shape,
    pub fields: Vec<FieldSpec>,
}

/// Whether a resource type is configured as a list of records or a single
/// settings object.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Shape {
    Array,
    Object,
}

/// One declared field of a record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldSpec {
    pub name: String,
    pub field_type: FieldType,
    #[serde(default)]
    pub required: bool,
    /// Allowed values. Only meaningful when FieldType is Enum.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub enum_options: Option<Vec<String>>,
}

/// The JSON type a field must carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    String,
    Bool,
    Number,
    Integer,
    Array,
    Object,
    Enum,
}

impl FieldSpec {
    fn simple(name: &str, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: false,
            enum_options: None,
        }
    }

    /// Shorthand for a string field.
    pub fn string(name: &str) -> Self {
        Self::simple(name, FieldType::String)
    }

    /// Shorthand for a boolean field.
    pub fn bool(name: &str) -> Self {
        Self::simple(name, FieldType::Bool)
    }

    /// Shorthand for a numeric field.
    pub fn number(name: &str) -> Self {
        Self::simple(name, FieldType::Number)
    }

    /// Shorthand for an integer field.
    pub fn integer(name: &str) -> Self {
        Self::simple(name, FieldType::Integer)
    }

    /// Shorthand for an array field.
    pub fn array(name: &str) -> Self {
        Self::simple(name, FieldType::Array)
    }

    /// Shorthand for a nested object field.
    pub fn object(name: &str) -> Self {
        Self::simple(name, FieldType::Object)
    }

    /// Shorthand for a string field restricted to fixed options.
    pub fn enumeration(name: &str, options: &[&str]) -> Self {
        Self {
            name: name.into(),
            field_type: FieldType::Enum,
            required: false,
            enum_options: Some(options.iter().map(|o| (*o).to_string()).collect()),
        }
    }

    /// Marks the field as required.
    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Checks one value against this field's type. Returns a description of
    /// the mismatch, if any.
    pub fn check(&self, value: &Value) -> Option<String> {
        let ok = match self.field_type {
            FieldType::String => value.is_string(),
            FieldType::Bool => value.is_boolean(),
            FieldType::Number => value.is_number(),
            FieldType::Integer => value.is_i64() || value.is_u64(),
            FieldType::Array => value.is_array(),
            FieldType::Object => value.is_object(),
            FieldType::Enum => {
                let options = self.enum_options.as_deref().unwrap_or_default();
                return match value.as_str() {
                    Some(s) if options.iter().any(|o| o == s) => None,
                    Some(s) => Some(format!(
                        "{} must be one of [{}], got \"{s}\"",
                        self.name,
                        options.join(", ")
                    )),
                    None => Some(format!(
                        "{} must be a string, got {}",
                        self.name,
                        json_kind(value)
                    )),
                };
            }
        };
        (!ok).then(|| {
            format!(
                "{} must be of type {:?}, got {}",
                self.name,
                self.field_type,
                json_kind(value)
            )
        })
    }
}

impl ResourceSchema {
    /// An array-shaped schema.
    pub fn array(resource_type: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            resource_type: resource_type.into(),
            shape: Shape::Array,
            fields,
        }
    }

    /// An object-shaped schema.
    pub fn object(resource_type: &str, fields: Vec<FieldSpec>) -> Self {
        Self {
            resource_type: resource_type.into(),
            shape: Shape::Object,
            fields,
        }
    }

    /// Checks a whole collection value and returns every violation found.
    /// An empty result means the value conforms.
    pub fn violations(&self, value: &Value) -> Vec<String> {
        let mut out = Vec::new();
        match (self.shape, value) {
            (Shape::Array, Value::Array(items)) => {
                for (index, item) in items.iter().enumerate() {
                    let at = format!("{}[{index}]", self.resource_type);
                    self.check_record(&at, item, &mut out);
                }
            }
            (Shape::Object, Value::Object(_)) => {
                self.check_record(&self.resource_type, value, &mut out);
            }
            (shape, other) => out.push(format!(
                "{} must be {}, got {}",
                self.resource_type,
                match shape {
                    Shape::Array => "an array",
                    Shape::Object => "an object",
                },
                json_kind(other)
            )),
        }
        out
    }

    fn check_record(&self, at: &str, item: &Value, out: &mut Vec<String>) {
        let Some(map) = item.as_object() else {
            out.push(format!("{at} must be an object, got {}", json_kind(item)));
            return;
        };
        for field in &self.fields {
            match map.get(&field.name) {
                None | Some(Value::Null) if field.required => {
                    out.push(format!("{at}: missing required field {}", field.name));
                }
                None | Some(Value::Null) => {}
                Some(value) => {
                    if let Some(problem) = field.check(value) {
                        out.push(format!("{at}: {problem}"));
                    }
                }
            }
        }
    }
}
