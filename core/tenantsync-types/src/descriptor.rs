use serde::{Deserialize, Serialize};
use std::fmt;

use crate::identifier::Identifier;

/// The two run-wide lifecycle stages, executed in declaration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Stage {
    Validate,
    ProcessChanges,
}

impl Stage {
    /// All stages in execution order.
    pub const ALL: [Stage; 2] = [Stage::Validate, Stage::ProcessChanges];
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Stage::Validate => "validate",
            Stage::ProcessChanges => "processChanges",
        })
    }
}

/// Per-stage ordering key. Lower runs first; ties keep registration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Priority {
    pub validate: u32,
    pub process_changes: u32,
}

impl Priority {
    /// Priority used when a handler does not declare one.
    pub const DEFAULT: u32 = 50;

    /// The same priority for every stage.
    pub const fn uniform(priority: u32) -> Self {
        Self {
            validate: priority,
            process_changes: priority,
        }
    }

    /// The priority for one stage.
    pub const fn for_stage(&self, stage: Stage) -> u32 {
        match stage {
            Stage::Validate => self.validate,
            Stage::ProcessChanges => self.process_changes,
        }
    }
}

impl Default for Priority {
    fn default() -> Self {
        Self::uniform(Self::DEFAULT)
    }
}

/// Static description of one resource handler, fixed for the run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandlerDescriptor {
    /// Resource type name, also the key in the asset collections.
    pub resource_type: String,
    /// Management API path segment (e.g. `resource-servers`).
    pub path: String,
    /// Key holding the records when the API wraps them in an object.
    pub collection_key: String,
    /// Field carrying the remote id used in update/delete calls.
    pub id_field: String,
    /// Matching strategies in priority order; the first is the primary key.
    pub identifiers: Vec<Identifier>,
    /// Fields the API rejects in update payloads.
    pub strip_update_fields: Vec<String>,
    pub priority: Priority,
    /// Whether `get_all` must be paged.
    pub paginate: bool,
}

impl HandlerDescriptor {
    /// A descriptor with the conventional defaults: path and collection key
    /// equal to the type, identifiers `[id_field, name]`, paged listing.
    pub fn new(resource_type: &str, id_field: &str) -> Self {
        Self {
            resource_type: resource_type.into(),
            path: resource_type.into(),
            collection_key: resource_type.into(),
            id_field: id_field.into(),
            identifiers: vec![Identifier::field(id_field), Identifier::field("name")],
            strip_update_fields: vec![id_field.into()],
            priority: Priority::default(),
            paginate: true,
        }
    }

    #[must_use]
    pub fn with_path(mut self, path: &str) -> Self {
        self.path = path.into();
        self
    }

    #[must_use]
    pub fn with_collection_key(mut self, key: &str) -> Self {
        self.collection_key = key.into();
        self
    }

    #[must_use]
    pub fn with_identifiers(mut self, identifiers: Vec<Identifier>) -> Self {
        self.identifiers = identifiers;
        self
    }

    /// Declares fields stripped from update payloads. The id field is always
    /// kept in the list.
    #[must_use]
    pub fn strip_on_update(mut self, fields: &[&str]) -> Self {
        self.strip_update_fields = fields.iter().map(|f| (*f).to_string()).collect();
        if !self.strip_update_fields.contains(&self.id_field) {
            self.strip_update_fields.insert(0, self.id_field.clone());
        }
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn paginated(mut self, paginate: bool) -> Self {
        self.paginate = paginate;
        self
    }

    /// The primary identifier, used for rename-collision detection.
    pub fn primary(&self) -> Option<&Identifier> {
        self.identifiers.first()
    }
}
