//! Change-set calculation.
//!
//! Pairs desired assets with existing records using identifier strategies in
//! priority order, then partitions both sides into create, update and
//! delete lists. A second pass queues temporary renames for existing records
//! whose `name` is about to be taken by a different record.

use rand::Rng;
use serde::Serialize;
use tenantsync_types::{is_truthy, Asset, ExistingRecord, Identifier, Record};

const NAME: &str = "name";
const SUFFIX_LEN: usize = 5;
const SUFFIX_CHARS: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// The outcome of diffing one resource type.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ChangeSet {
    /// Assets with no existing counterpart.
    pub create: Vec<Asset>,
    /// Matched assets, carrying the existing record's identifier fields.
    pub update: Vec<Asset>,
    /// Existing records no asset matched.
    pub delete: Vec<ExistingRecord>,
    /// Existing records renamed out of the way, to apply before create/update.
    pub conflicts: Vec<ExistingRecord>,
}

impl ChangeSet {
    /// Whether nothing needs to happen.
    pub fn is_empty(&self) -> bool {
        self.create.is_empty()
            && self.update.is_empty()
            && self.delete.is_empty()
            && self.conflicts.is_empty()
    }
}

/// Diffs desired assets against existing records.
///
/// ```
/// use serde_json::json;
/// use tenantsync_engine::ChangeCalculator;
/// use tenantsync_types::{Identifier, Record};
///
/// let rec = |v: serde_json::Value| Record::try_from(v).unwrap();
/// let identifiers = [Identifier::field("id"), Identifier::field("name")];
/// let changes = ChangeCalculator::new(&identifiers).calculate(
///     vec![rec(json!({"name": "web"})), rec(json!({"name": "new"}))],
///     vec![rec(json!({"id": "1", "name": "web"})), rec(json!({"id": "2", "name": "old"}))],
/// );
/// assert_eq!(changes.update[0].get_str("id"), Some("1"));
/// assert_eq!(changes.create.len(), 1);
/// assert_eq!(changes.delete[0].get_str("name"), Some("old"));
/// ```
#[derive(Debug, Clone)]
pub struct ChangeCalculator<'a> {
    identifiers: &'a [Identifier],
    carry: Vec<String>,
    deletions_enabled: bool,
}

impl<'a> ChangeCalculator<'a> {
    /// A calculator over `identifiers`, strongest first.
    pub fn new(identifiers: &'a [Identifier]) -> Self {
        Self {
            identifiers,
            carry: Vec::new(),
            deletions_enabled: true,
        }
    }

    /// Whether records left unmatched will actually be deleted. Defaults to
    /// `true`.
    ///
    /// This decides whether a name held by the wrong record is a conflict.
    /// Given existing `{id: 1, name: "A"}` and desired `{id: 2, name: "A"}`,
    /// record 1 is unmatched. With deletions enabled it lands in `delete`,
    /// and since deletes run before creates the name is free again, so no
    /// rename is queued. With deletions disabled record 1 survives, keeps
    /// the name taken, and goes into `conflicts` under a suffixed name.
    ///
    /// ```
    /// use tenantsync_engine::ChangeCalculator;
    /// use tenantsync_types::{Identifier, Record};
    /// use serde_json::json;
    ///
    /// let identifiers = [Identifier::field("id"), Identifier::field("name")];
    /// let existing = || vec![Record::try_from(json!({"id": 1, "name": "A"})).unwrap()];
    /// let desired = || vec![Record::try_from(json!({"id": 2, "name": "A"})).unwrap()];
    ///
    /// let freed = ChangeCalculator::new(&identifiers).calculate(desired(), existing());
    /// assert!(freed.conflicts.is_empty());
    /// assert_eq!(freed.delete.len(), 1);
    ///
    /// let kept = ChangeCalculator::new(&identifiers)
    ///     .deletions_enabled(false)
    ///     .calculate(desired(), existing());
    /// assert_eq!(kept.conflicts.len(), 1);
    /// ```
    #[must_use]
    pub fn deletions_enabled(mut self, enabled: bool) -> Self {
        self.deletions_enabled = enabled;
        self
    }

    /// Extra fields copied from the existing record into update records,
    /// in addition to every identifier field.
    #[must_use]
    pub fn carrying(mut self, fields: &[&str]) -> Self {
        self.carry = fields.iter().map(|f| (*f).to_string()).collect();
        self
    }

    pub fn calculate(&self, desired: Vec<Asset>, existing: Vec<ExistingRecord>) -> ChangeSet {
        let mut pending: Vec<Option<Asset>> = desired.into_iter().map(Some).collect();
        let mut unmatched = vec![true; existing.len()];
        let mut update = Vec::new();

        for (rank, identifier) in self.identifiers.iter().enumerate() {
            let stronger = &self.identifiers[..rank];
            for slot in pending.iter_mut() {
                let found = {
                    let Some(asset) = slot.as_ref() else {
                        continue;
                    };
                    let Some(key) = identifier.key_of(asset) else {
                        continue;
                    };
                    (0..existing.len()).find(|&i| {
                        unmatched[i]
                            && identifier.key_of(&existing[i]).as_ref() == Some(&key)
                            && !contradicts(stronger, asset, &existing[i])
                    })
                };
                let Some(i) = found else {
                    continue;
                };
                let Some(asset) = slot.take() else {
                    continue;
                };
                unmatched[i] = false;
                update.push(self.merged(&existing[i], asset));
            }
        }

        let create: Vec<Asset> = pending.into_iter().flatten().collect();
        let conflicts = self.conflicts(&existing, &unmatched, create.iter().chain(&update));
        let delete = existing
            .into_iter()
            .zip(unmatched)
            .filter_map(|(record, unmatched)| unmatched.then_some(record))
            .collect();

        ChangeSet {
            create,
            update,
            delete,
            conflicts,
        }
    }

    /// The existing record's identifier fields overlaid by the asset.
    fn merged(&self, record: &ExistingRecord, asset: Asset) -> Asset {
        let mut merged = Record::new();
        let carried = self
            .identifiers
            .iter()
            .flat_map(Identifier::fields)
            .chain(&self.carry);
        for field in carried {
            if let Some(value) = record.get(field) {
                merged.insert(field.clone(), value.clone());
            }
        }
        for (field, value) in asset.as_map() {
            if value.is_null() && merged.contains(field) {
                continue;
            }
            merged.insert(field.clone(), value.clone());
        }
        merged
    }

    fn conflicts<'r>(
        &self,
        existing: &[ExistingRecord],
        unmatched: &[bool],
        outgoing: impl Iterator<Item = &'r Asset>,
    ) -> Vec<ExistingRecord> {
        let Some(primary) = self.identifiers.first() else {
            return Vec::new();
        };
        let tracks_name = self.identifiers.iter().any(|i| i.is_field(NAME));
        if !tracks_name || primary.is_field(NAME) {
            return Vec::new();
        }

        let mut renamed = vec![false; existing.len()];
        let mut conflicts = Vec::new();
        for asset in outgoing {
            let Some(name) = asset.get(NAME).filter(|v| is_truthy(v)) else {
                continue;
            };
            let asset_key = primary.key_of(asset);
            for (i, record) in existing.iter().enumerate() {
                if renamed[i] || record.get(NAME) != Some(name) {
                    continue;
                }
                if primary.key_of(record) == asset_key {
                    continue;
                }
                // The delete frees the name on its own.
                if unmatched[i] && self.deletions_enabled {
                    continue;
                }
                renamed[i] = true;
                let taken = name.as_str().map_or_else(|| name.to_string(), str::to_string);
                conflicts.push(record.clone().with(NAME, format!("{taken}-{}", rename_suffix())));
            }
        }
        conflicts
    }
}

/// Diffs with deletions enabled and no carried fields.
pub fn calculate_changes(
    desired: Vec<Asset>,
    existing: Vec<ExistingRecord>,
    identifiers: &[Identifier],
) -> ChangeSet {
    ChangeCalculator::new(identifiers).calculate(desired, existing)
}

/// True when a stronger identifier is present on both sides and differs, so
/// a weaker one must not pair them.
fn contradicts(stronger: &[Identifier], asset: &Asset, record: &ExistingRecord) -> bool {
    stronger.iter().any(|identifier| {
        match (identifier.key_of(asset), identifier.key_of(record)) {
            (Some(a), Some(r)) => a != r,
            _ => false,
        }
    })
}

fn rename_suffix() -> String {
    let mut rng = rand::thread_rng();
    (0..SUFFIX_LEN)
        .map(|_| SUFFIX_CHARS[rng.gen_range(0..SUFFIX_CHARS.len())] as char)
        .collect()
}
