// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Field Mapping Tables
//!
//! Every stored field, lifecycle value and computed attribute of an entity
//! has exactly one entry saying how it is persisted. Converters look up
//! column names here rather than spelling them inline, so a field with no
//! entry fails loudly with [`ConversionIncompleteError`].

use std::collections::BTreeSet;

use crate::application::conversion::ConversionIncompleteError;
use crate::domain::cache::AttributeTable;
use crate::domain::record::StorageRecord;

const STORAGE_TARGET: &str = "storage";

/// Lifecycle values every entity persists alongside its declared fields
pub const LIFECYCLE_FIELDS: &[&str] = &["id", "version", "created_at", "updated_at"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Persistence {
    /// Scalar column
    Column(&'static str),
    /// Composite flattened into `<prefix>_<part>` columns
    Flattened(&'static str),
    /// Set stored as an ordered list column
    Sequence(&'static str),
    /// Child entities stored as nested records
    ChildRecords(&'static str),
    /// Computed value stored in a column and read back on load
    PersistedNotRecomputed(&'static str),
    /// Computed value with no column; recomputed on load
    RecomputedOnLoad,
}

impl Persistence {
    /// Column holding the value, if it occupies exactly one
    pub fn column(&self) -> Option<&'static str> {
        match self {
            Self::Column(c) | Self::Sequence(c) | Self::ChildRecords(c) | Self::PersistedNotRecomputed(c) => Some(*c),
            Self::Flattened(_) | Self::RecomputedOnLoad => None,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FieldMapping {
    pub field: &'static str,
    pub persistence: Persistence,
}

impl FieldMapping {
    pub const fn new(field: &'static str, persistence: Persistence) -> Self {
        Self { field, persistence }
    }
}

#[derive(Debug)]
pub struct MappingTable {
    pub entity: &'static str,
    pub fields: &'static [FieldMapping],
}

impl MappingTable {
    pub const fn new(entity: &'static str, fields: &'static [FieldMapping]) -> Self {
        Self { entity, fields }
    }

    pub fn get(&self, field: &str) -> Result<Persistence, ConversionIncompleteError> {
        self.fields
            .iter()
            .find(|m| m.field == field)
            .map(|m| m.persistence)
            .ok_or_else(|| self.incomplete(field))
    }

    /// Column name for a field stored in a single column
    pub fn column(&self, field: &str) -> Result<&'static str, ConversionIncompleteError> {
        self.get(field)?.column().ok_or_else(|| self.incomplete(field))
    }

    /// Prefix for a flattened composite field
    pub fn prefix(&self, field: &str) -> Result<&'static str, ConversionIncompleteError> {
        match self.get(field)? {
            Persistence::Flattened(prefix) => Ok(prefix),
            _ => Err(self.incomplete(field)),
        }
    }

    /// Check that every declared field, lifecycle value and computed attribute has an entry
    pub fn check_covers(&self, table: &AttributeTable) -> Result<(), ConversionIncompleteError> {
        let attrs = table.attrs.iter().map(|a| a.name);
        for field in LIFECYCLE_FIELDS.iter().copied().chain(table.fields.iter().copied()).chain(attrs) {
            self.get(field)?;
        }
        Ok(())
    }

    /// Columns this table writes, given the expanded columns of flattened groups
    pub fn declared_columns(&self, flattened: &[String]) -> BTreeSet<String> {
        self.fields
            .iter()
            .filter_map(|m| m.persistence.column())
            .map(str::to_string)
            .chain(flattened.iter().cloned())
            .collect()
    }

    /// Reject a record carrying a column no entry declares
    pub fn check_columns(&self, record: &StorageRecord, flattened: &[String]) -> Result<(), ConversionIncompleteError> {
        let declared = self.declared_columns(flattened);
        match record.columns().find(|c| !declared.contains(*c)) {
            Some(column) => Err(ConversionIncompleteError::new(
                format!("{} column '{}'", self.entity, column),
                "the domain model",
            )),
            None => Ok(()),
        }
    }

    fn incomplete(&self, field: &str) -> ConversionIncompleteError {
        ConversionIncompleteError::new(format!("{}.{}", self.entity, field), STORAGE_TARGET)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cache::ComputedAttr;

    static SHELF: AttributeTable = AttributeTable::new(
        "Shelf",
        &["name", "size"],
        &[ComputedAttr::derived("label", &["name"])],
    );

    static COMPLETE: MappingTable = MappingTable::new(
        "shelf",
        &[
            FieldMapping::new("id", Persistence::Column("id")),
            FieldMapping::new("version", Persistence::Column("version")),
            FieldMapping::new("created_at", Persistence::Column("created_at")),
            FieldMapping::new("updated_at", Persistence::Column("updated_at")),
            FieldMapping::new("name", Persistence::Column("name")),
            FieldMapping::new("size", Persistence::Flattened("size")),
            FieldMapping::new("label", Persistence::RecomputedOnLoad),
        ],
    );

    static MISSING: MappingTable = MappingTable::new(
        "shelf",
        &[FieldMapping::new("name", Persistence::Column("name"))],
    );

    #[test]
    fn test_coverage() {
        assert!(COMPLETE.check_covers(&SHELF).is_ok());
        let err = MISSING.check_covers(&SHELF).unwrap_err();
        assert_eq!(err.field, "shelf.id");
    }

    #[test]
    fn test_lookup_kinds() {
        assert_eq!(COMPLETE.column("name").unwrap(), "name");
        assert_eq!(COMPLETE.prefix("size").unwrap(), "size");
        assert!(COMPLETE.column("size").is_err());
        assert!(COMPLETE.column("label").is_err());
        assert_eq!(COMPLETE.column("colour").unwrap_err().field, "shelf.colour");
    }

    #[test]
    fn test_unknown_columns_rejected() {
        let flattened = vec!["size_width".to_string()];
        let ok = StorageRecord::new().with("name", "top").with("size_width", 3u32);
        assert!(COMPLETE.check_columns(&ok, &flattened).is_ok());

        let extra = ok.with("colour", "red");
        let err = COMPLETE.check_columns(&extra, &flattened).unwrap_err();
        assert_eq!(err.field, "shelf column 'colour'");
    }
}
