// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Cache Ledger
//!
//! Per-instance memoization of computed attributes, with invalidation driven
//! by a static, per-type dependency table.
//!
//! ## Declaration
//!
//! Each entity type declares an [`AttributeTable`]: its field paths and every
//! computed attribute with the field paths it depends on. The table is checked
//! once per type (see [`AttributeTable::check`]) the first time an instance is
//! built. An attribute with no dependencies must be declared with
//! [`ComputedAttr::manual`]; an empty [`ComputedAttr::derived`] list is a
//! declaration error.
//!
//! ## Dependency paths
//!
//! Dependencies are dotted paths. A change to `p` invalidates an attribute
//! depending on `d` when the two paths overlap: equal, `d` beneath `p`
//! (`recipes` covers `recipes.tags`), or `p` beneath `d`.
//!
//! ## Ownership
//!
//! A ledger lives inside exactly one entity value. It uses a `RefCell`, so the
//! owning entity is `Send` but not `Sync`; callers that share an entity across
//! tasks wrap the whole entity in their own lock.

use std::any::Any;
use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::convert::Infallible;
use std::fmt;
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, warn};

/// Field paths written by one logical mutation
pub type ChangedFields = BTreeSet<String>;

/// Build a [`ChangedFields`] set from string slices
pub fn changed_fields<'a>(paths: impl IntoIterator<Item = &'a str>) -> ChangedFields {
    paths.into_iter().map(str::to_string).collect()
}

/// Whether two dotted field paths overlap
pub fn paths_overlap(a: &str, b: &str) -> bool {
    a == b || is_beneath(a, b) || is_beneath(b, a)
}

fn is_beneath(child: &str, parent: &str) -> bool {
    child.len() > parent.len()
        && child.starts_with(parent)
        && child.as_bytes()[parent.len()] == b'.'
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dependencies {
    Fields(&'static [&'static str]),
    ManualOnly,
}

/// Declaration of one computed attribute
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComputedAttr {
    pub name: &'static str,
    dependencies: Dependencies,
}

impl ComputedAttr {
    /// Attribute recomputed whenever any of `fields` changes
    pub const fn derived(name: &'static str, fields: &'static [&'static str]) -> Self {
        Self {
            name,
            dependencies: Dependencies::Fields(fields),
        }
    }

    /// Attribute cleared only by explicit invalidation
    pub const fn manual(name: &'static str) -> Self {
        Self {
            name,
            dependencies: Dependencies::ManualOnly,
        }
    }

    pub fn depends_on(&self) -> &'static [&'static str] {
        match self.dependencies {
            Dependencies::Fields(fields) => fields,
            Dependencies::ManualOnly => &[],
        }
    }

    pub fn is_manual(&self) -> bool {
        matches!(self.dependencies, Dependencies::ManualOnly)
    }

    fn affected_by(&self, path: &str) -> bool {
        self.depends_on().iter().any(|dep| paths_overlap(dep, path))
    }
}

/// Declaration errors found by [`AttributeTable::check`]
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum AttributeTableError {
    #[error("{entity}: computed attribute '{name}' is declared more than once")]
    DuplicateAttribute { entity: &'static str, name: &'static str },

    #[error("{entity}: computed attribute '{name}' declares no dependencies; use ComputedAttr::manual")]
    MissingDependencies { entity: &'static str, name: &'static str },

    #[error("{entity}: computed attribute '{name}' depends on unknown field '{field}'")]
    UnknownField {
        entity: &'static str,
        name: &'static str,
        field: &'static str,
    },

    #[error("{entity}: computed attribute '{name}' has the same name as a stored field")]
    ShadowsField { entity: &'static str, name: &'static str },
}

/// Static, per-type table of computed attributes and their dependencies
#[derive(Debug)]
pub struct AttributeTable {
    pub entity: &'static str,
    pub fields: &'static [&'static str],
    pub attrs: &'static [ComputedAttr],
}

impl AttributeTable {
    pub const fn new(
        entity: &'static str,
        fields: &'static [&'static str],
        attrs: &'static [ComputedAttr],
    ) -> Self {
        Self {
            entity,
            fields,
            attrs,
        }
    }

    /// Validate the declaration
    pub fn check(&self) -> Result<(), AttributeTableError> {
        let mut seen = BTreeSet::new();
        for attr in self.attrs {
            if !seen.insert(attr.name) {
                return Err(AttributeTableError::DuplicateAttribute {
                    entity: self.entity,
                    name: attr.name,
                });
            }
            if self.fields.contains(&attr.name) {
                return Err(AttributeTableError::ShadowsField {
                    entity: self.entity,
                    name: attr.name,
                });
            }
            if attr.is_manual() {
                continue;
            }
            if attr.depends_on().is_empty() {
                return Err(AttributeTableError::MissingDependencies {
                    entity: self.entity,
                    name: attr.name,
                });
            }
            for &dep in attr.depends_on() {
                let root = dep.split('.').next().unwrap_or(dep);
                if !self.fields.contains(&root) {
                    return Err(AttributeTableError::UnknownField {
                        entity: self.entity,
                        name: attr.name,
                        field: dep,
                    });
                }
            }
        }
        Ok(())
    }

    /// Validate and hand back a `'static` reference; for use inside a `Lazy`
    ///
    /// A malformed table is a defect in the entity's source, so it aborts
    /// the first construction of that entity type.
    pub fn checked(&'static self) -> &'static Self {
        if let Err(e) = self.check() {
            panic!("invalid computed attribute table: {e}");
        }
        debug!(entity = self.entity, attributes = self.attrs.len(), "computed attribute table checked");
        self
    }

    pub fn get(&self, name: &str) -> Option<&ComputedAttr> {
        self.attrs.iter().find(|attr| attr.name == name)
    }

    /// Names of the attributes a change to `changed` must invalidate
    pub fn affected_by(&self, changed: &ChangedFields) -> BTreeSet<&'static str> {
        self.attrs
            .iter()
            .filter(|attr| changed.iter().any(|path| attr.affected_by(path)))
            .map(|attr| attr.name)
            .collect()
    }
}

/// Per-instance memo table for one entity
pub struct CacheLedger {
    table: &'static AttributeTable,
    entries: RefCell<HashMap<&'static str, Arc<dyn Any + Send + Sync>>>,
}

impl CacheLedger {
    pub fn new(table: &'static AttributeTable) -> Self {
        Self {
            table,
            entries: RefCell::new(HashMap::new()),
        }
    }

    pub fn table(&self) -> &'static AttributeTable {
        self.table
    }

    /// Return the memoized value for `name`, computing and storing it first if absent
    ///
    /// A failed computation stores nothing; the next read tries again.
    /// Attributes missing from the table are computed but never memoized.
    pub fn get_or_compute<T, E, F>(&self, name: &'static str, compute: F) -> Result<Arc<T>, E>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> Result<T, E>,
    {
        let Some(attr) = self.table.get(name) else {
            warn!(
                entity = self.table.entity,
                attribute = name,
                "computed attribute is not declared; value will not be memoized"
            );
            return compute().map(Arc::new);
        };

        if let Some(hit) = self.lookup::<T>(attr.name) {
            debug!(entity = self.table.entity, attribute = attr.name, "cache hit");
            return Ok(hit);
        }

        debug!(entity = self.table.entity, attribute = attr.name, "cache miss");
        let value = Arc::new(compute()?);
        let stored: Arc<dyn Any + Send + Sync> = value.clone();
        self.entries.borrow_mut().insert(attr.name, stored);
        Ok(value)
    }

    /// Infallible form of [`CacheLedger::get_or_compute`]
    pub fn get_or_insert_with<T, F>(&self, name: &'static str, compute: F) -> Arc<T>
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        match self.get_or_compute::<T, Infallible, _>(name, || Ok(compute())) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }

    fn lookup<T: Any + Send + Sync>(&self, name: &'static str) -> Option<Arc<T>> {
        let entry = self.entries.borrow().get(name).cloned()?;
        match entry.downcast::<T>() {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(
                    entity = self.table.entity,
                    attribute = name,
                    "memoized value has an unexpected type; recomputing"
                );
                None
            }
        }
    }

    /// Clear every memoized attribute whose dependencies overlap `changed`
    ///
    /// Returns the names actually cleared. Entries already absent are skipped.
    pub fn invalidate(&mut self, changed: &ChangedFields) -> BTreeSet<&'static str> {
        let entries = self.entries.get_mut();
        let cleared: BTreeSet<&'static str> = self
            .table
            .affected_by(changed)
            .into_iter()
            .filter(|name| entries.remove(name).is_some())
            .collect();
        if !cleared.is_empty() {
            debug!(
                entity = self.table.entity,
                changed = ?changed,
                cleared = ?cleared,
                "invalidated computed attributes"
            );
        }
        cleared
    }

    /// Clear every memoized attribute, including manual-only ones
    pub fn invalidate_all(&mut self) -> usize {
        let entries = self.entries.get_mut();
        let count = entries.len();
        entries.clear();
        if count > 0 {
            debug!(entity = self.table.entity, cleared = count, "invalidated all computed attributes");
        }
        count
    }

    /// Clear a single attribute by name
    pub fn forget(&mut self, name: &str) -> bool {
        self.entries.get_mut().remove(name).is_some()
    }

    pub fn is_memoized(&self, name: &str) -> bool {
        self.entries.borrow().contains_key(name)
    }

    /// Names of the currently memoized attributes
    pub fn memoized(&self) -> BTreeSet<&'static str> {
        self.entries.borrow().keys().copied().collect()
    }
}

impl Clone for CacheLedger {
    /// A cloned entity starts with a cold ledger
    fn clone(&self) -> Self {
        Self::new(self.table)
    }
}

impl fmt::Debug for CacheLedger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheLedger")
            .field("entity", &self.table.entity)
            .field("memoized", &self.memoized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    static TEST_TABLE: AttributeTable = AttributeTable::new(
        "Shelf",
        &["name", "items", "owner"],
        &[
            ComputedAttr::derived("label", &["name"]),
            ComputedAttr::derived("item_weight", &["items.weight"]),
            ComputedAttr::derived("summary", &["name", "items"]),
            ComputedAttr::manual("code"),
        ],
    );

    fn ledger() -> CacheLedger {
        CacheLedger::new(TEST_TABLE.checked())
    }

    #[test]
    fn test_paths_overlap() {
        assert!(paths_overlap("items", "items"));
        assert!(paths_overlap("items", "items.weight"));
        assert!(paths_overlap("items.weight", "items"));
        assert!(!paths_overlap("items.weight", "items.tags"));
        assert!(!paths_overlap("item", "items"));
        assert!(!paths_overlap("items", "itemsx.weight"));
    }

    #[test]
    fn test_second_read_returns_same_allocation() {
        let ledger = ledger();
        let calls = Cell::new(0);
        let first = ledger.get_or_insert_with("label", || {
            calls.set(calls.get() + 1);
            "pantry".to_string()
        });
        let second = ledger.get_or_insert_with("label", || {
            calls.set(calls.get() + 1);
            "other".to_string()
        });
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(calls.get(), 1);
        assert!(ledger.is_memoized("label"));
    }

    #[test]
    fn test_failed_computation_is_not_memoized() {
        let ledger = ledger();
        let failed: Result<Arc<u64>, &str> = ledger.get_or_compute("item_weight", || Err("overflow"));
        assert_eq!(failed.unwrap_err(), "overflow");
        assert!(!ledger.is_memoized("item_weight"));

        let value: Result<Arc<u64>, &str> = ledger.get_or_compute("item_weight", || Ok(42));
        assert_eq!(*value.unwrap(), 42);
        assert!(ledger.is_memoized("item_weight"));
    }

    #[test]
    fn test_invalidate_clears_only_dependents() {
        let mut ledger = ledger();
        ledger.get_or_insert_with("label", || 1u8);
        ledger.get_or_insert_with("item_weight", || 2u8);
        ledger.get_or_insert_with("summary", || 3u8);
        ledger.get_or_insert_with("code", || 4u8);

        let cleared = ledger.invalidate(&changed_fields(["items.weight"]));
        assert_eq!(cleared, BTreeSet::from(["item_weight", "summary"]));
        assert_eq!(ledger.memoized(), BTreeSet::from(["code", "label"]));

        // Idempotent: already-absent entries are simply skipped
        assert!(ledger.invalidate(&changed_fields(["items.weight"])).is_empty());
    }

    #[test]
    fn test_invalidate_unrelated_field_keeps_everything() {
        let mut ledger = ledger();
        ledger.get_or_insert_with("label", || 1u8);
        assert!(ledger.invalidate(&changed_fields(["owner"])).is_empty());
        assert!(ledger.is_memoized("label"));
    }

    #[test]
    fn test_manual_attribute_survives_field_changes() {
        let mut ledger = ledger();
        ledger.get_or_insert_with("code", || "A1".to_string());
        ledger.invalidate(&changed_fields(["name", "items", "owner"]));
        assert!(ledger.is_memoized("code"));

        assert!(ledger.forget("code"));
        assert!(!ledger.forget("code"));
    }

    #[test]
    fn test_invalidate_all() {
        let mut ledger = ledger();
        ledger.get_or_insert_with("label", || 1u8);
        ledger.get_or_insert_with("code", || 2u8);
        assert_eq!(ledger.invalidate_all(), 2);
        assert!(ledger.memoized().is_empty());
        assert_eq!(ledger.invalidate_all(), 0);
    }

    #[test]
    fn test_undeclared_attribute_is_never_memoized() {
        let ledger = ledger();
        let value = ledger.get_or_insert_with("unknown", || 7u8);
        assert_eq!(*value, 7);
        assert!(!ledger.is_memoized("unknown"));
    }

    #[test]
    fn test_type_mismatch_recomputes() {
        let ledger = ledger();
        ledger.get_or_insert_with("label", || 1u8);
        let value = ledger.get_or_insert_with("label", || "text".to_string());
        assert_eq!(value.as_str(), "text");
    }

    #[test]
    fn test_clone_starts_cold() {
        let ledger = ledger();
        ledger.get_or_insert_with("label", || 1u8);
        let cloned = ledger.clone();
        assert!(cloned.memoized().is_empty());
        assert!(ledger.is_memoized("label"));
    }

    #[test]
    fn test_table_check_rejects_bad_declarations() {
        static DUPLICATE: AttributeTable = AttributeTable::new(
            "Bad",
            &["a"],
            &[ComputedAttr::derived("x", &["a"]), ComputedAttr::derived("x", &["a"])],
        );
        static EMPTY: AttributeTable =
            AttributeTable::new("Bad", &["a"], &[ComputedAttr::derived("x", &[])]);
        static UNKNOWN: AttributeTable =
            AttributeTable::new("Bad", &["a"], &[ComputedAttr::derived("x", &["b.c"])]);
        static SHADOW: AttributeTable =
            AttributeTable::new("Bad", &["a"], &[ComputedAttr::derived("a", &["a"])]);

        assert!(matches!(DUPLICATE.check(), Err(AttributeTableError::DuplicateAttribute { name: "x", .. })));
        assert!(matches!(EMPTY.check(), Err(AttributeTableError::MissingDependencies { name: "x", .. })));
        assert!(matches!(UNKNOWN.check(), Err(AttributeTableError::UnknownField { field: "b.c", .. })));
        assert!(matches!(SHADOW.check(), Err(AttributeTableError::ShadowsField { name: "a", .. })));
        assert!(TEST_TABLE.check().is_ok());
    }
}
