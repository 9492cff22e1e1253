// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Conversion Pipeline
//!
//! Four directed mappings per entity type, between the mutable domain form,
//! the immutable validated API form (`crate::application::view`) and the flat
//! storage form ([`StorageRecord`]):
//!
//! ```text
//!            from_domain                 to_storage_fields
//!   Domain ─────────────────▶  API  ─────────────────────────▶ Storage
//!          ◀─────────────────      ◀─────────────────────────
//!            to_domain                   from_storage
//! ```
//!
//! `from_domain` reads every computed attribute exactly once and freezes the
//! results into the API value. `from_storage` recomputes what is not
//! persisted; the API constructors check that materialized values agree with
//! the raw fields, so both origins converge on equal API values.
//!
//! ## Error taxonomy
//!
//! | Error | Meaning |
//! |-------|---------|
//! | [`ValidationFailure`] | API-layer type or range violation |
//! | `DuplicateItemError` | stored collection repeats a business key |
//! | [`ConversionIncompleteError`] | a field has no mapping; a defect, never expected |
//! | `ConstructionError` | domain invariants rejected the rebuilt entity |

pub mod adapters;
pub mod collections;
pub mod columns;
pub mod cookbook;
pub mod mapping;
pub mod recipe;

pub use adapters::{
    AdapterRegistry, AdapterRegistryBuilder, CollectionAdapter, CollectionShape, CompositeAdapter,
    CookbookLabels, CookbookRecipes, FlatComposite, RecipeRatings, RecipeTags, StorageScalar,
};
pub use collections::{
    from_ordered_sequence, to_immutable_unique, to_mutable_index, to_mutable_unique,
    to_ordered_sequence, FrozenSet, Keyed,
};
pub use cookbook::CookbookConverter;
pub use mapping::{FieldMapping, MappingTable, Persistence};
pub use recipe::RecipeConverter;

use std::sync::Arc;
use thiserror::Error;

use crate::application::view::CookbookView;
use crate::domain::config::{LarderConfigManifest, StorageConfig};
use crate::domain::cookbook::Cookbook;
use crate::domain::error::{ConstructionError, DuplicateItemError, Violations};
use crate::domain::record::StorageRecord;

// ============================================================================
// Errors
// ============================================================================

/// A value failed a type or range constraint while an API value was built
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Validation failed for '{field}': {message}")]
pub struct ValidationFailure {
    pub field: String,
    pub message: String,
}

impl ValidationFailure {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Qualify the field with the path of the enclosing value, e.g. `recipes[2]`
    pub fn within(mut self, parent: impl std::fmt::Display) -> Self {
        self.field = format!("{parent}.{}", self.field);
        self
    }

    /// First violation of a domain check, reported at the API layer
    pub fn from_violations(violations: &Violations) -> Option<Self> {
        violations
            .first()
            .map(|v| Self::new(v.field, format!("{} ({} violation(s) in total)", v.message, violations.len())))
    }
}

/// A field has no mapping in the destination representation
///
/// Unreachable in a correct build. Callers should treat it as fatal.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Conversion incomplete: '{field}' has no mapping into {target}")]
pub struct ConversionIncompleteError {
    pub field: String,
    pub target: &'static str,
}

impl ConversionIncompleteError {
    pub fn new(field: impl Into<String>, target: &'static str) -> Self {
        Self {
            field: field.into(),
            target,
        }
    }
}

/// Umbrella error for every pipeline call
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConversionError {
    #[error(transparent)]
    Validation(#[from] ValidationFailure),

    #[error(transparent)]
    Duplicate(#[from] DuplicateItemError),

    #[error(transparent)]
    Incomplete(#[from] ConversionIncompleteError),

    #[error(transparent)]
    Construction(#[from] ConstructionError),
}

impl ConversionError {
    /// Whether this error signals a defect rather than bad data
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Incomplete(_))
    }
}

// ============================================================================
// Conversion Contract
// ============================================================================

/// The four directed mappings for one entity type
pub trait Conversion {
    type Domain;
    type Api;

    /// Materialize every computed attribute and freeze the result
    fn from_domain(&self, domain: &Self::Domain) -> Result<Self::Api, ConversionError>;

    /// Rebuild the mutable form, re-checking domain invariants
    fn to_domain(&self, api: &Self::Api) -> Result<Self::Domain, ConversionError>;

    /// Flatten into storage columns, omitting values recomputed on load
    fn to_storage_fields(&self, api: &Self::Api) -> Result<StorageRecord, ConversionError>;

    /// Rebuild the API form from storage columns
    fn from_storage(&self, record: &StorageRecord) -> Result<Self::Api, ConversionError>;
}

// ============================================================================
// Pipeline
// ============================================================================

/// Converters for every entity type, sharing one adapter registry
#[derive(Debug, Clone)]
pub struct ConversionPipeline {
    registry: Arc<AdapterRegistry>,
    recipes: RecipeConverter,
    cookbooks: CookbookConverter,
}

impl ConversionPipeline {
    /// Build a pipeline, checking that every mapping table covers its entity
    pub fn new(registry: Arc<AdapterRegistry>, storage: StorageConfig) -> Result<Self, ConversionIncompleteError> {
        let recipes = RecipeConverter::new(registry.clone(), storage.clone())?;
        let cookbooks = CookbookConverter::new(registry.clone(), recipes.clone(), storage)?;
        Ok(Self {
            registry,
            recipes,
            cookbooks,
        })
    }

    pub fn from_config(config: &LarderConfigManifest) -> Result<Self, ConversionIncompleteError> {
        let registry = Arc::new(AdapterRegistry::from_config(&config.spec.limits));
        Self::new(registry, config.spec.storage.clone())
    }

    /// Pipeline over the process-wide default registry
    pub fn with_defaults() -> Result<Self, ConversionIncompleteError> {
        Self::new(AdapterRegistry::shared(), StorageConfig::default())
    }

    pub fn registry(&self) -> &Arc<AdapterRegistry> {
        &self.registry
    }

    pub fn recipes(&self) -> &RecipeConverter {
        &self.recipes
    }

    pub fn cookbooks(&self) -> &CookbookConverter {
        &self.cookbooks
    }

    /// Domain straight to storage, through the API form
    pub fn cookbook_to_storage(&self, cookbook: &Cookbook) -> Result<(CookbookView, StorageRecord), ConversionError> {
        let view = self.cookbooks.from_domain(cookbook)?;
        let record = self.cookbooks.to_storage_fields(&view)?;
        Ok((view, record))
    }

    /// Storage straight to domain, through the API form
    pub fn cookbook_from_storage(&self, record: &StorageRecord) -> Result<Cookbook, ConversionError> {
        let view = self.cookbooks.from_storage(record)?;
        self.cookbooks.to_domain(&view)
    }

    /// Storage to API form, for reads that never mutate
    pub fn cookbook_view(&self, record: &StorageRecord) -> Result<CookbookView, ConversionError> {
        self.cookbooks.from_storage(record)
    }
}
