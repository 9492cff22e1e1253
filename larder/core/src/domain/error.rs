// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Error Taxonomy
//!
//! Every failure the core reports is a typed, inspectable value:
//!
//! | Type | Raised by | Recoverable |
//! |------|-----------|-------------|
//! | `ConstructionError` | `create` / `restore` factories | supply corrected input |
//! | `MutationError` | named operations and generic `update` | entity unchanged, retry |
//! | `DiscardedEntityError` | any mutation of a soft-deleted entity | no |
//! | `DuplicateItemError` | collections keyed by a business key | fix the data |
//!
//! API-layer failures (`ValidationFailure`, `ConversionIncompleteError`) live
//! in `crate::application::conversion`.
//!
//! Construction and mutation collect **every** violated invariant before
//! failing, so callers can correct all fields in one round trip.

use std::fmt;
use thiserror::Error;

/// A single violated invariant
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub field: &'static str,
    pub message: String,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Ordered collection of violated invariants
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Violations(Vec<Violation>);

impl Violations {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: &'static str, message: impl Into<String>) {
        self.0.push(Violation {
            field,
            message: message.into(),
        });
    }

    /// Record a violation unless `ok` holds
    pub fn check(&mut self, ok: bool, field: &'static str, message: impl Into<String>) {
        if !ok {
            self.push(field, message);
        }
    }

    pub fn extend(&mut self, other: Violations) {
        self.0.extend(other.0);
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Violation> {
        self.0.iter()
    }

    /// Whether any violation names `field`
    pub fn mentions(&self, field: &str) -> bool {
        self.0.iter().any(|v| v.field == field)
    }

    pub fn first(&self) -> Option<&Violation> {
        self.0.first()
    }
}

impl fmt::Display for Violations {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, violation) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("; ")?;
            }
            write!(f, "{}", violation)?;
        }
        Ok(())
    }
}

impl IntoIterator for Violations {
    type Item = Violation;
    type IntoIter = std::vec::IntoIter<Violation>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// Invariant violated while creating (or restoring) an entity
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Cannot construct {entity}: {violations}")]
pub struct ConstructionError {
    pub entity: &'static str,
    pub violations: Violations,
}

impl ConstructionError {
    pub fn new(entity: &'static str, violations: Violations) -> Self {
        Self { entity, violations }
    }
}

/// Mutation attempted on a soft-deleted entity
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{entity} {id} has been discarded")]
pub struct DiscardedEntityError {
    pub entity: &'static str,
    pub id: String,
}

/// Uniqueness violated in a collection whose members carry a business key
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Duplicate item in {collection}: {key}")]
pub struct DuplicateItemError {
    pub collection: &'static str,
    pub key: String,
}

/// Invariant violated while mutating an entity
///
/// Whatever the variant, the entity is left exactly as it was before the call.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum MutationError {
    #[error("Invalid update to {entity}: {violations}")]
    Invalid {
        entity: &'static str,
        violations: Violations,
    },

    #[error(transparent)]
    Discarded(#[from] DiscardedEntityError),

    #[error("Field '{field}' appears more than once in a single update")]
    DuplicateField { field: &'static str },

    #[error("{entity} {id} not found")]
    NotFound { entity: &'static str, id: String },

    #[error(transparent)]
    Duplicate(#[from] DuplicateItemError),
}

impl MutationError {
    pub fn invalid(entity: &'static str, violations: Violations) -> Self {
        Self::Invalid { entity, violations }
    }

    /// Violations carried by an `Invalid` error
    pub fn violations(&self) -> Option<&Violations> {
        match self {
            Self::Invalid { violations, .. } => Some(violations),
            _ => None,
        }
    }
}
