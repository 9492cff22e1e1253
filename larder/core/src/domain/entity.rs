// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Entity Lifecycle
//!
//! Shared bookkeeping for every mutable aggregate member: identity, the
//! monotonic version counter, the soft-delete flag, timestamps and the
//! per-instance [`CacheLedger`].
//!
//! ## Mutation Ordering
//!
//! [`commit`] is the single place a logical mutation is finalized. Callers
//! validate and write first, then hand over the set of paths that actually
//! changed. `commit` then:
//!
//! 1. increments the version exactly once,
//! 2. runs the entity's post-update hook,
//! 3. invalidates the cache entries that depend on the changed paths.
//!
//! An empty change set is a no-op: no version bump, no invalidation.

use chrono::{DateTime, Utc};
use std::collections::BTreeSet;
use std::fmt::Display;
use std::hash::Hash;
use tracing::debug;
use uuid::Uuid;

use crate::domain::cache::{AttributeTable, CacheLedger, ChangedFields};
use crate::domain::error::DiscardedEntityError;

/// Lifecycle state embedded in every entity
#[derive(Debug, Clone)]
pub struct EntityCore {
    version: u64,
    discarded: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    ledger: CacheLedger,
}

impl EntityCore {
    pub(in crate::domain) fn new(table: &'static AttributeTable) -> Self {
        let now = Utc::now();
        Self {
            version: 1,
            discarded: false,
            created_at: now,
            updated_at: now,
            ledger: CacheLedger::new(table),
        }
    }

    pub(in crate::domain) fn restore(
        table: &'static AttributeTable,
        version: u64,
        discarded: bool,
        created_at: DateTime<Utc>,
        updated_at: DateTime<Utc>,
    ) -> Self {
        Self {
            version,
            discarded,
            created_at,
            updated_at,
            ledger: CacheLedger::new(table),
        }
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn is_discarded(&self) -> bool {
        self.discarded
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    pub(in crate::domain) fn ledger(&self) -> &CacheLedger {
        &self.ledger
    }

    pub(in crate::domain) fn ledger_mut(&mut self) -> &mut CacheLedger {
        &mut self.ledger
    }

    pub(in crate::domain) fn mark_discarded(&mut self) {
        self.discarded = true;
    }

    /// Never moves `updated_at` backwards, even when the restored stamps are ahead of this clock
    pub(in crate::domain) fn touch(&mut self) {
        self.updated_at = Utc::now().max(self.updated_at);
    }

    pub(in crate::domain) fn ensure_active(
        &self,
        entity: &'static str,
        id: impl Display,
    ) -> Result<(), DiscardedEntityError> {
        if self.discarded {
            return Err(DiscardedEntityError {
                entity,
                id: id.to_string(),
            });
        }
        Ok(())
    }
}

/// Read-only view shared by every entity type
pub trait Entity {
    const KIND: &'static str;
    type Id: Copy + Eq + Hash + Display;

    fn id(&self) -> Self::Id;

    fn core(&self) -> &EntityCore;

    fn version(&self) -> u64 {
        self.core().version()
    }

    fn is_discarded(&self) -> bool {
        self.core().is_discarded()
    }

    fn created_at(&self) -> DateTime<Utc> {
        self.core().created_at()
    }

    fn updated_at(&self) -> DateTime<Utc> {
        self.core().updated_at()
    }

    /// Names of the computed attributes currently memoized (diagnostics only)
    fn cache_state(&self) -> BTreeSet<&'static str> {
        self.core().ledger().memoized()
    }
}

/// Write access to the lifecycle state; visible to the domain layer only
pub(in crate::domain) trait Lifecycle: Entity {
    fn core_mut(&mut self) -> &mut EntityCore;

    /// Post-update hook, run after the version bump and before invalidation
    fn after_update(&mut self, _changed: &ChangedFields) {
        self.core_mut().touch();
    }
}

/// Finalize a logical mutation whose writes have already been applied
pub(in crate::domain) fn commit<E: Lifecycle>(entity: &mut E, changed: &ChangedFields) -> BTreeSet<&'static str> {
    if changed.is_empty() {
        return BTreeSet::new();
    }

    entity.core_mut().version += 1;
    entity.after_update(changed);
    let cleared = entity.core_mut().ledger_mut().invalidate(changed);

    debug!(
        entity = E::KIND,
        id = %entity.id(),
        version = entity.version(),
        changed = ?changed,
        "committed mutation"
    );
    cleared
}

/// Source of unique identifiers, injected by the surrounding system
pub trait IdSource: Send + Sync {
    fn next_uuid(&self) -> Uuid;
}
