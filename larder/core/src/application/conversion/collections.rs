// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Collection Transformer
//!
//! Pure conversions between the three shapes a logical collection takes:
//!
//! | Layer | Shape |
//! |-------|-------|
//! | Domain | mutable `HashSet` / `HashMap` keyed by business key |
//! | API | [`FrozenSet`], immutable and hashable |
//! | Storage | ordered `Vec` |
//!
//! Going from a mutable set to a `FrozenSet` never fails. Going from a
//! stored sequence to a `FrozenSet` fails on a repeated business key, since
//! duplicates coming back from storage mean the data is corrupt.

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::collections::hash_map::Entry;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt::Display;
use std::hash::Hash;
use std::sync::Arc;
use tracing::warn;

use crate::domain::error::DuplicateItemError;
use crate::domain::tag::Tag;

/// Element carrying a business key
pub trait Keyed {
    type Key: Ord + Hash + Clone + Display;

    fn key(&self) -> Self::Key;
}

impl Keyed for Tag {
    type Key = Tag;

    fn key(&self) -> Tag {
        self.clone()
    }
}

/// Immutable set of keyed elements, held in business-key order
///
/// Equality and hashing follow the elements, so two sets built from the same
/// members in any order are equal.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FrozenSet<T>(Arc<[T]>);

impl<T> FrozenSet<T> {
    pub fn empty() -> Self {
        Self(Arc::from(Vec::new()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Elements in business-key order
    pub fn iter(&self) -> std::slice::Iter<'_, T> {
        self.0.iter()
    }
}

impl<T: Keyed> FrozenSet<T> {
    pub fn get(&self, key: &T::Key) -> Option<&T> {
        self.0
            .binary_search_by(|item| item.key().cmp(key))
            .ok()
            .map(|i| &self.0[i])
    }

    pub fn contains_key(&self, key: &T::Key) -> bool {
        self.get(key).is_some()
    }
}

impl<T> Default for FrozenSet<T> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<'a, T> IntoIterator for &'a FrozenSet<T> {
    type Item = &'a T;
    type IntoIter = std::slice::Iter<'a, T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl<T: Keyed + PartialEq> FromIterator<T> for FrozenSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        to_immutable_unique(iter)
    }
}

impl<T: Serialize> Serialize for FrozenSet<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.0.iter())
    }
}

impl<'de, T: Keyed + Deserialize<'de>> Deserialize<'de> for FrozenSet<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let items = Vec::<T>::deserialize(deserializer)?;
        from_ordered_sequence(items, "set").map_err(serde::de::Error::custom)
    }
}

/// Freeze a set-semantic collection, deduplicating by business key
///
/// The first element seen for a key wins. A later element with the same key
/// but different content is dropped with a warning.
pub fn to_immutable_unique<T: Keyed + PartialEq>(items: impl IntoIterator<Item = T>) -> FrozenSet<T> {
    let mut by_key: BTreeMap<T::Key, T> = BTreeMap::new();
    for item in items {
        match by_key.get(&item.key()) {
            Some(existing) if *existing != item => {
                warn!(key = %item.key(), "conflicting members share a business key; keeping the first");
            }
            Some(_) => {}
            None => {
                by_key.insert(item.key(), item);
            }
        }
    }
    FrozenSet(by_key.into_values().collect())
}

/// Thaw a frozen set into a mutable set
pub fn to_mutable_unique<T: Clone + Eq + Hash>(set: &FrozenSet<T>) -> HashSet<T> {
    set.iter().cloned().collect()
}

/// Thaw a frozen set into a mutable collection indexed by business key
pub fn to_mutable_index<T: Keyed + Clone>(set: &FrozenSet<T>) -> HashMap<T::Key, T> {
    set.iter().map(|item| (item.key(), item.clone())).collect()
}

/// Order a frozen set for storage
///
/// Sorted by `ordering_key`, ties broken by business key, so the same input
/// always yields the same sequence.
pub fn to_ordered_sequence<T, K, F>(set: &FrozenSet<T>, ordering_key: F) -> Vec<T>
where
    T: Keyed + Clone,
    K: Ord,
    F: Fn(&T) -> K,
{
    let mut ordered: Vec<T> = set.iter().cloned().collect();
    ordered.sort_by(|a, b| ordering_key(a).cmp(&ordering_key(b)).then_with(|| a.key().cmp(&b.key())));
    ordered
}

/// Rebuild a frozen set from a stored sequence, failing on the first repeated key
pub fn from_ordered_sequence<T: Keyed>(
    items: Vec<T>,
    collection: &'static str,
) -> Result<FrozenSet<T>, DuplicateItemError> {
    let mut by_key: HashMap<T::Key, T> = HashMap::with_capacity(items.len());
    for item in items {
        match by_key.entry(item.key()) {
            Entry::Occupied(entry) => {
                return Err(DuplicateItemError {
                    collection,
                    key: entry.key().to_string(),
                });
            }
            Entry::Vacant(entry) => {
                entry.insert(item);
            }
        }
    }
    let mut unique: Vec<T> = by_key.into_values().collect();
    unique.sort_by_key(|item| item.key());
    Ok(FrozenSet(unique.into()))
}
