// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Identifier sources

use std::sync::atomic::{AtomicU64, Ordering};
use uuid::Uuid;

use crate::domain::entity::IdSource;

/// Random v4 UUIDs
#[derive(Debug, Default, Clone, Copy)]
pub struct RandomIdSource;

impl IdSource for RandomIdSource {
    fn next_uuid(&self) -> Uuid {
        Uuid::new_v4()
    }
}

/// Predictable UUIDs built from a namespace and a counter
#[derive(Debug)]
pub struct SequentialIdSource {
    namespace: u64,
    next: AtomicU64,
}

impl SequentialIdSource {
    pub fn new(namespace: u64) -> Self {
        Self {
            namespace,
            next: AtomicU64::new(1),
        }
    }
}

impl IdSource for SequentialIdSource {
    fn next_uuid(&self) -> Uuid {
        let n = self.next.fetch_add(1, Ordering::Relaxed);
        Uuid::from_u64_pair(self.namespace, n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequential_ids_are_predictable() {
        let ids = SequentialIdSource::new(7);
        let first = ids.next_uuid();
        let second = ids.next_uuid();
        assert_eq!(first, Uuid::from_u64_pair(7, 1));
        assert_eq!(second, Uuid::from_u64_pair(7, 2));
    }

    #[test]
    fn test_random_ids_differ() {
        assert_ne!(RandomIdSource.next_uuid(), RandomIdSource.next_uuid());
    }
}
