// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Domain Repository Interfaces
//!
//! Persistence contract for the `Cookbook` aggregate. One repository per
//! aggregate root, interface defined in the domain layer, implemented in
//! `crate::infrastructure::repositories`.
//!
//! | Trait | Aggregate | Implementations |
//! |-------|-----------|----------------|
//! | `CookbookRepository` | `Cookbook` | `InMemoryCookbookRepository` |
//!
//! Repositories exchange [`StorageRecord`]s rather than live aggregates: a
//! `Cookbook` owns a single-threaded cache ledger and cannot cross an await
//! point by reference. `crate::application::CookbookService` converts on
//! either side.

use async_trait::async_trait;

use crate::domain::cookbook::CookbookId;
use crate::domain::record::StorageRecord;

/// Repository interface for Cookbook aggregates
#[async_trait]
pub trait CookbookRepository: Send + Sync {
    /// Save cookbook record (create or update)
    async fn save(&self, id: CookbookId, record: StorageRecord) -> Result<(), RepositoryError>;

    async fn find_by_id(&self, id: CookbookId) -> Result<Option<StorageRecord>, RepositoryError>;

    /// Cookbooks whose title slug matches exactly
    async fn find_by_slug(&self, slug: &str) -> Result<Vec<StorageRecord>, RepositoryError>;

    async fn list_all(&self) -> Result<Vec<StorageRecord>, RepositoryError>;

    async fn delete(&self, id: CookbookId) -> Result<(), RepositoryError>;
}

/// Repository errors
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("Entity not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Storage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<serde_json::Error> for RepositoryError {
    fn from(err: serde_json::Error) -> Self {
        RepositoryError::Serialization(err.to_string())
    }
}
