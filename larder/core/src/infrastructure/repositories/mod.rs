// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Repository Implementations
//!
//! Infrastructure implementations of the repository contracts defined in
//! `crate::domain::repository`.
//!
//! # Architecture
//!
//! - **Layer:** Infrastructure
//! - **Purpose:** Persist and retrieve cookbook storage records
//! - **Pattern:** Repository (DDD), Adapter (Hexagonal Architecture)
//!
//! ## In-Memory Repositories
//!
//! - **InMemoryCookbookRepository** - records kept as JSON documents behind a
//!   `parking_lot::RwLock`, so every save and load crosses a real
//!   serialization boundary

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::application::conversion::cookbook::cookbook_mapping;
use crate::domain::cookbook::{CookbookId, ATTR_TITLE_SLUG};
use crate::domain::record::StorageRecord;
use crate::domain::repository::{CookbookRepository, RepositoryError};

#[derive(Clone, Default)]
pub struct InMemoryCookbookRepository {
    documents: Arc<RwLock<HashMap<CookbookId, serde_json::Value>>>,
}

impl InMemoryCookbookRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.documents.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.read().is_empty()
    }

    /// Raw stored document, for inspection in tests and tooling
    pub fn document(&self, id: CookbookId) -> Option<serde_json::Value> {
        self.documents.read().get(&id).cloned()
    }

    /// Overwrite a stored document without any checks
    pub fn put_document(&self, id: CookbookId, document: serde_json::Value) {
        self.documents.write().insert(id, document);
    }

    fn decode_all(&self) -> Result<Vec<StorageRecord>, RepositoryError> {
        let documents = self.documents.read();
        documents
            .values()
            .map(|doc| serde_json::from_value(doc.clone()).map_err(RepositoryError::from))
            .collect()
    }
}

#[async_trait]
impl CookbookRepository for InMemoryCookbookRepository {
    async fn save(&self, id: CookbookId, record: StorageRecord) -> Result<(), RepositoryError> {
        let document = serde_json::to_value(&record)?;
        self.documents.write().insert(id, document);
        debug!(cookbook_id = %id, columns = record.len(), "Saved cookbook record");
        Ok(())
    }

    async fn find_by_id(&self, id: CookbookId) -> Result<Option<StorageRecord>, RepositoryError> {
        let document = self.documents.read().get(&id).cloned();
        document.map(serde_json::from_value).transpose().map_err(RepositoryError::from)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Vec<StorageRecord>, RepositoryError> {
        let column = cookbook_mapping()
            .column(ATTR_TITLE_SLUG)
            .map_err(|e| RepositoryError::Unknown(e.to_string()))?;
        Ok(self
            .decode_all()?
            .into_iter()
            .filter(|record| record.get(column).and_then(|v| v.as_text()) == Some(slug))
            .collect())
    }

    async fn list_all(&self) -> Result<Vec<StorageRecord>, RepositoryError> {
        self.decode_all()
    }

    async fn delete(&self, id: CookbookId) -> Result<(), RepositoryError> {
        self.documents
            .write()
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("cookbook {id}")))
    }
}
