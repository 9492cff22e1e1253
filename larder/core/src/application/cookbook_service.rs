// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cookbook application service
//!
//! Every command follows the same shape: load the storage record, rebuild
//! the aggregate, apply one root operation, convert back and save. The
//! aggregate lives only inside the synchronous [`StandardCookbookService::apply`]
//! step, so it never crosses an await point.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::info;

use crate::application::conversion::ConversionPipeline;
use crate::application::view::CookbookView;
use crate::domain::cookbook::{
    Cookbook, CookbookChange, CookbookDraft, CookbookId, Recipe, RecipeChange, RecipeDraft, RecipeId,
};
use crate::domain::entity::{Entity, IdSource};
use crate::domain::error::MutationError;
use crate::domain::events::CookbookEvent;
use crate::domain::rating::Rating;
use crate::domain::record::StorageRecord;
use crate::domain::repository::CookbookRepository;
use crate::domain::tag::Tag;

/// Result of a command: the saved state plus the events it produced
#[derive(Debug, Clone)]
pub struct CookbookUpdate {
    pub view: CookbookView,
    pub events: Vec<CookbookEvent>,
}

#[async_trait]
pub trait CookbookService: Send + Sync {
    async fn create_cookbook(&self, title: String, labels: HashSet<Tag>) -> Result<CookbookUpdate>;
    async fn get_cookbook(&self, id: CookbookId) -> Result<CookbookView>;
    async fn find_by_slug(&self, slug: &str) -> Result<Vec<CookbookView>>;
    async fn list_cookbooks(&self) -> Result<Vec<CookbookView>>;
    async fn update_cookbook(&self, id: CookbookId, changes: Vec<CookbookChange>) -> Result<CookbookUpdate>;
    async fn add_recipe(&self, id: CookbookId, draft: RecipeDraft) -> Result<(RecipeId, CookbookUpdate)>;
    async fn update_recipe(
        &self,
        id: CookbookId,
        recipe_id: RecipeId,
        changes: Vec<RecipeChange>,
    ) -> Result<CookbookUpdate>;
    async fn rate_recipe(&self, id: CookbookId, recipe_id: RecipeId, rating: Rating) -> Result<CookbookUpdate>;
    async fn discard_recipe(&self, id: CookbookId, recipe_id: RecipeId) -> Result<CookbookUpdate>;
    async fn discard_cookbook(&self, id: CookbookId) -> Result<CookbookUpdate>;
    async fn delete_cookbook(&self, id: CookbookId) -> Result<()>;
}

pub struct StandardCookbookService {
    repository: Arc<dyn CookbookRepository>,
    pipeline: Arc<ConversionPipeline>,
    ids: Arc<dyn IdSource>,
}

impl StandardCookbookService {
    pub fn new(
        repository: Arc<dyn CookbookRepository>,
        pipeline: Arc<ConversionPipeline>,
        ids: Arc<dyn IdSource>,
    ) -> Self {
        Self {
            repository,
            pipeline,
            ids,
        }
    }

    async fn load(&self, id: CookbookId) -> Result<StorageRecord> {
        self.repository
            .find_by_id(id)
            .await
            .context("Failed to load cookbook")?
            .ok_or_else(|| anyhow!("Cookbook not found: {}", id))
    }

    /// Rebuild, mutate and convert back; `None` record when nothing changed
    fn apply<F>(&self, record: &StorageRecord, mutation: F) -> Result<(Option<StorageRecord>, CookbookUpdate)>
    where
        F: FnOnce(&mut Cookbook) -> Result<(), MutationError>,
    {
        let mut cookbook = self.pipeline.cookbook_from_storage(record)?;
        let before = cookbook.version();
        mutation(&mut cookbook)?;

        let events = cookbook.take_events();
        let (view, updated) = self.pipeline.cookbook_to_storage(&cookbook)?;
        let changed = cookbook.version() != before;
        Ok((changed.then_some(updated), CookbookUpdate { view, events }))
    }

    /// Load, apply and save one command
    async fn execute<F>(&self, id: CookbookId, mutation: F) -> Result<CookbookUpdate>
    where
        F: FnOnce(&mut Cookbook) -> Result<(), MutationError> + Send,
    {
        let record = self.load(id).await?;
        let (updated, outcome) = self.apply(&record, mutation)?;
        if let Some(updated) = updated {
            self.repository
                .save(id, updated)
                .await
                .context("Failed to save cookbook")?;
        }
        log_events(&outcome.events);
        Ok(outcome)
    }

    fn view_all(&self, records: Vec<StorageRecord>) -> Result<Vec<CookbookView>> {
        records
            .iter()
            .map(|record| Ok(self.pipeline.cookbook_view(record)?))
            .collect()
    }
}

fn log_events(events: &[CookbookEvent]) {
    for event in events {
        info!(
            cookbook_id = %event.cookbook_id(),
            version = event.version(),
            "{}",
            event.event_type()
        );
    }
}

#[async_trait]
impl CookbookService for StandardCookbookService {
    async fn create_cookbook(&self, title: String, labels: HashSet<Tag>) -> Result<CookbookUpdate> {
        let id = CookbookId(self.ids.next_uuid());
        let (record, outcome) = {
            let mut cookbook = Cookbook::create(
                id,
                CookbookDraft {
                    title,
                    labels,
                    recipes: Vec::new(),
                },
            )?;
            let events = cookbook.take_events();
            let (view, record) = self.pipeline.cookbook_to_storage(&cookbook)?;
            (record, CookbookUpdate { view, events })
        };

        self.repository
            .save(id, record)
            .await
            .context("Failed to save cookbook")?;
        log_events(&outcome.events);
        Ok(outcome)
    }

    async fn get_cookbook(&self, id: CookbookId) -> Result<CookbookView> {
        let record = self.load(id).await?;
        Ok(self.pipeline.cookbook_view(&record)?)
    }

    async fn find_by_slug(&self, slug: &str) -> Result<Vec<CookbookView>> {
        let records = self
            .repository
            .find_by_slug(slug)
            .await
            .context("Failed to search cookbooks")?;
        self.view_all(records)
    }

    async fn list_cookbooks(&self) -> Result<Vec<CookbookView>> {
        let records = self
            .repository
            .list_all()
            .await
            .context("Failed to list cookbooks")?;
        self.view_all(records)
    }

    async fn update_cookbook(&self, id: CookbookId, changes: Vec<CookbookChange>) -> Result<CookbookUpdate> {
        self.execute(id, move |cookbook| cookbook.update(changes).map(|_| ()))
            .await
    }

    async fn add_recipe(&self, id: CookbookId, draft: RecipeDraft) -> Result<(RecipeId, CookbookUpdate)> {
        let recipe_id = RecipeId(self.ids.next_uuid());
        let recipe = Recipe::create(recipe_id, draft)?;
        let outcome = self
            .execute(id, move |cookbook| cookbook.add_recipe(recipe))
            .await?;
        Ok((recipe_id, outcome))
    }

    async fn update_recipe(
        &self,
        id: CookbookId,
        recipe_id: RecipeId,
        changes: Vec<RecipeChange>,
    ) -> Result<CookbookUpdate> {
        self.execute(id, move |cookbook| cookbook.update_recipe(recipe_id, changes).map(|_| ()))
            .await
    }

    async fn rate_recipe(&self, id: CookbookId, recipe_id: RecipeId, rating: Rating) -> Result<CookbookUpdate> {
        self.execute(id, move |cookbook| cookbook.rate_recipe(recipe_id, rating))
            .await
    }

    async fn discard_recipe(&self, id: CookbookId, recipe_id: RecipeId) -> Result<CookbookUpdate> {
        self.execute(id, move |cookbook| cookbook.discard_recipe(recipe_id))
            .await
    }

    async fn discard_cookbook(&self, id: CookbookId) -> Result<CookbookUpdate> {
        self.execute(id, |cookbook| cookbook.discard()).await
    }

    async fn delete_cookbook(&self, id: CookbookId) -> Result<()> {
        self.repository
            .delete(id)
            .await
            .context("Failed to delete cookbook")?;
        info!(cookbook_id = %id, "cookbook_deleted");
        Ok(())
    }
}
