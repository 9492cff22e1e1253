// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! # Cookbook Aggregate
//!
//! `Cookbook` is the aggregate root; it owns its `Recipe` children by
//! composition. Recipe mutators are visible to this module only, so every
//! child change passes through a root operation which:
//!
//! 1. locates the child and delegates to its mutator,
//! 2. translates the child's changed fields `f` into root paths `recipes.f`,
//! 3. commits on the root (version bump, hook, invalidation),
//! 4. records a [`CookbookEvent`].
//!
//! Discarded recipes stay in the aggregate for audit but are excluded from
//! every cookbook aggregate computation.

pub mod derived;
pub mod recipe;

pub use recipe::{
    recipe_attributes, Recipe, RecipeChange, RecipeDraft, RecipeField, RecipeId, RecipeState,
};

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::cache::{AttributeTable, ChangedFields, ComputedAttr};
use crate::domain::entity::{commit, Entity, EntityCore, Lifecycle};
use crate::domain::error::{ConstructionError, DuplicateItemError, MutationError, Violations};
use crate::domain::events::CookbookEvent;
use crate::domain::rating::{AverageRating, Rating};
use crate::domain::tag::Tag;

// ============================================================================
// Invariants
// ============================================================================

pub const MAX_TITLE_LENGTH: usize = 120;
pub const MAX_LABELS: usize = 16;
pub const MAX_RECIPES: usize = 500;

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CookbookId(pub Uuid);

impl CookbookId {
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl std::fmt::Display for CookbookId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CookbookField {
    Title,
    Labels,
    Recipes,
    Discarded,
}

impl CookbookField {
    pub const ALL: [CookbookField; 4] = [Self::Title, Self::Labels, Self::Recipes, Self::Discarded];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Title => "title",
            Self::Labels => "labels",
            Self::Recipes => "recipes",
            Self::Discarded => "discarded",
        }
    }
}

/// One requested write in a generic cookbook update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CookbookChange {
    Title(String),
    Labels(HashSet<Tag>),
}

impl CookbookChange {
    pub fn field(&self) -> CookbookField {
        match self {
            Self::Title(_) => CookbookField::Title,
            Self::Labels(_) => CookbookField::Labels,
        }
    }
}

/// Input to [`Cookbook::create`]
#[derive(Debug, Clone, Default)]
pub struct CookbookDraft {
    pub title: String,
    pub labels: HashSet<Tag>,
    pub recipes: Vec<Recipe>,
}

/// Complete cookbook state, used to rebuild a cookbook from another representation
#[derive(Debug, Clone)]
pub struct CookbookState {
    pub id: CookbookId,
    pub title: String,
    pub labels: HashSet<Tag>,
    pub recipes: Vec<Recipe>,
    pub version: u64,
    pub discarded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Computed Attributes
// ============================================================================

pub const ATTR_TOTAL_WEIGHT_GRAMS: &str = "total_weight_grams";
pub const ATTR_TAG_INDEX: &str = "tag_index";
pub const ATTR_AVERAGE_RATING: &str = "average_rating";
pub const ATTR_TITLE_SLUG: &str = "title_slug";
pub const ATTR_CATALOG_CODE: &str = "catalog_code";

static COOKBOOK_TABLE: AttributeTable = AttributeTable::new(
    "Cookbook",
    &["title", "labels", "recipes", "discarded"],
    &[
        ComputedAttr::derived(
            ATTR_TOTAL_WEIGHT_GRAMS,
            &["recipes.weight_grams", "recipes.discarded"],
        ),
        ComputedAttr::derived(ATTR_TAG_INDEX, &["labels", "recipes.tags", "recipes.discarded"]),
        ComputedAttr::derived(ATTR_AVERAGE_RATING, &["recipes.ratings", "recipes.discarded"]),
        ComputedAttr::derived(ATTR_TITLE_SLUG, &["title"]),
        ComputedAttr::manual(ATTR_CATALOG_CODE),
    ],
);

static COOKBOOK_ATTRIBUTES: Lazy<&'static AttributeTable> = Lazy::new(|| COOKBOOK_TABLE.checked());

/// Computed attribute declarations for `Cookbook`
pub fn cookbook_attributes() -> &'static AttributeTable {
    *COOKBOOK_ATTRIBUTES
}

// ============================================================================
// Validation
// ============================================================================

fn check_title(title: &str, violations: &mut Violations) {
    let title = title.trim();
    violations.check(!title.is_empty(), "title", "must not be blank");
    violations.check(
        title.chars().count() <= MAX_TITLE_LENGTH,
        "title",
        format!("must not exceed {MAX_TITLE_LENGTH} characters"),
    );
}

fn check_labels(labels: &HashSet<Tag>, violations: &mut Violations) {
    violations.check(
        labels.len() <= MAX_LABELS,
        "labels",
        format!("must not hold more than {MAX_LABELS} labels, got {}", labels.len()),
    );
}

fn check_recipes(recipes: &[Recipe], violations: &mut Violations) {
    violations.check(
        recipes.len() <= MAX_RECIPES,
        "recipes",
        format!("must not hold more than {MAX_RECIPES} recipes, got {}", recipes.len()),
    );
    let mut seen = HashSet::new();
    for recipe in recipes {
        if !seen.insert(recipe.id()) {
            violations.push("recipes", format!("duplicate recipe id {}", recipe.id()));
        }
    }
}

fn index_recipes(recipes: Vec<Recipe>) -> HashMap<RecipeId, Recipe> {
    recipes.into_iter().map(|r| (r.id(), r)).collect()
}

// ============================================================================
// Aggregate Root: Cookbook
// ============================================================================

#[derive(Debug)]
pub struct Cookbook {
    id: CookbookId,
    title: String,
    labels: HashSet<Tag>,
    recipes: HashMap<RecipeId, Recipe>,
    core: EntityCore,
    events: Vec<CookbookEvent>,
}

/// A clone owns no pending events; only the original publishes them
impl Clone for Cookbook {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            title: self.title.clone(),
            labels: self.labels.clone(),
            recipes: self.recipes.clone(),
            core: self.core.clone(),
            events: Vec::new(),
        }
    }
}

impl Cookbook {
    /// Create a cookbook, checking every invariant before anything is built
    pub fn create(id: CookbookId, draft: CookbookDraft) -> Result<Self, ConstructionError> {
        let mut violations = Violations::new();
        check_title(&draft.title, &mut violations);
        check_labels(&draft.labels, &mut violations);
        check_recipes(&draft.recipes, &mut violations);
        for recipe in draft.recipes.iter().filter(|r| r.is_discarded()) {
            violations.push("recipes", format!("recipe {} has been discarded", recipe.id()));
        }
        if !violations.is_empty() {
            return Err(ConstructionError::new(Self::KIND, violations));
        }

        let mut cookbook = Self {
            id,
            title: draft.title.trim().to_string(),
            labels: draft.labels,
            recipes: index_recipes(draft.recipes),
            core: EntityCore::new(cookbook_attributes()),
            events: Vec::new(),
        };
        cookbook.record(CookbookEvent::Created {
            cookbook_id: id,
            title: cookbook.title.clone(),
            recipe_count: cookbook.recipes.len(),
            occurred_at: cookbook.created_at(),
        });
        Ok(cookbook)
    }

    /// Rebuild a cookbook with its full lifecycle state; records no events
    pub fn restore(state: CookbookState) -> Result<Self, ConstructionError> {
        let mut violations = Violations::new();
        check_title(&state.title, &mut violations);
        check_labels(&state.labels, &mut violations);
        check_recipes(&state.recipes, &mut violations);
        violations.check(state.version >= 1, "version", "must be at least 1");
        violations.check(
            state.updated_at >= state.created_at,
            "updated_at",
            "must not precede created_at",
        );
        if !violations.is_empty() {
            return Err(ConstructionError::new(Self::KIND, violations));
        }

        Ok(Self {
            id: state.id,
            title: state.title.trim().to_string(),
            labels: state.labels,
            recipes: index_recipes(state.recipes),
            core: EntityCore::restore(
                cookbook_attributes(),
                state.version,
                state.discarded,
                state.created_at,
                state.updated_at,
            ),
            events: Vec::new(),
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn labels(&self) -> &HashSet<Tag> {
        &self.labels
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&Recipe> {
        self.recipes.get(&id)
    }

    pub fn recipe_count(&self) -> usize {
        self.recipes.len()
    }

    /// Every recipe, discarded ones included, in no particular order
    pub fn recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values()
    }

    /// Every recipe ordered by creation time, then id
    pub fn recipes_in_order(&self) -> Vec<&Recipe> {
        let mut ordered: Vec<&Recipe> = self.recipes.values().collect();
        ordered.sort_by_key(|r| (r.created_at(), r.id()));
        ordered
    }

    /// Recipes that count towards cookbook aggregates
    pub fn active_recipes(&self) -> impl Iterator<Item = &Recipe> {
        self.recipes.values().filter(|r| !r.is_discarded())
    }

    pub fn total_weight_grams(&self) -> Arc<u64> {
        self.core.ledger().get_or_insert_with(ATTR_TOTAL_WEIGHT_GRAMS, || {
            derived::total_weight_grams(self.active_recipes().map(Recipe::weight_grams))
        })
    }

    /// Cookbook labels together with the tags of every active recipe
    pub fn tag_index(&self) -> Arc<BTreeSet<Tag>> {
        self.core.ledger().get_or_insert_with(ATTR_TAG_INDEX, || {
            derived::tag_index(&self.labels, self.active_recipes().flat_map(|r| r.tags()))
        })
    }

    /// Pooled mean over every rating of every active recipe
    pub fn average_rating(&self) -> Arc<Option<AverageRating>> {
        self.core.ledger().get_or_insert_with(ATTR_AVERAGE_RATING, || {
            derived::pooled_average(self.active_recipes().flat_map(|r| r.ratings()))
        })
    }

    pub fn title_slug(&self) -> Arc<String> {
        self.core
            .ledger()
            .get_or_insert_with(ATTR_TITLE_SLUG, || derived::title_slug(&self.title))
    }

    pub fn catalog_code(&self) -> Arc<String> {
        self.core
            .ledger()
            .get_or_insert_with(ATTR_CATALOG_CODE, || derived::catalog_code(self.id))
    }

    /// Events recorded since the last [`Cookbook::take_events`]
    pub fn pending_events(&self) -> &[CookbookEvent] {
        &self.events
    }

    pub fn take_events(&mut self) -> Vec<CookbookEvent> {
        std::mem::take(&mut self.events)
    }

    pub fn to_state(&self) -> CookbookState {
        CookbookState {
            id: self.id,
            title: self.title.clone(),
            labels: self.labels.clone(),
            recipes: self.recipes_in_order().into_iter().cloned().collect(),
            version: self.version(),
            discarded: self.is_discarded(),
            created_at: self.created_at(),
            updated_at: self.updated_at(),
        }
    }

    // ========================================================================
    // Commands: cookbook fields
    // ========================================================================

    /// Apply a set of field writes all-or-nothing
    ///
    /// Every change is validated before any is written, and every violation
    /// is reported. Returns the fields that actually changed.
    pub fn update(&mut self, changes: Vec<CookbookChange>) -> Result<ChangedFields, MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;

        let mut requested = HashSet::new();
        for change in &changes {
            if !requested.insert(change.field()) {
                return Err(MutationError::DuplicateField {
                    field: change.field().as_str(),
                });
            }
        }

        let mut violations = Violations::new();
        for change in &changes {
            match change {
                CookbookChange::Title(title) => check_title(title, &mut violations),
                CookbookChange::Labels(labels) => check_labels(labels, &mut violations),
            }
        }
        if !violations.is_empty() {
            return Err(MutationError::invalid(Self::KIND, violations));
        }

        let mut changed = ChangedFields::new();
        for change in changes {
            let field = change.field();
            let written = match change {
                CookbookChange::Title(title) => {
                    let title = title.trim().to_string();
                    let differs = title != self.title;
                    if differs {
                        self.title = title;
                    }
                    differs
                }
                CookbookChange::Labels(labels) => {
                    let differs = labels != self.labels;
                    if differs {
                        self.labels = labels;
                    }
                    differs
                }
            };
            if written {
                changed.insert(field.as_str().to_string());
            }
        }

        commit(self, &changed);
        self.record_field_events(&changed);
        Ok(changed)
    }

    pub fn rename(&mut self, title: impl Into<String>) -> Result<(), MutationError> {
        self.update(vec![CookbookChange::Title(title.into())]).map(|_| ())
    }

    /// Add a label; adding one already present is a no-op
    pub fn label(&mut self, label: Tag) -> Result<(), MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;
        if self.labels.contains(&label) {
            return Ok(());
        }
        let mut labels = self.labels.clone();
        labels.insert(label);
        self.update(vec![CookbookChange::Labels(labels)]).map(|_| ())
    }

    /// Remove a label; removing one that is absent is a no-op
    pub fn unlabel(&mut self, label: &Tag) -> Result<(), MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;
        if !self.labels.contains(label) {
            return Ok(());
        }
        let mut labels = self.labels.clone();
        labels.remove(label);
        self.update(vec![CookbookChange::Labels(labels)]).map(|_| ())
    }

    pub fn discard(&mut self) -> Result<(), MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;
        self.core.mark_discarded();
        commit(self, &ChangedFields::from([CookbookField::Discarded.as_str().to_string()]));
        self.record(CookbookEvent::Discarded {
            cookbook_id: self.id,
            version: self.version(),
            occurred_at: self.updated_at(),
        });
        Ok(())
    }

    /// Clear every memoized value on the root and on each recipe
    ///
    /// Not a logical mutation: the version is left alone. This is the only
    /// way to refresh manual-only attributes.
    pub fn clear_caches(&mut self) -> usize {
        let mut cleared = self.core.ledger_mut().invalidate_all();
        for recipe in self.recipes.values_mut() {
            cleared += recipe.core_mut().ledger_mut().invalidate_all();
        }
        cleared
    }

    // ========================================================================
    // Commands: recipes
    // ========================================================================

    pub fn add_recipe(&mut self, recipe: Recipe) -> Result<(), MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;
        if self.recipes.contains_key(&recipe.id()) {
            return Err(DuplicateItemError {
                collection: CookbookField::Recipes.as_str(),
                key: recipe.id().to_string(),
            }
            .into());
        }

        let mut violations = Violations::new();
        violations.check(
            self.recipes.len() < MAX_RECIPES,
            "recipes",
            format!("must not hold more than {MAX_RECIPES} recipes"),
        );
        violations.check(
            !recipe.is_discarded(),
            "recipes",
            format!("recipe {} has been discarded", recipe.id()),
        );
        if !violations.is_empty() {
            return Err(MutationError::invalid(Self::KIND, violations));
        }

        let recipe_id = recipe.id();
        self.recipes.insert(recipe_id, recipe);
        commit(self, &ChangedFields::from([CookbookField::Recipes.as_str().to_string()]));
        self.record(CookbookEvent::RecipeAdded {
            cookbook_id: self.id,
            recipe_id,
            version: self.version(),
            occurred_at: self.updated_at(),
        });
        Ok(())
    }

    /// Detach a recipe from the cookbook and hand it back
    pub fn remove_recipe(&mut self, recipe_id: RecipeId) -> Result<Recipe, MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;
        let recipe = self
            .recipes
            .remove(&recipe_id)
            .ok_or_else(|| recipe_not_found(recipe_id))?;

        commit(self, &ChangedFields::from([CookbookField::Recipes.as_str().to_string()]));
        self.record(CookbookEvent::RecipeRemoved {
            cookbook_id: self.id,
            recipe_id,
            version: self.version(),
            occurred_at: self.updated_at(),
        });
        Ok(recipe)
    }

    /// Generic update of one recipe, routed through the root
    ///
    /// Returns the recipe fields that actually changed.
    pub fn update_recipe(
        &mut self,
        recipe_id: RecipeId,
        changes: Vec<RecipeChange>,
    ) -> Result<ChangedFields, MutationError> {
        let changed = self.mutate_recipe(recipe_id, |recipe| recipe.update(changes))?;
        self.record_recipe_update(recipe_id, &changed);
        Ok(changed)
    }

    pub fn rename_recipe(&mut self, recipe_id: RecipeId, name: impl Into<String>) -> Result<(), MutationError> {
        let name = name.into();
        let changed = self.mutate_recipe(recipe_id, |recipe| recipe.rename(name))?;
        self.record_recipe_update(recipe_id, &changed);
        Ok(())
    }

    pub fn rate_recipe(&mut self, recipe_id: RecipeId, rating: Rating) -> Result<(), MutationError> {
        self.mutate_recipe(recipe_id, |recipe| recipe.rate(rating))?;
        self.record(CookbookEvent::RecipeRated {
            cookbook_id: self.id,
            recipe_id,
            rating,
            version: self.version(),
            occurred_at: self.updated_at(),
        });
        Ok(())
    }

    pub fn tag_recipe(&mut self, recipe_id: RecipeId, tag: Tag) -> Result<(), MutationError> {
        let changed = self.mutate_recipe(recipe_id, |recipe| recipe.tag(tag))?;
        self.record_recipe_update(recipe_id, &changed);
        Ok(())
    }

    pub fn untag_recipe(&mut self, recipe_id: RecipeId, tag: &Tag) -> Result<(), MutationError> {
        let changed = self.mutate_recipe(recipe_id, |recipe| recipe.untag(tag))?;
        self.record_recipe_update(recipe_id, &changed);
        Ok(())
    }

    /// Soft-delete a recipe; it stays in the cookbook but leaves every aggregate
    pub fn discard_recipe(&mut self, recipe_id: RecipeId) -> Result<(), MutationError> {
        self.mutate_recipe(recipe_id, |recipe| recipe.discard())?;
        self.record(CookbookEvent::RecipeDiscarded {
            cookbook_id: self.id,
            recipe_id,
            version: self.version(),
            occurred_at: self.updated_at(),
        });
        Ok(())
    }

    /// Delegate to a recipe mutator, then commit the translated paths on the root
    fn mutate_recipe<F>(&mut self, recipe_id: RecipeId, mutation: F) -> Result<ChangedFields, MutationError>
    where
        F: FnOnce(&mut Recipe) -> Result<ChangedFields, MutationError>,
    {
        self.core.ensure_active(Self::KIND, self.id)?;
        let recipe = self
            .recipes
            .get_mut(&recipe_id)
            .ok_or_else(|| recipe_not_found(recipe_id))?;

        let changed = mutation(recipe)?;
        let root_changed: ChangedFields = changed
            .iter()
            .map(|field| format!("{}.{}", CookbookField::Recipes.as_str(), field))
            .collect();
        commit(self, &root_changed);
        Ok(changed)
    }

    fn record(&mut self, event: CookbookEvent) {
        self.events.push(event);
    }

    fn record_field_events(&mut self, changed: &ChangedFields) {
        if changed.contains(CookbookField::Title.as_str()) {
            self.record(CookbookEvent::Renamed {
                cookbook_id: self.id,
                title: self.title.clone(),
                version: self.version(),
                occurred_at: self.updated_at(),
            });
        }
        if changed.contains(CookbookField::Labels.as_str()) {
            let labels: BTreeSet<Tag> = self.labels.iter().cloned().collect();
            self.record(CookbookEvent::Relabelled {
                cookbook_id: self.id,
                labels: labels.into_iter().collect(),
                version: self.version(),
                occurred_at: self.updated_at(),
            });
        }
    }

    fn record_recipe_update(&mut self, recipe_id: RecipeId, changed: &ChangedFields) {
        if changed.is_empty() {
            return;
        }
        self.record(CookbookEvent::RecipeUpdated {
            cookbook_id: self.id,
            recipe_id,
            fields: changed.iter().cloned().collect(),
            version: self.version(),
            occurred_at: self.updated_at(),
        });
    }
}

fn recipe_not_found(recipe_id: RecipeId) -> MutationError {
    MutationError::NotFound {
        entity: Recipe::KIND,
        id: recipe_id.to_string(),
    }
}

impl Entity for Cookbook {
    const KIND: &'static str = "Cookbook";
    type Id = CookbookId;

    fn id(&self) -> CookbookId {
        self.id
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }
}

impl Lifecycle for Cookbook {
    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

/// Observable equality: stored fields, lifecycle values and recipes; never caches or pending events
impl PartialEq for Cookbook {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.title == other.title
            && self.labels == other.labels
            && self.recipes == other.recipes
            && self.version() == other.version()
            && self.is_discarded() == other.is_discarded()
            && self.created_at() == other.created_at()
            && self.updated_at() == other.updated_at()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::nutrition::Nutrition;

    fn tag(s: &str) -> Tag {
        Tag::parse(s).unwrap()
    }

    fn recipe(name: &str, weight_grams: u32, tags: &[&str]) -> Recipe {
        Recipe::create(
            RecipeId(Uuid::new_v4()),
            RecipeDraft {
                name: name.to_string(),
                weight_grams,
                servings: 2,
                tags: tags.iter().map(|t| tag(t)).collect(),
                nutrition: Some(Nutrition::new(800, 30, 20, 90).unwrap()),
            },
        )
        .unwrap()
    }

    fn cookbook(recipes: Vec<Recipe>) -> Cookbook {
        Cookbook::create(
            CookbookId(Uuid::new_v4()),
            CookbookDraft {
                title: "Weeknight Suppers".to_string(),
                labels: HashSet::from([tag("weeknight")]),
                recipes,
            },
        )
        .unwrap()
    }

    #[test]
    fn test_field_names_match_attribute_table() {
        let names: Vec<&str> = CookbookField::ALL.iter().map(|f| f.as_str()).collect();
        assert_eq!(names, cookbook_attributes().fields);
    }

    #[test]
    fn test_create_collects_every_violation() {
        let duplicate = recipe("Dal", 700, &[]);
        let err = Cookbook::create(
            CookbookId(Uuid::new_v4()),
            CookbookDraft {
                title: " ".to_string(),
                labels: (0..17).map(|i| tag(&format!("label-{i}"))).collect(),
                recipes: vec![duplicate.clone(), duplicate],
            },
        )
        .unwrap_err();
        assert_eq!(err.entity, "Cookbook");
        assert!(err.violations.mentions("title"));
        assert!(err.violations.mentions("labels"));
        assert!(err.violations.mentions("recipes"));
    }

    #[test]
    fn test_create_records_event() {
        let mut book = cookbook(vec![recipe("Dal", 700, &[])]);
        let events = book.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "cookbook_created");
        assert!(book.pending_events().is_empty());
    }

    #[test]
    fn test_child_update_invalidates_root_aggregate() {
        let dal = recipe("Dal", 700, &["lentils"]);
        let dal_id = dal.id();
        let mut book = cookbook(vec![dal, recipe("Pilaf", 500, &["rice"])]);

        assert_eq!(*book.total_weight_grams(), 1200);
        let slug = book.title_slug();

        book.update_recipe(dal_id, vec![RecipeChange::WeightGrams(900)]).unwrap();

        assert_eq!(*book.total_weight_grams(), 1400);
        assert_eq!(book.version(), 2);
        // title_slug does not depend on recipes
        assert!(Arc::ptr_eq(&slug, &book.title_slug()));
    }

    #[test]
    fn test_child_tag_change_only_touches_tag_index() {
        let dal = recipe("Dal", 700, &["lentils"]);
        let dal_id = dal.id();
        let mut book = cookbook(vec![dal]);
        let weight = book.total_weight_grams();
        let _ = book.tag_index();

        book.tag_recipe(dal_id, tag("spicy")).unwrap();

        assert!(Arc::ptr_eq(&weight, &book.total_weight_grams()));
        assert!(!book.cache_state().contains(ATTR_TAG_INDEX));
        let index: Vec<String> = book.tag_index().iter().map(Tag::to_string).collect();
        assert_eq!(index, ["lentils", "spicy", "weeknight"]);
    }

    #[test]
    fn test_discarded_recipe_leaves_aggregates() {
        let dal = recipe("Dal", 700, &["lentils"]);
        let dal_id = dal.id();
        let mut book = cookbook(vec![dal, recipe("Pilaf", 500, &["rice"])]);
        book.rate_recipe(dal_id, Rating::new(1).unwrap()).unwrap();
        assert_eq!(book.average_rating().unwrap().centi_stars(), 100);

        book.discard_recipe(dal_id).unwrap();

        assert_eq!(*book.total_weight_grams(), 500);
        assert!(book.average_rating().is_none());
        assert!(!book.tag_index().contains(&tag("lentils")));
        assert_eq!(book.recipe_count(), 2);
        assert!(book.recipe(dal_id).unwrap().is_discarded());
        assert!(matches!(
            book.rename_recipe(dal_id, "Tadka Dal"),
            Err(MutationError::Discarded(_))
        ));
    }

    #[test]
    fn test_pooled_average_weights_every_rating() {
        let a = recipe("A", 100, &[]);
        let b = recipe("B", 100, &[]);
        let (a_id, b_id) = (a.id(), b.id());
        let mut book = cookbook(vec![a, b]);
        book.rate_recipe(a_id, Rating::new(5).unwrap()).unwrap();
        book.rate_recipe(a_id, Rating::new(5).unwrap()).unwrap();
        book.rate_recipe(b_id, Rating::new(2).unwrap()).unwrap();
        assert_eq!(book.average_rating().unwrap().centi_stars(), 400);
    }

    #[test]
    fn test_add_and_remove_recipe() {
        let mut book = cookbook(vec![]);
        let dal = recipe("Dal", 700, &[]);
        let dal_id = dal.id();
        assert_eq!(*book.total_weight_grams(), 0);

        book.add_recipe(dal.clone()).unwrap();
        assert_eq!(*book.total_weight_grams(), 700);

        let err = book.add_recipe(dal).unwrap_err();
        assert!(matches!(err, MutationError::Duplicate(ref e) if e.key == dal_id.to_string()));

        let mut stale = recipe("Stale Bread", 300, &[]);
        stale.discard().unwrap();
        let err = book.add_recipe(stale).unwrap_err();
        assert!(err.violations().unwrap().mentions("recipes"));

        let removed = book.remove_recipe(dal_id).unwrap();
        assert_eq!(removed.name(), "Dal");
        assert_eq!(*book.total_weight_grams(), 0);
        assert!(matches!(
            book.remove_recipe(dal_id),
            Err(MutationError::NotFound { entity: "Recipe", .. })
        ));
    }

    #[test]
    fn test_create_rejects_discarded_recipe() {
        let mut stale = recipe("Stale Bread", 300, &[]);
        stale.discard().unwrap();
        let stale_id = stale.id();

        let err = Cookbook::create(
            CookbookId(Uuid::new_v4()),
            CookbookDraft {
                title: "Leftovers".to_string(),
                labels: HashSet::new(),
                recipes: vec![recipe("Soup", 500, &[]), stale.clone()],
            },
        )
        .unwrap_err();
        assert_eq!(err.violations.len(), 1);
        assert!(err.violations.mentions("recipes"));

        // restore keeps accepting discarded children
        let mut state = cookbook(vec![]).to_state();
        state.recipes = vec![stale];
        let restored = Cookbook::restore(state).unwrap();
        assert!(restored.recipe(stale_id).unwrap().is_discarded());
    }

    #[test]
    fn test_update_is_all_or_nothing_and_reports_all() {
        let mut book = cookbook(vec![]);
        let err = book
            .update(vec![
                CookbookChange::Title("  ".to_string()),
                CookbookChange::Labels((0..20).map(|i| tag(&format!("l{i}"))).collect()),
            ])
            .unwrap_err();
        assert_eq!(err.violations().unwrap().len(), 2);
        assert_eq!(book.title(), "Weeknight Suppers");
        assert_eq!(book.version(), 1);
    }

    #[test]
    fn test_noop_update_changes_nothing() {
        let mut book = cookbook(vec![]);
        book.take_events();
        let slug = book.title_slug();
        let changed = book
            .update(vec![
                CookbookChange::Title("Weeknight Suppers".to_string()),
                CookbookChange::Labels(HashSet::from([tag("weeknight")])),
            ])
            .unwrap();
        assert!(changed.is_empty());
        assert_eq!(book.version(), 1);
        assert!(Arc::ptr_eq(&slug, &book.title_slug()));
        assert!(book.pending_events().is_empty());
    }

    #[test]
    fn test_rename_refreshes_slug_and_records_event() {
        let mut book = cookbook(vec![]);
        book.take_events();
        assert_eq!(book.title_slug().as_str(), "weeknight-suppers");

        book.rename("Sunday Roasts").unwrap();

        assert_eq!(book.title_slug().as_str(), "sunday-roasts");
        let events = book.take_events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].event_type(), "cookbook_renamed");
        assert_eq!(events[0].version(), 2);
    }

    #[test]
    fn test_labels_feed_tag_index() {
        let mut book = cookbook(vec![]);
        book.label(tag("vegan")).unwrap();
        book.label(tag("vegan")).unwrap();
        assert_eq!(book.version(), 2);
        assert!(book.tag_index().contains(&tag("vegan")));
        book.unlabel(&tag("vegan")).unwrap();
        assert!(!book.tag_index().contains(&tag("vegan")));
    }

    #[test]
    fn test_catalog_code_is_manual_only() {
        let mut book = cookbook(vec![]);
        let code = book.catalog_code();
        book.rename("Another Title").unwrap();
        assert!(Arc::ptr_eq(&code, &book.catalog_code()));

        assert!(book.clear_caches() >= 1);
        assert!(book.cache_state().is_empty());
        assert_eq!(book.catalog_code(), code);
    }

    #[test]
    fn test_discarded_cookbook_rejects_everything() {
        let dal = recipe("Dal", 700, &[]);
        let dal_id = dal.id();
        let mut book = cookbook(vec![dal]);
        book.discard().unwrap();

        assert!(matches!(book.rename("x"), Err(MutationError::Discarded(_))));
        assert!(matches!(
            book.rate_recipe(dal_id, Rating::new(3).unwrap()),
            Err(MutationError::Discarded(_))
        ));
        assert!(matches!(book.discard(), Err(MutationError::Discarded(_))));
        assert_eq!(book.title(), "Weeknight Suppers");
    }

    #[test]
    fn test_restore_round_trips_state() {
        let dal = recipe("Dal", 700, &["lentils"]);
        let dal_id = dal.id();
        let mut book = cookbook(vec![dal]);
        book.rate_recipe(dal_id, Rating::new(4).unwrap()).unwrap();

        let restored = Cookbook::restore(book.to_state()).unwrap();
        assert_eq!(restored, book);
        assert!(restored.pending_events().is_empty());
        assert!(restored.cache_state().is_empty());
    }

    #[test]
    fn test_clone_starts_with_cold_cache() {
        let book = cookbook(vec![recipe("Dal", 700, &[])]);
        let _ = book.total_weight_grams();
        let copy = book.clone();
        assert!(copy.cache_state().is_empty());
        assert_eq!(copy, book);
    }

    #[test]
    fn test_clone_does_not_duplicate_pending_events() {
        let mut book = cookbook(vec![]);
        book.rename("Sunday Roasts").unwrap();
        let mut copy = book.clone();

        assert!(copy.take_events().is_empty());
        assert_eq!(book.take_events().len(), 2);
    }

    #[test]
    fn test_mutation_never_moves_updated_at_backwards() {
        let ahead = Utc::now() + chrono::Duration::hours(1);
        let mut state = cookbook(vec![]).to_state();
        state.created_at = ahead;
        state.updated_at = ahead;
        let mut book = Cookbook::restore(state).unwrap();

        book.rename("Summer").unwrap();

        assert_eq!(book.version(), 2);
        assert!(book.updated_at() >= book.created_at());
        assert!(Cookbook::restore(book.to_state()).is_ok());
    }
}
