// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Recipe
//!
//! Child entity of the `Cookbook` aggregate. Anyone may create or read a
//! recipe; every mutator is visible to the `cookbook` module only, so the
//! root always sees child changes and can invalidate its own caches.

use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::sync::Arc;
use uuid::Uuid;

use crate::domain::cache::{AttributeTable, ChangedFields, ComputedAttr};
use crate::domain::cookbook::derived;
use crate::domain::entity::{commit, Entity, EntityCore, Lifecycle};
use crate::domain::error::{ConstructionError, MutationError, Violations};
use crate::domain::nutrition::Nutrition;
use crate::domain::rating::{AverageRating, Rating};
use crate::domain::tag::Tag;

// ============================================================================
// Invariants
// ============================================================================

pub const MAX_NAME_LENGTH: usize = 120;
pub const MAX_WEIGHT_GRAMS: u32 = 100_000;
pub const MAX_SERVINGS: u8 = 100;
pub const MAX_TAGS: usize = 32;
pub const MAX_RATINGS: usize = 10_000;

// ============================================================================
// Value Objects
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecipeId(pub Uuid);

impl RecipeId {
    pub fn from_uuid(id: Uuid) -> Self {
        Self(id)
    }

    pub fn from_string(s: &str) -> Result<Self, uuid::Error> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

impl std::fmt::Display for RecipeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Stored fields of a recipe, in declaration order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum RecipeField {
    Name,
    WeightGrams,
    Servings,
    Tags,
    Nutrition,
    Ratings,
    Discarded,
}

impl RecipeField {
    pub const ALL: [RecipeField; 7] = [
        Self::Name,
        Self::WeightGrams,
        Self::Servings,
        Self::Tags,
        Self::Nutrition,
        Self::Ratings,
        Self::Discarded,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::WeightGrams => "weight_grams",
            Self::Servings => "servings",
            Self::Tags => "tags",
            Self::Nutrition => "nutrition",
            Self::Ratings => "ratings",
            Self::Discarded => "discarded",
        }
    }
}

/// One requested write in a generic recipe update
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecipeChange {
    Name(String),
    WeightGrams(u32),
    Servings(u8),
    Tags(HashSet<Tag>),
    Nutrition(Option<Nutrition>),
}

impl RecipeChange {
    pub fn field(&self) -> RecipeField {
        match self {
            Self::Name(_) => RecipeField::Name,
            Self::WeightGrams(_) => RecipeField::WeightGrams,
            Self::Servings(_) => RecipeField::Servings,
            Self::Tags(_) => RecipeField::Tags,
            Self::Nutrition(_) => RecipeField::Nutrition,
        }
    }
}

/// Input to [`Recipe::create`]
#[derive(Debug, Clone, Default)]
pub struct RecipeDraft {
    pub name: String,
    pub weight_grams: u32,
    pub servings: u8,
    pub tags: HashSet<Tag>,
    pub nutrition: Option<Nutrition>,
}

/// Complete recipe state, used to rebuild a recipe from another representation
#[derive(Debug, Clone)]
pub struct RecipeState {
    pub id: RecipeId,
    pub name: String,
    pub weight_grams: u32,
    pub servings: u8,
    pub tags: HashSet<Tag>,
    pub nutrition: Option<Nutrition>,
    pub ratings: Vec<Rating>,
    pub version: u64,
    pub discarded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// ============================================================================
// Computed Attributes
// ============================================================================

pub const ATTR_AVERAGE_RATING: &str = "average_rating";
pub const ATTR_NUTRITION_PER_SERVING: &str = "nutrition_per_serving";
pub const ATTR_TAG_LINE: &str = "tag_line";

static RECIPE_TABLE: AttributeTable = AttributeTable::new(
    "Recipe",
    &["name", "weight_grams", "servings", "tags", "nutrition", "ratings", "discarded"],
    &[
        ComputedAttr::derived(ATTR_AVERAGE_RATING, &["ratings"]),
        ComputedAttr::derived(ATTR_NUTRITION_PER_SERVING, &["nutrition", "servings"]),
        ComputedAttr::derived(ATTR_TAG_LINE, &["tags"]),
    ],
);

static RECIPE_ATTRIBUTES: Lazy<&'static AttributeTable> = Lazy::new(|| RECIPE_TABLE.checked());

/// Computed attribute declarations for `Recipe`
pub fn recipe_attributes() -> &'static AttributeTable {
    *RECIPE_ATTRIBUTES
}

// ============================================================================
// Validation
// ============================================================================

fn check_name(name: &str, violations: &mut Violations) {
    let name = name.trim();
    violations.check(!name.is_empty(), "name", "must not be blank");
    violations.check(
        name.chars().count() <= MAX_NAME_LENGTH,
        "name",
        format!("must not exceed {MAX_NAME_LENGTH} characters"),
    );
}

fn check_weight(weight_grams: u32, violations: &mut Violations) {
    violations.check(
        (1..=MAX_WEIGHT_GRAMS).contains(&weight_grams),
        "weight_grams",
        format!("must be between 1 and {MAX_WEIGHT_GRAMS}, got {weight_grams}"),
    );
}

fn check_servings(servings: u8, violations: &mut Violations) {
    violations.check(
        (1..=MAX_SERVINGS).contains(&servings),
        "servings",
        format!("must be between 1 and {MAX_SERVINGS}, got {servings}"),
    );
}

fn check_tags(tags: &HashSet<Tag>, violations: &mut Violations) {
    violations.check(
        tags.len() <= MAX_TAGS,
        "tags",
        format!("must not hold more than {MAX_TAGS} tags, got {}", tags.len()),
    );
}

fn check_ratings(ratings: &[Rating], violations: &mut Violations) {
    violations.check(
        ratings.len() <= MAX_RATINGS,
        "ratings",
        format!("must not hold more than {MAX_RATINGS} ratings, got {}", ratings.len()),
    );
}

fn replace_if_changed<T: PartialEq>(slot: &mut T, value: T) -> bool {
    if *slot == value {
        return false;
    }
    *slot = value;
    true
}

// ============================================================================
// Entity: Recipe
// ============================================================================

#[derive(Debug, Clone)]
pub struct Recipe {
    id: RecipeId,
    name: String,
    weight_grams: u32,
    servings: u8,
    tags: HashSet<Tag>,
    nutrition: Option<Nutrition>,
    ratings: Vec<Rating>,
    core: EntityCore,
}

impl Recipe {
    /// Create a recipe, checking every invariant before anything is built
    pub fn create(id: RecipeId, draft: RecipeDraft) -> Result<Self, ConstructionError> {
        let mut violations = Violations::new();
        check_name(&draft.name, &mut violations);
        check_weight(draft.weight_grams, &mut violations);
        check_servings(draft.servings, &mut violations);
        check_tags(&draft.tags, &mut violations);
        if !violations.is_empty() {
            return Err(ConstructionError::new(Self::KIND, violations));
        }

        Ok(Self {
            id,
            name: draft.name.trim().to_string(),
            weight_grams: draft.weight_grams,
            servings: draft.servings,
            tags: draft.tags,
            nutrition: draft.nutrition,
            ratings: Vec::new(),
            core: EntityCore::new(recipe_attributes()),
        })
    }

    /// Rebuild a recipe with its full lifecycle state, re-checking invariants
    pub fn restore(state: RecipeState) -> Result<Self, ConstructionError> {
        let mut violations = Violations::new();
        check_name(&state.name, &mut violations);
        check_weight(state.weight_grams, &mut violations);
        check_servings(state.servings, &mut violations);
        check_tags(&state.tags, &mut violations);
        check_ratings(&state.ratings, &mut violations);
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
            name: state.name.trim().to_string(),
            weight_grams: state.weight_grams,
            servings: state.servings,
            tags: state.tags,
            nutrition: state.nutrition,
            ratings: state.ratings,
            core: EntityCore::restore(
                recipe_attributes(),
                state.version,
                state.discarded,
                state.created_at,
                state.updated_at,
            ),
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn weight_grams(&self) -> u32 {
        self.weight_grams
    }

    pub fn servings(&self) -> u8 {
        self.servings
    }

    pub fn tags(&self) -> &HashSet<Tag> {
        &self.tags
    }

    pub fn nutrition(&self) -> Option<&Nutrition> {
        self.nutrition.as_ref()
    }

    pub fn ratings(&self) -> &[Rating] {
        &self.ratings
    }

    /// Mean rating, memoized until `ratings` changes
    pub fn average_rating(&self) -> Arc<Option<AverageRating>> {
        self.core
            .ledger()
            .get_or_insert_with(ATTR_AVERAGE_RATING, || AverageRating::of(&self.ratings))
    }

    /// Nutrition for a single serving, memoized until `nutrition` or `servings` changes
    pub fn nutrition_per_serving(&self) -> Arc<Option<Nutrition>> {
        self.core.ledger().get_or_insert_with(ATTR_NUTRITION_PER_SERVING, || {
            self.nutrition.map(|n| n.per_serving(self.servings))
        })
    }

    /// Sorted, comma-separated tags, memoized until `tags` changes
    pub fn tag_line(&self) -> Arc<String> {
        self.core
            .ledger()
            .get_or_insert_with(ATTR_TAG_LINE, || derived::tag_line(&self.tags))
    }

    pub fn to_state(&self) -> RecipeState {
        RecipeState {
            id: self.id,
            name: self.name.clone(),
            weight_grams: self.weight_grams,
            servings: self.servings,
            tags: self.tags.clone(),
            nutrition: self.nutrition,
            ratings: self.ratings.clone(),
            version: self.version(),
            discarded: self.is_discarded(),
            created_at: self.created_at(),
            updated_at: self.updated_at(),
        }
    }

    // ========================================================================
    // Commands (reachable through the Cookbook root only)
    // ========================================================================

    /// Apply a set of field writes all-or-nothing
    ///
    /// Every change is validated before any is written. Writes that leave a
    /// field at its current value are skipped. Returns the fields that
    /// actually changed.
    pub(in crate::domain::cookbook) fn update(
        &mut self,
        changes: Vec<RecipeChange>,
    ) -> Result<ChangedFields, MutationError> {
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
                RecipeChange::Name(name) => check_name(name, &mut violations),
                RecipeChange::WeightGrams(weight) => check_weight(*weight, &mut violations),
                RecipeChange::Servings(servings) => check_servings(*servings, &mut violations),
                RecipeChange::Tags(tags) => check_tags(tags, &mut violations),
                RecipeChange::Nutrition(_) => {}
            }
        }
        if !violations.is_empty() {
            return Err(MutationError::invalid(Self::KIND, violations));
        }

        let mut changed = ChangedFields::new();
        for change in changes {
            let field = change.field();
            let written = match change {
                RecipeChange::Name(name) => replace_if_changed(&mut self.name, name.trim().to_string()),
                RecipeChange::WeightGrams(weight) => replace_if_changed(&mut self.weight_grams, weight),
                RecipeChange::Servings(servings) => replace_if_changed(&mut self.servings, servings),
                RecipeChange::Tags(tags) => replace_if_changed(&mut self.tags, tags),
                RecipeChange::Nutrition(nutrition) => replace_if_changed(&mut self.nutrition, nutrition),
            };
            if written {
                changed.insert(field.as_str().to_string());
            }
        }

        commit(self, &changed);
        Ok(changed)
    }

    pub(in crate::domain::cookbook) fn rename(&mut self, name: String) -> Result<ChangedFields, MutationError> {
        self.update(vec![RecipeChange::Name(name)])
    }

    pub(in crate::domain::cookbook) fn rate(&mut self, rating: Rating) -> Result<ChangedFields, MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;
        if self.ratings.len() >= MAX_RATINGS {
            let mut violations = Violations::new();
            violations.push("ratings", format!("must not hold more than {MAX_RATINGS} ratings"));
            return Err(MutationError::invalid(Self::KIND, violations));
        }

        self.ratings.push(rating);
        let changed = ChangedFields::from([RecipeField::Ratings.as_str().to_string()]);
        commit(self, &changed);
        Ok(changed)
    }

    pub(in crate::domain::cookbook) fn tag(&mut self, tag: Tag) -> Result<ChangedFields, MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;
        if self.tags.contains(&tag) {
            return Ok(ChangedFields::new());
        }
        if self.tags.len() >= MAX_TAGS {
            let mut violations = Violations::new();
            violations.push("tags", format!("must not hold more than {MAX_TAGS} tags"));
            return Err(MutationError::invalid(Self::KIND, violations));
        }

        self.tags.insert(tag);
        let changed = ChangedFields::from([RecipeField::Tags.as_str().to_string()]);
        commit(self, &changed);
        Ok(changed)
    }

    pub(in crate::domain::cookbook) fn untag(&mut self, tag: &Tag) -> Result<ChangedFields, MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;
        if !self.tags.remove(tag) {
            return Ok(ChangedFields::new());
        }

        let changed = ChangedFields::from([RecipeField::Tags.as_str().to_string()]);
        commit(self, &changed);
        Ok(changed)
    }

    pub(in crate::domain::cookbook) fn discard(&mut self) -> Result<ChangedFields, MutationError> {
        self.core.ensure_active(Self::KIND, self.id)?;
        self.core.mark_discarded();
        let changed = ChangedFields::from([RecipeField::Discarded.as_str().to_string()]);
        commit(self, &changed);
        Ok(changed)
    }
}

impl Entity for Recipe {
    const KIND: &'static str = "Recipe";
    type Id = RecipeId;

    fn id(&self) -> RecipeId {
        self.id
    }

    fn core(&self) -> &EntityCore {
        &self.core
    }
}

impl Lifecycle for Recipe {
    fn core_mut(&mut self) -> &mut EntityCore {
        &mut self.core
    }
}

/// Observable equality: every stored field and lifecycle value, never the cache
impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
            && self.name == other.name
            && self.weight_grams == other.weight_grams
            && self.servings == other.servings
            && self.tags == other.tags
            && self.nutrition == other.nutrition
            && self.ratings == other.ratings
            && self.version() == other.version()
            && self.is_discarded() == other.is_discarded()
            && self.created_at() == other.created_at()
            && self.updated_at() == other.updated_at()
    }
}
