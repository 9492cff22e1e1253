// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! API Values
//!
//! Immutable, validated snapshots of the domain entities. Computed attributes
//! appear as plain fields; a view never recomputes anything after it is built.
//!
//! Views are only constructed through `::new`, which checks ranges and that
//! every materialized value agrees with the raw fields it derives from.
//! Deserialization goes through the same check.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::application::conversion::{FrozenSet, Keyed, ValidationFailure};
use crate::domain::cookbook::derived;
use crate::domain::cookbook::recipe::{MAX_NAME_LENGTH, MAX_RATINGS, MAX_SERVINGS, MAX_TAGS, MAX_WEIGHT_GRAMS};
use crate::domain::cookbook::{CookbookId, RecipeId, MAX_LABELS, MAX_RECIPES, MAX_TITLE_LENGTH};
use crate::domain::nutrition::Nutrition;
use crate::domain::rating::{AverageRating, Rating};
use crate::domain::tag::Tag;

fn ensure(ok: bool, field: &str, message: impl FnOnce() -> String) -> Result<(), ValidationFailure> {
    if ok {
        Ok(())
    } else {
        Err(ValidationFailure::new(field, message()))
    }
}

fn ensure_text(value: &str, field: &str, max_chars: usize) -> Result<(), ValidationFailure> {
    ensure(!value.trim().is_empty(), field, || "must not be blank".to_string())?;
    ensure(value.trim() == value, field, || "must not have surrounding whitespace".to_string())?;
    ensure(value.chars().count() <= max_chars, field, || {
        format!("must not exceed {max_chars} characters")
    })
}

fn ensure_lifecycle(version: u64, created_at: DateTime<Utc>, updated_at: DateTime<Utc>) -> Result<(), ValidationFailure> {
    ensure(version >= 1, "version", || "must be at least 1".to_string())?;
    ensure(updated_at >= created_at, "updated_at", || "must not precede created_at".to_string())
}

fn ensure_materialized<T: PartialEq + std::fmt::Debug>(field: &str, stored: &T, expected: &T) -> Result<(), ValidationFailure> {
    ensure(stored == expected, field, || {
        format!("materialized value {stored:?} disagrees with source fields ({expected:?})")
    })
}

// ============================================================================
// RecipeView
// ============================================================================

/// Raw fields of a [`RecipeView`], before validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RecipeViewFields {
    pub id: RecipeId,
    pub name: String,
    pub weight_grams: u32,
    pub servings: u8,
    pub tags: FrozenSet<Tag>,
    pub nutrition: Option<Nutrition>,
    pub ratings: Vec<Rating>,
    pub version: u64,
    pub discarded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub average_rating: Option<AverageRating>,
    pub nutrition_per_serving: Option<Nutrition>,
    pub tag_line: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RecipeViewFields", into = "RecipeViewFields")]
pub struct RecipeView {
    fields: RecipeViewFields,
}

impl RecipeView {
    pub fn new(fields: RecipeViewFields) -> Result<Self, ValidationFailure> {
        ensure_text(&fields.name, "name", MAX_NAME_LENGTH)?;
        ensure((1..=MAX_WEIGHT_GRAMS).contains(&fields.weight_grams), "weight_grams", || {
            format!("must be between 1 and {MAX_WEIGHT_GRAMS}")
        })?;
        ensure((1..=MAX_SERVINGS).contains(&fields.servings), "servings", || {
            format!("must be between 1 and {MAX_SERVINGS}")
        })?;
        ensure(fields.tags.len() <= MAX_TAGS, "tags", || format!("must not hold more than {MAX_TAGS} tags"))?;
        ensure(fields.ratings.len() <= MAX_RATINGS, "ratings", || {
            format!("must not hold more than {MAX_RATINGS} ratings")
        })?;
        if let Some(n) = &fields.nutrition {
            Nutrition::new(n.calories(), n.protein_g(), n.fat_g(), n.carbohydrate_g()).map_err(|v| {
                ValidationFailure::from_violations(&v).unwrap_or_else(|| ValidationFailure::new("nutrition", v.to_string()))
            })?;
        }
        ensure_lifecycle(fields.version, fields.created_at, fields.updated_at)?;

        ensure_materialized("average_rating", &fields.average_rating, &AverageRating::of(&fields.ratings))?;
        ensure_materialized(
            "nutrition_per_serving",
            &fields.nutrition_per_serving,
            &fields.nutrition.map(|n| n.per_serving(fields.servings)),
        )?;
        ensure_materialized("tag_line", &fields.tag_line, &derived::tag_line(&fields.tags))?;

        Ok(Self { fields })
    }

    pub fn id(&self) -> RecipeId {
        self.fields.id
    }

    pub fn name(&self) -> &str {
        &self.fields.name
    }

    pub fn weight_grams(&self) -> u32 {
        self.fields.weight_grams
    }

    pub fn servings(&self) -> u8 {
        self.fields.servings
    }

    pub fn tags(&self) -> &FrozenSet<Tag> {
        &self.fields.tags
    }

    pub fn nutrition(&self) -> Option<&Nutrition> {
        self.fields.nutrition.as_ref()
    }

    pub fn ratings(&self) -> &[Rating] {
        &self.fields.ratings
    }

    pub fn version(&self) -> u64 {
        self.fields.version
    }

    pub fn is_discarded(&self) -> bool {
        self.fields.discarded
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.fields.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.fields.updated_at
    }

    pub fn average_rating(&self) -> Option<AverageRating> {
        self.fields.average_rating
    }

    pub fn nutrition_per_serving(&self) -> Option<&Nutrition> {
        self.fields.nutrition_per_serving.as_ref()
    }

    pub fn tag_line(&self) -> &str {
        &self.fields.tag_line
    }

    pub fn fields(&self) -> &RecipeViewFields {
        &self.fields
    }

    pub fn into_fields(self) -> RecipeViewFields {
        self.fields
    }
}

impl Keyed for RecipeView {
    type Key = RecipeId;

    fn key(&self) -> RecipeId {
        self.fields.id
    }
}

impl TryFrom<RecipeViewFields> for RecipeView {
    type Error = ValidationFailure;

    fn try_from(fields: RecipeViewFields) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<RecipeView> for RecipeViewFields {
    fn from(view: RecipeView) -> Self {
        view.fields
    }
}

// ============================================================================
// CookbookView
// ============================================================================

/// Raw fields of a [`CookbookView`], before validation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CookbookViewFields {
    pub id: CookbookId,
    pub title: String,
    pub labels: FrozenSet<Tag>,
    pub recipes: FrozenSet<RecipeView>,
    pub version: u64,
    pub discarded: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub total_weight_grams: u64,
    pub tag_index: FrozenSet<Tag>,
    pub average_rating: Option<AverageRating>,
    pub title_slug: String,
    pub catalog_code: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "CookbookViewFields", into = "CookbookViewFields")]
pub struct CookbookView {
    fields: CookbookViewFields,
}

impl CookbookView {
    pub fn new(fields: CookbookViewFields) -> Result<Self, ValidationFailure> {
        ensure_text(&fields.title, "title", MAX_TITLE_LENGTH)?;
        ensure(fields.labels.len() <= MAX_LABELS, "labels", || {
            format!("must not hold more than {MAX_LABELS} labels")
        })?;
        ensure(fields.recipes.len() <= MAX_RECIPES, "recipes", || {
            format!("must not hold more than {MAX_RECIPES} recipes")
        })?;
        ensure_lifecycle(fields.version, fields.created_at, fields.updated_at)?;

        let active = || fields.recipes.iter().filter(|r| !r.is_discarded());
        ensure_materialized(
            "total_weight_grams",
            &fields.total_weight_grams,
            &derived::total_weight_grams(active().map(RecipeView::weight_grams)),
        )?;
        let expected_index = derived::tag_index(&fields.labels, active().flat_map(|r| r.tags()));
        let stored_index: Vec<&Tag> = fields.tag_index.iter().collect();
        let expected_index: Vec<&Tag> = expected_index.iter().collect();
        ensure_materialized("tag_index", &stored_index, &expected_index)?;
        ensure_materialized(
            "average_rating",
            &fields.average_rating,
            &derived::pooled_average(active().flat_map(|r| r.ratings())),
        )?;
        ensure_materialized("title_slug", &fields.title_slug, &derived::title_slug(&fields.title))?;
        ensure_materialized("catalog_code", &fields.catalog_code, &derived::catalog_code(fields.id))?;

        Ok(Self { fields })
    }

    pub fn id(&self) -> CookbookId {
        self.fields.id
    }

    pub fn title(&self) -> &str {
        &self.fields.title
    }

    pub fn labels(&self) -> &FrozenSet<Tag> {
        &self.fields.labels
    }

    pub fn recipes(&self) -> &FrozenSet<RecipeView> {
        &self.fields.recipes
    }

    pub fn recipe(&self, id: RecipeId) -> Option<&RecipeView> {
        self.fields.recipes.get(&id)
    }

    pub fn version(&self) -> u64 {
        self.fields.version
    }

    pub fn is_discarded(&self) -> bool {
        self.fields.discarded
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.fields.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.fields.updated_at
    }

    pub fn total_weight_grams(&self) -> u64 {
        self.fields.total_weight_grams
    }

    pub fn tag_index(&self) -> &FrozenSet<Tag> {
        &self.fields.tag_index
    }

    pub fn average_rating(&self) -> Option<AverageRating> {
        self.fields.average_rating
    }

    pub fn title_slug(&self) -> &str {
        &self.fields.title_slug
    }

    pub fn catalog_code(&self) -> &str {
        &self.fields.catalog_code
    }

    pub fn fields(&self) -> &CookbookViewFields {
        &self.fields
    }

    pub fn into_fields(self) -> CookbookViewFields {
        self.fields
    }
}

impl TryFrom<CookbookViewFields> for CookbookView {
    type Error = ValidationFailure;

    fn try_from(fields: CookbookViewFields) -> Result<Self, Self::Error> {
        Self::new(fields)
    }
}

impl From<CookbookView> for CookbookViewFields {
    fn from(view: CookbookView) -> Self {
        view.fields
    }
}
