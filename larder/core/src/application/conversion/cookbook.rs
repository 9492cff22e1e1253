// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Cookbook conversions: `Cookbook` ↔ [`CookbookView`] ↔ [`StorageRecord`]
//!
//! Recipes travel as nested records inside the cookbook record, ordered by
//! creation time then id. A failure inside a child is reported with its
//! position, e.g. `recipes[3].servings`.

use std::sync::Arc;

use crate::application::conversion::adapters::{AdapterRegistry, CookbookLabels, CookbookRecipes};
use crate::application::conversion::collections::{
    from_ordered_sequence, to_immutable_unique, to_mutable_unique, to_ordered_sequence,
};
use crate::application::conversion::mapping::{FieldMapping, MappingTable, Persistence};
use crate::application::conversion::recipe::RecipeConverter;
use crate::application::conversion::{columns, Conversion, ConversionError, ConversionIncompleteError};
use crate::application::view::{CookbookView, CookbookViewFields, RecipeView};
use crate::domain::config::StorageConfig;
use crate::domain::cookbook::{
    cookbook_attributes, derived, Cookbook, CookbookId, CookbookState, ATTR_AVERAGE_RATING, ATTR_CATALOG_CODE,
    ATTR_TAG_INDEX, ATTR_TITLE_SLUG, ATTR_TOTAL_WEIGHT_GRAMS,
};
use crate::domain::entity::Entity;
use crate::domain::record::{StorageRecord, StorageValue};

static COOKBOOK_MAPPING: MappingTable = MappingTable::new(
    "cookbook",
    &[
        FieldMapping::new("id", Persistence::Column("id")),
        FieldMapping::new("version", Persistence::Column("version")),
        FieldMapping::new("created_at", Persistence::Column("created_at")),
        FieldMapping::new("updated_at", Persistence::Column("updated_at")),
        FieldMapping::new("title", Persistence::Column("title")),
        FieldMapping::new("labels", Persistence::Sequence("labels")),
        FieldMapping::new("recipes", Persistence::ChildRecords("recipes")),
        FieldMapping::new("discarded", Persistence::Column("discarded")),
        FieldMapping::new(ATTR_TOTAL_WEIGHT_GRAMS, Persistence::PersistedNotRecomputed("total_weight_grams")),
        FieldMapping::new(ATTR_TITLE_SLUG, Persistence::PersistedNotRecomputed("title_slug")),
        FieldMapping::new(ATTR_TAG_INDEX, Persistence::RecomputedOnLoad),
        FieldMapping::new(ATTR_AVERAGE_RATING, Persistence::RecomputedOnLoad),
        FieldMapping::new(ATTR_CATALOG_CODE, Persistence::RecomputedOnLoad),
    ],
);

/// How each cookbook field is persisted
pub fn cookbook_mapping() -> &'static MappingTable {
    &COOKBOOK_MAPPING
}

/// Prefix a child failure with its position in the parent
fn within_recipe(err: ConversionError, index: usize) -> ConversionError {
    match err {
        ConversionError::Validation(failure) => failure.within(format!("recipes[{index}]")).into(),
        other => other,
    }
}

#[derive(Debug, Clone)]
pub struct CookbookConverter {
    registry: Arc<AdapterRegistry>,
    recipes: RecipeConverter,
    storage: StorageConfig,
}

impl CookbookConverter {
    pub fn new(
        registry: Arc<AdapterRegistry>,
        recipes: RecipeConverter,
        storage: StorageConfig,
    ) -> Result<Self, ConversionIncompleteError> {
        COOKBOOK_MAPPING.check_covers(cookbook_attributes())?;
        registry.collection::<CookbookLabels>()?;
        registry.collection::<CookbookRecipes>()?;
        Ok(Self {
            registry,
            recipes,
            storage,
        })
    }

    pub fn recipes(&self) -> &RecipeConverter {
        &self.recipes
    }
}

impl Conversion for CookbookConverter {
    type Domain = Cookbook;
    type Api = CookbookView;

    fn from_domain(&self, cookbook: &Cookbook) -> Result<CookbookView, ConversionError> {
        let labels = to_immutable_unique(cookbook.labels().iter().cloned());
        self.registry.collection::<CookbookLabels>()?.check_count(labels.len())?;
        self.registry
            .collection::<CookbookRecipes>()?
            .check_count(cookbook.recipe_count())?;

        let recipes = cookbook
            .recipes_in_order()
            .into_iter()
            .enumerate()
            .map(|(i, recipe)| self.recipes.from_domain(recipe).map_err(|e| within_recipe(e, i)))
            .collect::<Result<Vec<RecipeView>, _>>()?;

        let view = CookbookView::new(CookbookViewFields {
            id: cookbook.id(),
            title: cookbook.title().to_string(),
            labels,
            recipes: to_immutable_unique(recipes),
            version: cookbook.version(),
            discarded: cookbook.is_discarded(),
            created_at: cookbook.created_at(),
            updated_at: cookbook.updated_at(),
            total_weight_grams: *cookbook.total_weight_grams(),
            tag_index: cookbook.tag_index().iter().cloned().collect(),
            average_rating: *cookbook.average_rating(),
            title_slug: cookbook.title_slug().to_string(),
            catalog_code: cookbook.catalog_code().to_string(),
        })?;
        Ok(view)
    }

    fn to_domain(&self, view: &CookbookView) -> Result<Cookbook, ConversionError> {
        let recipes = view
            .recipes()
            .iter()
            .map(|recipe| self.recipes.to_domain(recipe))
            .collect::<Result<Vec<_>, _>>()?;

        let cookbook = Cookbook::restore(CookbookState {
            id: view.id(),
            title: view.title().to_string(),
            labels: to_mutable_unique(view.labels()),
            recipes,
            version: view.version(),
            discarded: view.is_discarded(),
            created_at: view.created_at(),
            updated_at: view.updated_at(),
        })?;
        Ok(cookbook)
    }

    fn to_storage_fields(&self, view: &CookbookView) -> Result<StorageRecord, ConversionError> {
        let m = &COOKBOOK_MAPPING;
        let labels = to_ordered_sequence(view.labels(), |label| label.as_str().to_string());
        let ordered = to_ordered_sequence(view.recipes(), RecipeView::created_at);
        self.registry
            .collection::<CookbookRecipes>()?
            .check_count(ordered.len())?;

        let children = ordered
            .iter()
            .enumerate()
            .map(|(i, recipe)| self.recipes.to_storage_fields(recipe).map_err(|e| within_recipe(e, i)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut record = StorageRecord::new();
        record.insert(m.column("id")?, view.id().to_string());
        record.insert(m.column("version")?, columns::counter("version", view.version())?);
        record.insert(m.column("created_at")?, view.created_at());
        record.insert(m.column("updated_at")?, view.updated_at());
        record.insert(m.column("title")?, view.title());
        record.insert(
            m.column("labels")?,
            self.registry.collection::<CookbookLabels>()?.encode(&labels)?,
        );
        record.insert(m.column("recipes")?, StorageValue::Records(children));
        record.insert(m.column("discarded")?, view.is_discarded());
        record.insert(
            m.column(ATTR_TOTAL_WEIGHT_GRAMS)?,
            columns::counter(ATTR_TOTAL_WEIGHT_GRAMS, view.total_weight_grams())?,
        );
        record.insert(m.column(ATTR_TITLE_SLUG)?, view.title_slug());

        m.check_columns(&record, &[])?;
        Ok(record)
    }

    fn from_storage(&self, record: &StorageRecord) -> Result<CookbookView, ConversionError> {
        let m = &COOKBOOK_MAPPING;
        if self.storage.reject_unknown_columns {
            m.check_columns(record, &[])?;
        }

        let id = CookbookId(columns::uuid(record, m.column("id")?)?);
        let labels = self
            .registry
            .collection::<CookbookLabels>()?
            .decode(record.get(m.column("labels")?))?;
        let labels = from_ordered_sequence(labels, "cookbook.labels")?;

        let children = columns::records(record, m.column("recipes")?)?;
        self.registry
            .collection::<CookbookRecipes>()?
            .check_count(children.len())?;
        let recipes = children
            .iter()
            .enumerate()
            .map(|(i, child)| self.recipes.from_storage(child).map_err(|e| within_recipe(e, i)))
            .collect::<Result<Vec<_>, _>>()?;
        let recipes = from_ordered_sequence(recipes, "cookbook.recipes")?;

        let active = || recipes.iter().filter(|r| !r.is_discarded());
        let tag_index = derived::tag_index(&labels, active().flat_map(|r| r.tags()));
        let average_rating = derived::pooled_average(active().flat_map(|r| r.ratings()));

        let view = CookbookView::new(CookbookViewFields {
            id,
            title: columns::text(record, m.column("title")?)?.to_string(),
            tag_index: tag_index.into_iter().collect(),
            average_rating,
            labels,
            recipes,
            version: columns::int_as(record, m.column("version")?)?,
            discarded: columns::boolean(record, m.column("discarded")?)?,
            created_at: columns::timestamp(record, m.column("created_at")?)?,
            updated_at: columns::timestamp(record, m.column("updated_at")?)?,
            total_weight_grams: columns::int_as(record, m.column(ATTR_TOTAL_WEIGHT_GRAMS)?)?,
            title_slug: columns::text(record, m.column(ATTR_TITLE_SLUG)?)?.to_string(),
            catalog_code: derived::catalog_code(id),
        })?;
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::cookbook::{CookbookDraft, Recipe, RecipeDraft, RecipeId};
    use crate::domain::tag::Tag;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn tag(s: &str) -> Tag {
        Tag::parse(s).unwrap()
    }

    fn converter() -> CookbookConverter {
        let registry = AdapterRegistry::shared();
        let recipes = RecipeConverter::new(registry.clone(), StorageConfig::default()).unwrap();
        CookbookConverter::new(registry, recipes, StorageConfig::default()).unwrap()
    }

    fn recipe(name: &str, weight_grams: u32, tags: &[&str]) -> Recipe {
        Recipe::create(
            RecipeId(Uuid::new_v4()),
            RecipeDraft {
                name: name.to_string(),
                weight_grams,
                servings: 2,
                tags: tags.iter().map(|t| tag(t)).collect(),
                nutrition: None,
            },
        )
        .unwrap()
    }

    fn cookbook() -> Cookbook {
        Cookbook::create(
            CookbookId(Uuid::new_v4()),
            CookbookDraft {
                title: "Weeknight Dinners".to_string(),
                labels: HashSet::from([tag("quick")]),
                recipes: vec![recipe("Dal", 800, &["lentils"]), recipe("Fried Rice", 600, &["rice", "quick"])],
            },
        )
        .unwrap()
    }

    #[test]
    fn test_from_domain_materializes_aggregates() {
        let cookbook = cookbook();
        let view = converter().from_domain(&cookbook).unwrap();
        assert_eq!(view.total_weight_grams(), 1400);
        assert_eq!(view.title_slug(), "weeknight-dinners");
        let index: Vec<&str> = view.tag_index().iter().map(Tag::as_str).collect();
        assert_eq!(index, vec!["lentils", "quick", "rice"]);
        assert_eq!(view.recipes().len(), 2);
    }

    #[test]
    fn test_storage_round_trip_converges() {
        let converter = converter();
        let cookbook = cookbook();
        let view = converter.from_domain(&cookbook).unwrap();
        let record = converter.to_storage_fields(&view).unwrap();

        assert!(record.get("tag_index").is_none());
        assert!(record.get("catalog_code").is_none());
        assert_eq!(record.get("total_weight_grams"), Some(&StorageValue::Int(1400)));

        let loaded = converter.from_storage(&record).unwrap();
        assert_eq!(loaded, view);
        assert_eq!(converter.to_domain(&loaded).unwrap(), cookbook);
    }

    #[test]
    fn test_duplicate_child_key_is_rejected() {
        let converter = converter();
        let view = converter.from_domain(&cookbook()).unwrap();
        let mut record = converter.to_storage_fields(&view).unwrap();
        let mut children = columns::records(&record, "recipes").unwrap().to_vec();
        children.push(children[0].clone());
        let duplicated = columns::text(&children[0], "id").unwrap().to_string();
        record.insert("recipes", StorageValue::Records(children));

        match converter.from_storage(&record).unwrap_err() {
            ConversionError::Duplicate(err) => {
                assert_eq!(err.collection, "cookbook.recipes");
                assert_eq!(err.key, duplicated);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_child_failure_names_position() {
        let converter = converter();
        let view = converter.from_domain(&cookbook()).unwrap();
        let mut record = converter.to_storage_fields(&view).unwrap();
        let mut children = columns::records(&record, "recipes").unwrap().to_vec();
        children[1].insert("servings", 0u8);
        record.insert("recipes", StorageValue::Records(children));

        match converter.from_storage(&record).unwrap_err() {
            ConversionError::Validation(failure) => assert_eq!(failure.field, "recipes[1].servings"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_stale_persisted_total_is_rejected() {
        let converter = converter();
        let view = converter.from_domain(&cookbook()).unwrap();
        let mut record = converter.to_storage_fields(&view).unwrap();
        record.insert("total_weight_grams", 9i64);

        match converter.from_storage(&record).unwrap_err() {
            ConversionError::Validation(failure) => assert_eq!(failure.field, "total_weight_grams"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_domain_invariants_rechecked_on_restore() {
        let converter = converter();
        let view = converter.from_domain(&cookbook()).unwrap();
        let mut fields = view.into_fields();
        fields.version = 0;
        assert!(CookbookView::new(fields).is_err());
    }
}
