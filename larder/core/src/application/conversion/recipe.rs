// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Recipe conversions: `Recipe` ↔ [`RecipeView`] ↔ [`StorageRecord`]

use std::sync::Arc;

use crate::application::conversion::adapters::{AdapterRegistry, CompositeAdapter, RecipeRatings, RecipeTags};
use crate::application::conversion::collections::{
    from_ordered_sequence, to_immutable_unique, to_mutable_unique, to_ordered_sequence,
};
use crate::application::conversion::mapping::{FieldMapping, MappingTable, Persistence};
use crate::application::conversion::{columns, Conversion, ConversionError, ConversionIncompleteError, ValidationFailure};
use crate::application::view::{RecipeView, RecipeViewFields};
use crate::domain::config::StorageConfig;
use crate::domain::cookbook::derived;
use crate::domain::cookbook::recipe::{
    recipe_attributes, Recipe, RecipeId, RecipeState, ATTR_AVERAGE_RATING, ATTR_NUTRITION_PER_SERVING, ATTR_TAG_LINE,
};
use crate::domain::entity::Entity;
use crate::domain::nutrition::Nutrition;
use crate::domain::rating::AverageRating;
use crate::domain::record::StorageRecord;

static RECIPE_MAPPING: MappingTable = MappingTable::new(
    "recipe",
    &[
        FieldMapping::new("id", Persistence::Column("id")),
        FieldMapping::new("version", Persistence::Column("version")),
        FieldMapping::new("created_at", Persistence::Column("created_at")),
        FieldMapping::new("updated_at", Persistence::Column("updated_at")),
        FieldMapping::new("name", Persistence::Column("name")),
        FieldMapping::new("weight_grams", Persistence::Column("weight_grams")),
        FieldMapping::new("servings", Persistence::Column("servings")),
        FieldMapping::new("tags", Persistence::Sequence("tags")),
        FieldMapping::new("nutrition", Persistence::Flattened("nutrition")),
        FieldMapping::new("ratings", Persistence::Sequence("ratings")),
        FieldMapping::new("discarded", Persistence::Column("discarded")),
        FieldMapping::new(ATTR_AVERAGE_RATING, Persistence::PersistedNotRecomputed("average_rating_centi")),
        FieldMapping::new(ATTR_NUTRITION_PER_SERVING, Persistence::RecomputedOnLoad),
        FieldMapping::new(ATTR_TAG_LINE, Persistence::RecomputedOnLoad),
    ],
);

/// How each recipe field is persisted
pub fn recipe_mapping() -> &'static MappingTable {
    &RECIPE_MAPPING
}

#[derive(Debug, Clone)]
pub struct RecipeConverter {
    registry: Arc<AdapterRegistry>,
    storage: StorageConfig,
}

impl RecipeConverter {
    /// Check mapping coverage and adapter availability up front
    pub fn new(registry: Arc<AdapterRegistry>, storage: StorageConfig) -> Result<Self, ConversionIncompleteError> {
        RECIPE_MAPPING.check_covers(recipe_attributes())?;
        registry.collection::<RecipeTags>()?;
        registry.collection::<RecipeRatings>()?;

        let prefix = RECIPE_MAPPING.prefix("nutrition")?;
        let composite = registry.composite::<Nutrition>()?;
        if composite.prefix() != prefix {
            return Err(ConversionIncompleteError::new(
                format!("recipe.nutrition ({prefix}_*)"),
                "the value adapter registry",
            ));
        }
        Ok(Self { registry, storage })
    }

    fn nutrition(&self) -> Result<&CompositeAdapter<Nutrition>, ConversionIncompleteError> {
        self.registry.composite::<Nutrition>()
    }
}

impl Conversion for RecipeConverter {
    type Domain = Recipe;
    type Api = RecipeView;

    fn from_domain(&self, recipe: &Recipe) -> Result<RecipeView, ConversionError> {
        let tags = to_immutable_unique(recipe.tags().iter().cloned());
        self.registry.collection::<RecipeTags>()?.check_count(tags.len())?;
        self.registry
            .collection::<RecipeRatings>()?
            .check_count(recipe.ratings().len())?;

        let view = RecipeView::new(RecipeViewFields {
            id: recipe.id(),
            name: recipe.name().to_string(),
            weight_grams: recipe.weight_grams(),
            servings: recipe.servings(),
            tags,
            nutrition: recipe.nutrition().copied(),
            ratings: recipe.ratings().to_vec(),
            version: recipe.version(),
            discarded: recipe.is_discarded(),
            created_at: recipe.created_at(),
            updated_at: recipe.updated_at(),
            average_rating: *recipe.average_rating(),
            nutrition_per_serving: *recipe.nutrition_per_serving(),
            tag_line: recipe.tag_line().to_string(),
        })?;
        Ok(view)
    }

    fn to_domain(&self, view: &RecipeView) -> Result<Recipe, ConversionError> {
        let recipe = Recipe::restore(RecipeState {
            id: view.id(),
            name: view.name().to_string(),
            weight_grams: view.weight_grams(),
            servings: view.servings(),
            tags: to_mutable_unique(view.tags()),
            nutrition: view.nutrition().copied(),
            ratings: view.ratings().to_vec(),
            version: view.version(),
            discarded: view.is_discarded(),
            created_at: view.created_at(),
            updated_at: view.updated_at(),
        })?;
        Ok(recipe)
    }

    fn to_storage_fields(&self, view: &RecipeView) -> Result<StorageRecord, ConversionError> {
        let m = &RECIPE_MAPPING;
        let nutrition = self.nutrition()?;
        let tags = to_ordered_sequence(view.tags(), |tag| tag.as_str().to_string());

        let mut record = StorageRecord::new();
        record.insert(m.column("id")?, view.id().to_string());
        record.insert(m.column("version")?, columns::counter("version", view.version())?);
        record.insert(m.column("created_at")?, view.created_at());
        record.insert(m.column("updated_at")?, view.updated_at());
        record.insert(m.column("name")?, view.name());
        record.insert(m.column("weight_grams")?, view.weight_grams());
        record.insert(m.column("servings")?, view.servings());
        record.insert(m.column("tags")?, self.registry.collection::<RecipeTags>()?.encode(&tags)?);
        record.insert(
            m.column("ratings")?,
            self.registry.collection::<RecipeRatings>()?.encode(view.ratings())?,
        );
        nutrition.flatten(view.nutrition(), &mut record);
        record.insert(m.column("discarded")?, view.is_discarded());
        record.insert(
            m.column(ATTR_AVERAGE_RATING)?,
            view.average_rating().map(|a| i64::from(a.centi_stars())),
        );

        m.check_columns(&record, &nutrition.columns())?;
        Ok(record)
    }

    fn from_storage(&self, record: &StorageRecord) -> Result<RecipeView, ConversionError> {
        let m = &RECIPE_MAPPING;
        let nutrition_adapter = self.nutrition()?;
        if self.storage.reject_unknown_columns {
            m.check_columns(record, &nutrition_adapter.columns())?;
        }

        let tags = self
            .registry
            .collection::<RecipeTags>()?
            .decode(record.get(m.column("tags")?))?;
        let tags = from_ordered_sequence(tags, "recipe.tags")?;
        let ratings = self
            .registry
            .collection::<RecipeRatings>()?
            .decode(record.get(m.column("ratings")?))?;
        let nutrition = nutrition_adapter.assemble(record)?;
        let servings: u8 = columns::int_as(record, m.column("servings")?)?;

        let average_column = m.column(ATTR_AVERAGE_RATING)?;
        let average_rating = columns::optional_int_as::<u16>(record, average_column)?
            .map(AverageRating::from_centi_stars)
            .transpose()
            .map_err(|e| ValidationFailure::new(average_column, e.to_string()))?;

        let view = RecipeView::new(RecipeViewFields {
            id: RecipeId(columns::uuid(record, m.column("id")?)?),
            name: columns::text(record, m.column("name")?)?.to_string(),
            weight_grams: columns::int_as(record, m.column("weight_grams")?)?,
            servings,
            tag_line: derived::tag_line(&tags),
            tags,
            nutrition_per_serving: nutrition.map(|n| n.per_serving(servings)),
            nutrition,
            ratings,
            version: columns::int_as(record, m.column("version")?)?,
            discarded: columns::boolean(record, m.column("discarded")?)?,
            created_at: columns::timestamp(record, m.column("created_at")?)?,
            updated_at: columns::timestamp(record, m.column("updated_at")?)?,
            average_rating,
        })?;
        Ok(view)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::rating::Rating;
    use crate::domain::record::StorageValue;
    use crate::domain::tag::Tag;
    use chrono::Utc;
    use std::collections::HashSet;
    use uuid::Uuid;

    fn tag(s: &str) -> Tag {
        Tag::parse(s).unwrap()
    }

    fn converter() -> RecipeConverter {
        RecipeConverter::new(AdapterRegistry::shared(), StorageConfig::default()).unwrap()
    }

    fn rated_recipe() -> Recipe {
        let now = Utc::now();
        Recipe::restore(RecipeState {
            id: RecipeId(Uuid::new_v4()),
            name: "Ribollita".to_string(),
            weight_grams: 1500,
            servings: 5,
            tags: HashSet::from([tag("tuscan"), tag("bread"), tag("soup")]),
            nutrition: Some(Nutrition::new(1000, 40, 25, 150).unwrap()),
            ratings: vec![Rating::new(5).unwrap(), Rating::new(3).unwrap(), Rating::new(5).unwrap()],
            version: 4,
            discarded: false,
            created_at: now,
            updated_at: now,
        })
        .unwrap()
    }

    #[test]
    fn test_from_domain_materializes_computed_attributes() {
        let recipe = rated_recipe();
        let view = converter().from_domain(&recipe).unwrap();
        assert_eq!(view.tag_line(), "bread, soup, tuscan");
        assert_eq!(view.average_rating().unwrap().centi_stars(), 433);
        assert_eq!(view.nutrition_per_serving().unwrap().calories(), 200);
        assert_eq!(recipe.cache_state().len(), 3);
    }

    #[test]
    fn test_storage_layout() {
        let converter = converter();
        let view = converter.from_domain(&rated_recipe()).unwrap();
        let record = converter.to_storage_fields(&view).unwrap();

        assert_eq!(
            record.get("tags"),
            Some(&StorageValue::List(vec!["bread".into(), "soup".into(), "tuscan".into()]))
        );
        assert_eq!(record.get("average_rating_centi"), Some(&StorageValue::Int(433)));
        assert_eq!(record.get("nutrition_calories"), Some(&StorageValue::Int(1000)));
        assert!(record.get("tag_line").is_none());
        assert!(record.get("nutrition_per_serving").is_none());
    }

    #[test]
    fn test_storage_round_trip_converges() {
        let converter = converter();
        let recipe = rated_recipe();
        let view = converter.from_domain(&recipe).unwrap();
        let record = converter.to_storage_fields(&view).unwrap();
        let loaded = converter.from_storage(&record).unwrap();
        assert_eq!(loaded, view);
        assert_eq!(converter.to_domain(&loaded).unwrap(), recipe);
    }

    #[test]
    fn test_empty_collections_are_stored_as_empty_lists() {
        let converter = converter();
        let recipe = Recipe::create(
            RecipeId(Uuid::new_v4()),
            crate::domain::cookbook::RecipeDraft {
                name: "Toast".to_string(),
                weight_grams: 80,
                servings: 1,
                ..Default::default()
            },
        )
        .unwrap();
        let record = converter
            .to_storage_fields(&converter.from_domain(&recipe).unwrap())
            .unwrap();
        assert_eq!(record.get("tags"), Some(&StorageValue::List(vec![])));
        assert_eq!(record.get("ratings"), Some(&StorageValue::List(vec![])));
        assert_eq!(record.get("nutrition_fat_g"), Some(&StorageValue::Null));
        assert_eq!(record.get("average_rating_centi"), Some(&StorageValue::Null));
    }

    #[test]
    fn test_duplicate_stored_tag_is_rejected() {
        let converter = converter();
        let view = converter.from_domain(&rated_recipe()).unwrap();
        let mut record = converter.to_storage_fields(&view).unwrap();
        record.insert("tags", StorageValue::List(vec!["soup".into(), "Soup".into()]));
        let err = converter.from_storage(&record).unwrap_err();
        assert!(matches!(err, ConversionError::Duplicate(ref d) if d.key == "soup"));
    }

    #[test]
    fn test_stale_persisted_average_is_rejected() {
        let converter = converter();
        let view = converter.from_domain(&rated_recipe()).unwrap();
        let mut record = converter.to_storage_fields(&view).unwrap();
        record.insert("average_rating_centi", 100i64);
        match converter.from_storage(&record).unwrap_err() {
            ConversionError::Validation(failure) => assert_eq!(failure.field, "average_rating"),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_unknown_column_policy() {
        let view = converter().from_domain(&rated_recipe()).unwrap();
        let record = converter().to_storage_fields(&view).unwrap().with("colour", "red");

        let strict = converter().from_storage(&record).unwrap_err();
        assert!(strict.is_fatal());

        let lenient = RecipeConverter::new(
            AdapterRegistry::shared(),
            StorageConfig {
                reject_unknown_columns: false,
            },
        )
        .unwrap();
        assert_eq!(lenient.from_storage(&record).unwrap(), view);
    }

    #[test]
    fn test_missing_adapter_fails_at_construction() {
        let registry = Arc::new(AdapterRegistry::builder().collection::<RecipeTags>(8).build());
        let err = RecipeConverter::new(registry, StorageConfig::default()).unwrap_err();
        assert_eq!(err.field, "recipe.ratings");
    }

    #[test]
    fn test_configured_limit_applies_on_load() {
        let view = converter().from_domain(&rated_recipe()).unwrap();
        let record = converter().to_storage_fields(&view).unwrap();

        let registry = AdapterRegistry::builder()
            .collection::<RecipeTags>(2)
            .collection::<RecipeRatings>(100)
            .composite::<Nutrition>("nutrition")
            .build();
        let tight = RecipeConverter::new(Arc::new(registry), StorageConfig::default()).unwrap();
        match tight.from_storage(&record).unwrap_err() {
            ConversionError::Validation(failure) => assert_eq!(failure.field, "recipe.tags"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
