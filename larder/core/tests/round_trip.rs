// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Domain → API → storage → API → domain must converge.

use std::collections::HashSet;

use chrono::{Duration, Utc};

use larder_core::application::conversion::Conversion;
use larder_core::application::{ConversionPipeline, CookbookView};
use larder_core::domain::cookbook::{Cookbook, CookbookDraft, CookbookId, Recipe, RecipeDraft, RecipeId};
use larder_core::domain::entity::Entity;
use larder_core::domain::nutrition::Nutrition;
use larder_core::domain::rating::Rating;
use larder_core::domain::record::StorageRecord;
use larder_core::domain::tag::Tag;
use uuid::Uuid;

fn tag(s: &str) -> Tag {
    Tag::parse(s).unwrap()
}

fn busy_cookbook() -> (Cookbook, RecipeId) {
    let curry = Recipe::create(
        RecipeId(Uuid::new_v4()),
        RecipeDraft {
            name: "Chickpea Curry".to_string(),
            weight_grams: 1600,
            servings: 4,
            tags: HashSet::from([tag("vegan"), tag("spicy")]),
            nutrition: Some(Nutrition::new(1800, 60, 50, 240).unwrap()),
        },
    )
    .unwrap();
    let naan = Recipe::create(
        RecipeId(Uuid::new_v4()),
        RecipeDraft {
            name: "Naan".to_string(),
            weight_grams: 500,
            servings: 6,
            ..Default::default()
        },
    )
    .unwrap();
    let curry_id = curry.id();
    let naan_id = naan.id();

    let mut cookbook = Cookbook::create(
        CookbookId(Uuid::new_v4()),
        CookbookDraft {
            title: "Curry Night!".to_string(),
            labels: HashSet::from([tag("dinner")]),
            recipes: vec![curry, naan],
        },
    )
    .unwrap();
    cookbook.rate_recipe(curry_id, Rating::new(4).unwrap()).unwrap();
    cookbook.rate_recipe(curry_id, Rating::new(5).unwrap()).unwrap();
    cookbook.rate_recipe(naan_id, Rating::new(3).unwrap()).unwrap();
    cookbook.discard_recipe(naan_id).unwrap();
    (cookbook, curry_id)
}

#[test]
fn test_cookbook_round_trip_through_storage() {
    let pipeline = ConversionPipeline::with_defaults().unwrap();
    let (cookbook, curry_id) = busy_cookbook();

    let (view, record) = pipeline.cookbook_to_storage(&cookbook).unwrap();
    assert_eq!(view.title_slug(), "curry-night");
    assert_eq!(view.total_weight_grams(), 1600);
    assert_eq!(view.average_rating().unwrap().centi_stars(), 450);
    assert_eq!(view.recipe(curry_id).unwrap().nutrition_per_serving().unwrap().calories(), 450);

    let restored = pipeline.cookbook_from_storage(&record).unwrap();
    assert_eq!(restored, cookbook);
    assert!(restored.cache_state().is_empty());
    assert!(restored.pending_events().is_empty());

    let (again, _) = pipeline.cookbook_to_storage(&restored).unwrap();
    assert_eq!(again, view);
}

#[test]
fn test_storage_record_survives_json() {
    let pipeline = ConversionPipeline::with_defaults().unwrap();
    let (cookbook, _) = busy_cookbook();
    let (view, record) = pipeline.cookbook_to_storage(&cookbook).unwrap();

    let json = serde_json::to_string(&record).unwrap();
    let decoded: StorageRecord = serde_json::from_str(&json).unwrap();
    assert_eq!(decoded, record);
    assert_eq!(pipeline.cookbooks().from_storage(&decoded).unwrap(), view);
}

#[test]
fn test_view_json_is_validated_on_the_way_in() {
    let pipeline = ConversionPipeline::with_defaults().unwrap();
    let (cookbook, _) = busy_cookbook();
    let view = pipeline.cookbooks().from_domain(&cookbook).unwrap();

    let mut json = serde_json::to_value(&view).unwrap();
    let decoded: CookbookView = serde_json::from_value(json.clone()).unwrap();
    assert_eq!(decoded, view);

    json["title_slug"] = serde_json::json!("something-else");
    assert!(serde_json::from_value::<CookbookView>(json).is_err());
}

#[test]
fn test_recipe_view_to_domain_rechecks_invariants() {
    let pipeline = ConversionPipeline::with_defaults().unwrap();
    let (cookbook, curry_id) = busy_cookbook();
    let curry = cookbook.recipe(curry_id).unwrap();

    let view = pipeline.recipes().from_domain(curry).unwrap();
    let rebuilt = pipeline.recipes().to_domain(&view).unwrap();
    assert_eq!(&rebuilt, curry);
    assert_eq!(rebuilt.version(), 3);
}

#[test]
fn test_cookbook_stamped_ahead_of_this_clock_still_converts() {
    let pipeline = ConversionPipeline::with_defaults().unwrap();
    let ahead = Utc::now() + Duration::hours(1);
    let mut state = busy_cookbook().0.to_state();
    state.created_at = ahead;
    state.updated_at = ahead;
    let mut cookbook = Cookbook::restore(state).unwrap();

    cookbook.rename("Summer").unwrap();

    assert!(cookbook.updated_at() >= cookbook.created_at());
    let view = pipeline.cookbooks().from_domain(&cookbook).unwrap();
    assert_eq!(view.title_slug(), "summer");
    assert_eq!(view.updated_at(), ahead);
}
