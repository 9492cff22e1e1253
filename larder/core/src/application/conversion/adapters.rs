// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! ValueAdapter Registry
//!
//! One validator/codec per logical collection or composite shape, built once
//! from configuration and looked up by type. The registry is never mutated
//! after [`AdapterRegistryBuilder::build`], so one instance can be shared
//! through an `Arc` by any number of threads.
//!
//! - [`CollectionAdapter<S>`]: count limit plus element codec for the
//!   collection shape `S` (`RecipeTags`, `CookbookLabels`, ...)
//! - [`CompositeAdapter<T>`]: flattens a composite value object into
//!   prefixed columns and assembles it back

use once_cell::sync::Lazy;
use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;
use tracing::info;

use crate::application::conversion::{ConversionIncompleteError, ValidationFailure};
use crate::application::view::RecipeView;
use crate::domain::config::CollectionLimits;
use crate::domain::nutrition::Nutrition;
use crate::domain::rating::Rating;
use crate::domain::record::{StorageRecord, StorageValue};
use crate::domain::tag::Tag;

const REGISTRY_TARGET: &str = "the value adapter registry";

// ============================================================================
// Element codecs
// ============================================================================

/// Value stored as a single storage scalar
pub trait StorageScalar: Sized {
    const TYPE_NAME: &'static str;

    fn to_storage(&self) -> StorageValue;

    fn from_storage(value: &StorageValue) -> Result<Self, String>;
}

impl StorageScalar for Tag {
    const TYPE_NAME: &'static str = "tag";

    fn to_storage(&self) -> StorageValue {
        StorageValue::Text(self.as_str().to_string())
    }

    fn from_storage(value: &StorageValue) -> Result<Self, String> {
        let text = value
            .as_text()
            .ok_or_else(|| format!("expected text, found {}", value.kind()))?;
        Tag::parse(text).map_err(|e| e.to_string())
    }
}

impl StorageScalar for Rating {
    const TYPE_NAME: &'static str = "rating";

    fn to_storage(&self) -> StorageValue {
        StorageValue::Int(i64::from(self.stars()))
    }

    fn from_storage(value: &StorageValue) -> Result<Self, String> {
        let stars = value
            .as_int()
            .ok_or_else(|| format!("expected int, found {}", value.kind()))?;
        let stars = u8::try_from(stars).map_err(|_| format!("{stars} is not a star count"))?;
        Rating::new(stars).map_err(|e| e.to_string())
    }
}

// ============================================================================
// Collections
// ============================================================================

/// Marker for one logical collection field
pub trait CollectionShape: 'static {
    type Item;

    /// Dotted field path used in error messages
    const FIELD: &'static str;
}

pub struct RecipeTags;

impl CollectionShape for RecipeTags {
    type Item = Tag;
    const FIELD: &'static str = "recipe.tags";
}

pub struct RecipeRatings;

impl CollectionShape for RecipeRatings {
    type Item = Rating;
    const FIELD: &'static str = "recipe.ratings";
}

pub struct CookbookLabels;

impl CollectionShape for CookbookLabels {
    type Item = Tag;
    const FIELD: &'static str = "cookbook.labels";
}

pub struct CookbookRecipes;

impl CollectionShape for CookbookRecipes {
    type Item = RecipeView;
    const FIELD: &'static str = "cookbook.recipes";
}

pub struct CollectionAdapter<S> {
    max_items: usize,
    _shape: PhantomData<fn() -> S>,
}

impl<S: CollectionShape> CollectionAdapter<S> {
    pub fn new(max_items: usize) -> Self {
        Self {
            max_items,
            _shape: PhantomData,
        }
    }

    pub fn field(&self) -> &'static str {
        S::FIELD
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    pub fn check_count(&self, len: usize) -> Result<(), ValidationFailure> {
        if len > self.max_items {
            return Err(ValidationFailure::new(
                S::FIELD,
                format!("holds {len} items, limit is {}", self.max_items),
            ));
        }
        Ok(())
    }
}

impl<S> CollectionAdapter<S>
where
    S: CollectionShape,
    S::Item: StorageScalar,
{
    /// Encode an already-ordered sequence as a storage list
    pub fn encode<'a>(&self, items: impl IntoIterator<Item = &'a S::Item>) -> Result<StorageValue, ValidationFailure>
    where
        S::Item: 'a,
    {
        let encoded: Vec<StorageValue> = items.into_iter().map(StorageScalar::to_storage).collect();
        self.check_count(encoded.len())?;
        Ok(StorageValue::List(encoded))
    }

    /// Decode a storage list; a missing or null column is an empty collection
    pub fn decode(&self, value: Option<&StorageValue>) -> Result<Vec<S::Item>, ValidationFailure> {
        let items = match value {
            None | Some(StorageValue::Null) => return Ok(Vec::new()),
            Some(StorageValue::List(items)) => items,
            Some(other) => {
                return Err(ValidationFailure::new(
                    S::FIELD,
                    format!("expected list, found {}", other.kind()),
                ))
            }
        };
        self.check_count(items.len())?;
        items
            .iter()
            .enumerate()
            .map(|(i, item)| {
                <S::Item as StorageScalar>::from_storage(item).map_err(|message| {
                    ValidationFailure::new(
                        format!("{}[{i}]", S::FIELD),
                        format!("invalid {}: {message}", <S::Item as StorageScalar>::TYPE_NAME),
                    )
                })
            })
            .collect()
    }
}

impl<S: CollectionShape> fmt::Debug for CollectionAdapter<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CollectionAdapter")
            .field("field", &S::FIELD)
            .field("max_items", &self.max_items)
            .finish()
    }
}

// ============================================================================
// Composites
// ============================================================================

/// Composite value object stored as a group of integer columns
pub trait FlatComposite: Sized + 'static {
    /// Column suffixes, in the order `flatten` yields values
    const PARTS: &'static [&'static str];

    fn flatten(&self) -> Vec<i64>;

    fn assemble(parts: &[i64]) -> Result<Self, String>;
}

impl FlatComposite for Nutrition {
    const PARTS: &'static [&'static str] = &["calories", "protein_g", "fat_g", "carbohydrate_g"];

    fn flatten(&self) -> Vec<i64> {
        vec![
            i64::from(self.calories()),
            i64::from(self.protein_g()),
            i64::from(self.fat_g()),
            i64::from(self.carbohydrate_g()),
        ]
    }

    fn assemble(parts: &[i64]) -> Result<Self, String> {
        let mut values = [0u32; 4];
        for ((slot, raw), name) in values.iter_mut().zip(parts).zip(Self::PARTS) {
            *slot = u32::try_from(*raw).map_err(|_| format!("{name} must be a non-negative 32-bit value, got {raw}"))?;
        }
        let [calories, protein_g, fat_g, carbohydrate_g] = values;
        Nutrition::new(calories, protein_g, fat_g, carbohydrate_g).map_err(|v| v.to_string())
    }
}

pub struct CompositeAdapter<T> {
    prefix: &'static str,
    _composite: PhantomData<fn() -> T>,
}

impl<T: FlatComposite> CompositeAdapter<T> {
    pub fn new(prefix: &'static str) -> Self {
        Self {
            prefix,
            _composite: PhantomData,
        }
    }

    pub fn prefix(&self) -> &'static str {
        self.prefix
    }

    /// Prefixed column names, e.g. `nutrition_calories`
    pub fn columns(&self) -> Vec<String> {
        T::PARTS.iter().map(|part| format!("{}_{}", self.prefix, part)).collect()
    }

    /// Write every column of the group; an absent composite writes nulls
    pub fn flatten(&self, value: Option<&T>, record: &mut StorageRecord) {
        match value {
            Some(value) => {
                for (column, part) in self.columns().into_iter().zip(value.flatten()) {
                    record.insert(column, part);
                }
            }
            None => {
                for column in self.columns() {
                    record.insert(column, StorageValue::Null);
                }
            }
        }
    }

    /// Read the group back: all absent is `None`, partially present is a failure
    pub fn assemble(&self, record: &StorageRecord) -> Result<Option<T>, ValidationFailure> {
        let columns = self.columns();
        let missing: Vec<&str> = columns
            .iter()
            .filter(|c| !record.is_present(c))
            .map(String::as_str)
            .collect();

        if missing.len() == columns.len() {
            return Ok(None);
        }
        if !missing.is_empty() {
            return Err(ValidationFailure::new(
                self.prefix,
                format!("partially stored; missing {}", missing.join(", ")),
            ));
        }

        let mut parts = Vec::with_capacity(columns.len());
        for column in &columns {
            let value = record.get(column).and_then(StorageValue::as_int).ok_or_else(|| {
                ValidationFailure::new(column.clone(), "expected int")
            })?;
            parts.push(value);
        }
        T::assemble(&parts)
            .map(Some)
            .map_err(|message| ValidationFailure::new(self.prefix, message))
    }
}

impl<T> fmt::Debug for CompositeAdapter<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CompositeAdapter").field("prefix", &self.prefix).finish()
    }
}

// ============================================================================
// Registry
// ============================================================================

static SHARED_REGISTRY: Lazy<Arc<AdapterRegistry>> =
    Lazy::new(|| Arc::new(AdapterRegistry::from_config(&CollectionLimits::default())));

/// Immutable, type-indexed set of value adapters
pub struct AdapterRegistry {
    adapters: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: Vec<&'static str>,
}

impl AdapterRegistry {
    pub fn builder() -> AdapterRegistryBuilder {
        AdapterRegistryBuilder::default()
    }

    /// Registry with an adapter for every collection and composite the larder model uses
    pub fn from_config(limits: &CollectionLimits) -> Self {
        info!("Initializing value adapter registry");
        let registry = Self::builder()
            .collection::<RecipeTags>(limits.max_tags)
            .collection::<RecipeRatings>(limits.max_ratings)
            .collection::<CookbookLabels>(limits.max_labels)
            .collection::<CookbookRecipes>(limits.max_recipes)
            .composite::<Nutrition>("nutrition")
            .build();
        info!("Value adapter registry ready with {} adapters", registry.len());
        registry
    }

    /// Process-wide registry built from default limits on first use
    pub fn shared() -> Arc<Self> {
        SHARED_REGISTRY.clone()
    }

    pub fn collection<S: CollectionShape>(&self) -> Result<&CollectionAdapter<S>, ConversionIncompleteError> {
        self.lookup::<CollectionAdapter<S>>()
            .ok_or_else(|| ConversionIncompleteError::new(S::FIELD, REGISTRY_TARGET))
    }

    pub fn composite<T: FlatComposite>(&self) -> Result<&CompositeAdapter<T>, ConversionIncompleteError> {
        self.lookup::<CompositeAdapter<T>>()
            .ok_or_else(|| ConversionIncompleteError::new(std::any::type_name::<T>(), REGISTRY_TARGET))
    }

    fn lookup<A: Any>(&self) -> Option<&A> {
        self.adapters.get(&TypeId::of::<A>())?.downcast_ref::<A>()
    }

    pub fn len(&self) -> usize {
        self.adapters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adapters.is_empty()
    }
}

impl fmt::Debug for AdapterRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AdapterRegistry").field("adapters", &self.names).finish()
    }
}

#[derive(Default)]
pub struct AdapterRegistryBuilder {
    adapters: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
    names: Vec<&'static str>,
}

impl AdapterRegistryBuilder {
    /// Register the adapter for collection shape `S`, replacing any earlier one
    pub fn collection<S: CollectionShape>(mut self, max_items: usize) -> Self {
        self.adapters
            .insert(TypeId::of::<CollectionAdapter<S>>(), Box::new(CollectionAdapter::<S>::new(max_items)));
        self.names.push(S::FIELD);
        self
    }

    /// Register the adapter for composite `T`, replacing any earlier one
    pub fn composite<T: FlatComposite>(mut self, prefix: &'static str) -> Self {
        self.adapters
            .insert(TypeId::of::<CompositeAdapter<T>>(), Box::new(CompositeAdapter::<T>::new(prefix)));
        self.names.push(prefix);
        self
    }

    pub fn build(self) -> AdapterRegistry {
        AdapterRegistry {
            adapters: self.adapters,
            names: self.names,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_by_shape() {
        let limits = CollectionLimits {
            max_tags: 2,
            ..CollectionLimits::default()
        };
        let registry = AdapterRegistry::from_config(&limits);
        assert_eq!(registry.len(), 5);
        assert_eq!(registry.collection::<RecipeTags>().unwrap().max_items(), 2);
        assert_eq!(registry.collection::<CookbookLabels>().unwrap().max_items(), 16);
        assert_eq!(registry.composite::<Nutrition>().unwrap().prefix(), "nutrition");
    }

    #[test]
    fn test_missing_adapter_is_incomplete() {
        let registry = AdapterRegistry::builder().collection::<RecipeTags>(4).build();
        let err = registry.collection::<CookbookLabels>().unwrap_err();
        assert_eq!(err.field, "cookbook.labels");
        assert!(registry.composite::<Nutrition>().is_err());
    }

    #[test]
    fn test_collection_decode() {
        let adapter = CollectionAdapter::<RecipeTags>::new(3);
        assert!(adapter.decode(None).unwrap().is_empty());
        assert!(adapter.decode(Some(&StorageValue::Null)).unwrap().is_empty());

        let list = StorageValue::List(vec!["soup".into(), "Quick Dinner".into()]);
        let tags = adapter.decode(Some(&list)).unwrap();
        assert_eq!(tags[1].as_str(), "quick-dinner");

        let bad = StorageValue::List(vec!["soup".into(), StorageValue::Int(3)]);
        assert_eq!(adapter.decode(Some(&bad)).unwrap_err().field, "recipe.tags[1]");

        let too_many = StorageValue::List(vec!["a".into(), "b".into(), "c".into(), "d".into()]);
        assert!(adapter.decode(Some(&too_many)).is_err());
    }

    #[test]
    fn test_rating_decode_rejects_out_of_range() {
        let adapter = CollectionAdapter::<RecipeRatings>::new(10);
        let list = StorageValue::List(vec![StorageValue::Int(4), StorageValue::Int(300)]);
        let err = adapter.decode(Some(&list)).unwrap_err();
        assert_eq!(err.field, "recipe.ratings[1]");
    }

    #[test]
    fn test_composite_groups() {
        let adapter = CompositeAdapter::<Nutrition>::new("nutrition");
        let nutrition = Nutrition::new(500, 20, 10, 60).unwrap();

        let mut record = StorageRecord::new();
        adapter.flatten(Some(&nutrition), &mut record);
        assert_eq!(record.get("nutrition_fat_g"), Some(&StorageValue::Int(10)));
        assert_eq!(adapter.assemble(&record).unwrap(), Some(nutrition));

        let mut empty = StorageRecord::new();
        adapter.flatten(None, &mut empty);
        assert_eq!(empty.len(), 4);
        assert_eq!(adapter.assemble(&empty).unwrap(), None);
        assert_eq!(adapter.assemble(&StorageRecord::new()).unwrap(), None);

        record.insert("nutrition_protein_g", StorageValue::Null);
        let err = adapter.assemble(&record).unwrap_err();
        assert!(err.message.contains("nutrition_protein_g"));
    }

    #[test]
    fn test_registry_is_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<AdapterRegistry>();
        assert!(Arc::ptr_eq(&AdapterRegistry::shared(), &AdapterRegistry::shared()));
    }
}
