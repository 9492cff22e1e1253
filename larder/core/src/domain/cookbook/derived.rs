// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Pure derivations behind the computed attributes of `Recipe` and `Cookbook`.
//!
//! The entities memoize these through their cache ledgers; the conversion
//! layer calls them directly to check materialized values.

use std::collections::BTreeSet;

use crate::domain::cookbook::CookbookId;
use crate::domain::rating::{AverageRating, Rating};
use crate::domain::tag::Tag;

/// Tags sorted by text and joined with ", "
pub fn tag_line<'a>(tags: impl IntoIterator<Item = &'a Tag>) -> String {
    let sorted: BTreeSet<&Tag> = tags.into_iter().collect();
    sorted
        .into_iter()
        .map(Tag::as_str)
        .collect::<Vec<_>>()
        .join(", ")
}

pub fn total_weight_grams(weights: impl IntoIterator<Item = u32>) -> u64 {
    weights.into_iter().map(u64::from).sum()
}

/// Union of cookbook labels and recipe tags
pub fn tag_index<'a>(
    labels: impl IntoIterator<Item = &'a Tag>,
    recipe_tags: impl IntoIterator<Item = &'a Tag>,
) -> BTreeSet<Tag> {
    labels.into_iter().chain(recipe_tags).cloned().collect()
}

/// Mean over every individual rating, not a mean of per-recipe means
pub fn pooled_average<'a>(ratings: impl IntoIterator<Item = &'a Rating>) -> Option<AverageRating> {
    AverageRating::of(ratings)
}

/// URL-safe form of a title: lowercase alphanumerics separated by single dashes
pub fn title_slug(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    let mut pending_dash = false;
    for c in title.chars() {
        if c.is_alphanumeric() {
            if pending_dash && !slug.is_empty() {
                slug.push('-');
            }
            pending_dash = false;
            slug.extend(c.to_lowercase());
        } else {
            pending_dash = true;
        }
    }
    slug
}

/// Short catalogue reference, e.g. `CB-1A2B3C4D`
pub fn catalog_code(id: CookbookId) -> String {
    let simple = id.0.simple().to_string();
    format!("CB-{}", simple[..8].to_uppercase())
}
