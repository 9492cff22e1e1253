// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::cookbook::{CookbookId, RecipeId};
use crate::domain::rating::Rating;
use crate::domain::tag::Tag;

/// Domain events recorded by the `Cookbook` aggregate root
///
/// Events accumulate on the root and are drained with `Cookbook::take_events`
/// once the new state has been persisted. `version` is always the root
/// version after the mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CookbookEvent {
    Created {
        cookbook_id: CookbookId,
        title: String,
        recipe_count: usize,
        occurred_at: DateTime<Utc>,
    },
    Renamed {
        cookbook_id: CookbookId,
        title: String,
        version: u64,
        occurred_at: DateTime<Utc>,
    },
    Relabelled {
        cookbook_id: CookbookId,
        labels: Vec<Tag>,
        version: u64,
        occurred_at: DateTime<Utc>,
    },
    RecipeAdded {
        cookbook_id: CookbookId,
        recipe_id: RecipeId,
        version: u64,
        occurred_at: DateTime<Utc>,
    },
    RecipeRemoved {
        cookbook_id: CookbookId,
        recipe_id: RecipeId,
        version: u64,
        occurred_at: DateTime<Utc>,
    },
    RecipeUpdated {
        cookbook_id: CookbookId,
        recipe_id: RecipeId,
        fields: Vec<String>,
        version: u64,
        occurred_at: DateTime<Utc>,
    },
    RecipeRated {
        cookbook_id: CookbookId,
        recipe_id: RecipeId,
        rating: Rating,
        version: u64,
        occurred_at: DateTime<Utc>,
    },
    RecipeDiscarded {
        cookbook_id: CookbookId,
        recipe_id: RecipeId,
        version: u64,
        occurred_at: DateTime<Utc>,
    },
    Discarded {
        cookbook_id: CookbookId,
        version: u64,
        occurred_at: DateTime<Utc>,
    },
}

impl CookbookEvent {
    pub fn cookbook_id(&self) -> CookbookId {
        match self {
            Self::Created { cookbook_id, .. }
            | Self::Renamed { cookbook_id, .. }
            | Self::Relabelled { cookbook_id, .. }
            | Self::RecipeAdded { cookbook_id, .. }
            | Self::RecipeRemoved { cookbook_id, .. }
            | Self::RecipeUpdated { cookbook_id, .. }
            | Self::RecipeRated { cookbook_id, .. }
            | Self::RecipeDiscarded { cookbook_id, .. }
            | Self::Discarded { cookbook_id, .. } => *cookbook_id,
        }
    }

    /// Root version after the mutation; a new cookbook starts at 1
    pub fn version(&self) -> u64 {
        match self {
            Self::Created { .. } => 1,
            Self::Renamed { version, .. }
            | Self::Relabelled { version, .. }
            | Self::RecipeAdded { version, .. }
            | Self::RecipeRemoved { version, .. }
            | Self::RecipeUpdated { version, .. }
            | Self::RecipeRated { version, .. }
            | Self::RecipeDiscarded { version, .. }
            | Self::Discarded { version, .. } => *version,
        }
    }

    pub fn event_type(&self) -> &'static str {
        match self {
            Self::Created { .. } => "cookbook_created",
            Self::Renamed { .. } => "cookbook_renamed",
            Self::Relabelled { .. } => "cookbook_relabelled",
            Self::RecipeAdded { .. } => "recipe_added",
            Self::RecipeRemoved { .. } => "recipe_removed",
            Self::RecipeUpdated { .. } => "recipe_updated",
            Self::RecipeRated { .. } => "recipe_rated",
            Self::RecipeDiscarded { .. } => "recipe_discarded",
            Self::Discarded { .. } => "cookbook_discarded",
        }
    }

    pub fn occurred_at(&self) -> DateTime<Utc> {
        match self {
            Self::Created { occurred_at, .. }
            | Self::Renamed { occurred_at, .. }
            | Self::Relabelled { occurred_at, .. }
            | Self::RecipeAdded { occurred_at, .. }
            | Self::RecipeRemoved { occurred_at, .. }
            | Self::RecipeUpdated { occurred_at, .. }
            | Self::RecipeRated { occurred_at, .. }
            | Self::RecipeDiscarded { occurred_at, .. }
            | Self::Discarded { occurred_at, .. } => *occurred_at,
        }
    }
}
