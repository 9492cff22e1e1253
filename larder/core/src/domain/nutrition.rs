// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use crate::domain::error::Violations;

pub const MAX_CALORIES: u32 = 100_000;
pub const MAX_MACRO_GRAMS: u32 = 10_000;

/// Nutrition facts for a whole recipe
///
/// Flattened into `nutrition_*` columns in storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Nutrition {
    calories: u32,
    protein_g: u32,
    fat_g: u32,
    carbohydrate_g: u32,
}

impl Nutrition {
    pub fn new(calories: u32, protein_g: u32, fat_g: u32, carbohydrate_g: u32) -> Result<Self, Violations> {
        let mut violations = Violations::new();
        violations.check(
            calories <= MAX_CALORIES,
            "nutrition.calories",
            format!("must not exceed {MAX_CALORIES}, got {calories}"),
        );
        for (field, grams) in [
            ("nutrition.protein_g", protein_g),
            ("nutrition.fat_g", fat_g),
            ("nutrition.carbohydrate_g", carbohydrate_g),
        ] {
            violations.check(
                grams <= MAX_MACRO_GRAMS,
                field,
                format!("must not exceed {MAX_MACRO_GRAMS} g, got {grams}"),
            );
        }
        if !violations.is_empty() {
            return Err(violations);
        }
        Ok(Self {
            calories,
            protein_g,
            fat_g,
            carbohydrate_g,
        })
    }

    pub fn calories(&self) -> u32 {
        self.calories
    }

    pub fn protein_g(&self) -> u32 {
        self.protein_g
    }

    pub fn fat_g(&self) -> u32 {
        self.fat_g
    }

    pub fn carbohydrate_g(&self) -> u32 {
        self.carbohydrate_g
    }

    /// Share of one serving, each value rounded to the nearest unit
    pub fn per_serving(&self, servings: u8) -> Self {
        let n = u32::from(servings.max(1));
        let share = |v: u32| (v + n / 2) / n;
        Self {
            calories: share(self.calories),
            protein_g: share(self.protein_g),
            fat_g: share(self.fat_g),
            carbohydrate_g: share(self.carbohydrate_g),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nutrition_bounds_collect_all_violations() {
        let err = Nutrition::new(MAX_CALORIES + 1, 0, MAX_MACRO_GRAMS + 1, 0).unwrap_err();
        assert_eq!(err.len(), 2);
        assert!(err.mentions("nutrition.calories"));
        assert!(err.mentions("nutrition.fat_g"));
    }

    #[test]
    fn test_per_serving_rounds() {
        let n = Nutrition::new(1000, 45, 31, 120).unwrap();
        let share = n.per_serving(4);
        assert_eq!(share.calories(), 250);
        assert_eq!(share.protein_g(), 11);
        assert_eq!(share.fat_g(), 8);
        assert_eq!(share.carbohydrate_g(), 30);
    }
}
