// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// A single review, in whole stars (1-5)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub fn new(stars: u8) -> Result<Self, RatingError> {
        if !(Self::MIN..=Self::MAX).contains(&stars) {
            return Err(RatingError::OutOfRange(stars));
        }
        Ok(Self(stars))
    }

    pub fn stars(&self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = RatingError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> Self {
        rating.0
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RatingError {
    #[error("Rating must be between 1 and 5 stars, got {0}")]
    OutOfRange(u8),
}

/// Mean rating in hundredths of a star (433 = 4.33 stars)
///
/// Fixed-point keeps recomputed averages exactly equal to stored ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct AverageRating {
    centi_stars: u16,
}

impl AverageRating {
    /// Mean of `ratings`, rounded half-up; `None` when there are no ratings
    pub fn of<'a>(ratings: impl IntoIterator<Item = &'a Rating>) -> Option<Self> {
        let (sum, count) = ratings
            .into_iter()
            .fold((0u64, 0u64), |(sum, count), r| (sum + u64::from(r.0), count + 1));
        if count == 0 {
            return None;
        }
        let centi = (sum * 100 + count / 2) / count;
        Some(Self {
            centi_stars: centi as u16,
        })
    }

    /// Rebuild from a stored hundredths value
    pub fn from_centi_stars(centi_stars: u16) -> Result<Self, RatingError> {
        let max = u16::from(Rating::MAX) * 100;
        let min = u16::from(Rating::MIN) * 100;
        if !(min..=max).contains(&centi_stars) {
            return Err(RatingError::OutOfRange((centi_stars / 100) as u8));
        }
        Ok(Self { centi_stars })
    }

    pub fn centi_stars(&self) -> u16 {
        self.centi_stars
    }

    pub fn as_f64(&self) -> f64 {
        f64::from(self.centi_stars) / 100.0
    }
}

impl fmt::Display for AverageRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{:02}", self.centi_stars / 100, self.centi_stars % 100)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ratings(stars: &[u8]) -> Vec<Rating> {
        stars.iter().map(|s| Rating::new(*s).unwrap()).collect()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(6).is_err());
        assert_eq!(Rating::new(5).unwrap().stars(), 5);
    }

    #[test]
    fn test_average_rounds_half_up() {
        assert_eq!(AverageRating::of(&ratings(&[4, 4, 5])).unwrap().centi_stars(), 433);
        assert_eq!(AverageRating::of(&ratings(&[4, 5])).unwrap().centi_stars(), 450);
        assert_eq!(AverageRating::of(&ratings(&[1, 2, 2])).unwrap().centi_stars(), 167);
        assert_eq!(AverageRating::of(&ratings(&[5, 5, 4])).unwrap().to_string(), "4.67");
    }

    #[test]
    fn test_average_of_nothing_is_none() {
        assert!(AverageRating::of(&[]).is_none());
    }

    #[test]
    fn test_average_from_stored_value() {
        assert_eq!(AverageRating::from_centi_stars(433).unwrap().as_f64(), 4.33);
        assert!(AverageRating::from_centi_stars(99).is_err());
        assert!(AverageRating::from_centi_stars(501).is_err());
    }
}
