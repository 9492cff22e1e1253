// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum length of a normalized tag
pub const MAX_TAG_LENGTH: usize = 40;

/// Normalized classification slug (e.g. "weeknight", "gluten-free")
///
/// Equality is the business key: two tags that normalize to the same slug
/// are the same tag.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Tag(String);

impl Tag {
    /// Normalize and validate a raw tag
    ///
    /// Trims, lowercases, and turns inner whitespace or underscores into `-`.
    pub fn parse(raw: &str) -> Result<Self, TagError> {
        let normalized: String = raw
            .trim()
            .to_lowercase()
            .split(|c: char| c.is_whitespace() || c == '_')
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("-");

        if normalized.is_empty() {
            return Err(TagError::Empty);
        }
        if normalized.chars().count() > MAX_TAG_LENGTH {
            return Err(TagError::TooLong(normalized));
        }
        if let Some(c) = normalized
            .chars()
            .find(|c| !(c.is_ascii_lowercase() || c.is_ascii_digit() || *c == '-'))
        {
            return Err(TagError::InvalidCharacter {
                tag: normalized,
                character: c,
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<String> for Tag {
    type Error = TagError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<Tag> for String {
    fn from(tag: Tag) -> Self {
        tag.0
    }
}

impl std::str::FromStr for Tag {
    type Err = TagError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TagError {
    #[error("Tag cannot be empty")]
    Empty,

    #[error("Tag '{0}' exceeds 40 characters")]
    TooLong(String),

    #[error("Tag '{tag}' contains invalid character '{character}'")]
    InvalidCharacter { tag: String, character: char },
}
