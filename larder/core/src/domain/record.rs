// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Storage Record
//!
//! The flat persistence shape exchanged with storage collaborators. Columns
//! are scalar; relationships are ordered lists of child records; composite
//! value objects are flattened into prefixed columns by the conversion layer.
//!
//! Records serialize as JSON objects of tagged values so a document store can
//! keep them verbatim.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One column value
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum StorageValue {
    Null,
    Bool(bool),
    Int(i64),
    Text(String),
    Timestamp(DateTime<Utc>),
    List(Vec<StorageValue>),
    Records(Vec<StorageRecord>),
}

impl StorageValue {
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Short type name used in error messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::List(_) => "list",
            Self::Records(_) => "records",
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Timestamp(t) => Some(*t),
            _ => None,
        }
    }
}

impl From<bool> for StorageValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for StorageValue {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<u32> for StorageValue {
    fn from(value: u32) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<u8> for StorageValue {
    fn from(value: u8) -> Self {
        Self::Int(i64::from(value))
    }
}

impl From<String> for StorageValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for StorageValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<DateTime<Utc>> for StorageValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<StorageValue>> From<Option<T>> for StorageValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

/// Flat map of column name to value, ordered by column name
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StorageRecord(BTreeMap<String, StorageValue>);

impl StorageRecord {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<StorageValue>) -> Option<StorageValue> {
        self.0.insert(column.into(), value.into())
    }

    pub fn with(mut self, column: impl Into<String>, value: impl Into<StorageValue>) -> Self {
        self.insert(column, value);
        self
    }

    pub fn get(&self, column: &str) -> Option<&StorageValue> {
        self.0.get(column)
    }

    pub fn remove(&mut self, column: &str) -> Option<StorageValue> {
        self.0.remove(column)
    }

    /// Whether the column exists with a non-null value
    pub fn is_present(&self, column: &str) -> bool {
        self.get(column).is_some_and(|v| !v.is_null())
    }

    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &StorageValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }
}

impl FromIterator<(String, StorageValue)> for StorageRecord {
    fn from_iter<I: IntoIterator<Item = (String, StorageValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_option_maps_to_null() {
        assert_eq!(StorageValue::from(None::<u32>), StorageValue::Null);
        assert_eq!(StorageValue::from(Some(7u32)), StorageValue::Int(7));
    }

    #[test]
    fn test_presence_ignores_null_columns() {
        let record = StorageRecord::new()
            .with("name", "Dal")
            .with("nutrition_calories", StorageValue::Null);
        assert!(record.is_present("name"));
        assert!(!record.is_present("nutrition_calories"));
        assert!(!record.is_present("missing"));
        assert_eq!(record.columns().collect::<Vec<_>>(), ["name", "nutrition_calories"]);
    }

    #[test]
    fn test_json_document_shape() {
        let record = StorageRecord::new()
            .with("servings", 4u8)
            .with("tags", StorageValue::List(vec!["vegan".into()]));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["servings"]["type"], "int");
        assert_eq!(json["servings"]["value"], 4);
        assert_eq!(json["tags"]["value"][0]["value"], "vegan");

        let back: StorageRecord = serde_json::from_value(json).unwrap();
        assert_eq!(back, record);
    }
}
