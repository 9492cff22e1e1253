// Copyright (c) 2026 100monkeys.ai
// SPDX-License-Identifier: AGPL-3.0
//! Typed column reads from a [`StorageRecord`]. Every failure names the column.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::application::conversion::ValidationFailure;
use crate::domain::record::{StorageRecord, StorageValue};

fn required<'r>(record: &'r StorageRecord, column: &str) -> Result<&'r StorageValue, ValidationFailure> {
    match record.get(column) {
        None | Some(StorageValue::Null) => Err(ValidationFailure::new(column, "required column is missing")),
        Some(value) => Ok(value),
    }
}

fn mismatch(column: &str, expected: &str, found: &StorageValue) -> ValidationFailure {
    ValidationFailure::new(column, format!("expected {expected}, found {}", found.kind()))
}

pub fn text<'r>(record: &'r StorageRecord, column: &str) -> Result<&'r str, ValidationFailure> {
    let value = required(record, column)?;
    value.as_text().ok_or_else(|| mismatch(column, "text", value))
}

pub fn int(record: &StorageRecord, column: &str) -> Result<i64, ValidationFailure> {
    let value = required(record, column)?;
    value.as_int().ok_or_else(|| mismatch(column, "int", value))
}

/// Integer column narrowed to `T`
pub fn int_as<T: TryFrom<i64>>(record: &StorageRecord, column: &str) -> Result<T, ValidationFailure> {
    let raw = int(record, column)?;
    T::try_from(raw).map_err(|_| {
        ValidationFailure::new(
            column,
            format!("{raw} does not fit in {}", std::any::type_name::<T>()),
        )
    })
}

/// Nullable integer column narrowed to `T`
pub fn optional_int_as<T: TryFrom<i64>>(record: &StorageRecord, column: &str) -> Result<Option<T>, ValidationFailure> {
    if !record.is_present(column) {
        return Ok(None);
    }
    int_as(record, column).map(Some)
}

pub fn boolean(record: &StorageRecord, column: &str) -> Result<bool, ValidationFailure> {
    let value = required(record, column)?;
    value.as_bool().ok_or_else(|| mismatch(column, "bool", value))
}

pub fn timestamp(record: &StorageRecord, column: &str) -> Result<DateTime<Utc>, ValidationFailure> {
    let value = required(record, column)?;
    value.as_timestamp().ok_or_else(|| mismatch(column, "timestamp", value))
}

pub fn uuid(record: &StorageRecord, column: &str) -> Result<Uuid, ValidationFailure> {
    let raw = text(record, column)?;
    Uuid::parse_str(raw).map_err(|e| ValidationFailure::new(column, format!("invalid uuid: {e}")))
}

/// Unsigned counter written as a storage integer
pub fn counter(column: &str, value: u64) -> Result<StorageValue, ValidationFailure> {
    i64::try_from(value)
        .map(StorageValue::Int)
        .map_err(|_| ValidationFailure::new(column, format!("{value} exceeds the storage integer range")))
}

/// Child records; a missing or null column is an empty list
pub fn records<'r>(record: &'r StorageRecord, column: &str) -> Result<&'r [StorageRecord], ValidationFailure> {
    match record.get(column) {
        None | Some(StorageValue::Null) => Ok(&[]),
        Some(StorageValue::Records(children)) => Ok(children),
        Some(other) => Err(mismatch(column, "records", other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_columns() {
        let record = StorageRecord::new()
            .with("servings", 4u8)
            .with("name", StorageValue::Null);
        assert_eq!(int_as::<u8>(&record, "servings").unwrap(), 4);
        assert_eq!(text(&record, "name").unwrap_err().message, "required column is missing");
        assert_eq!(
            text(&record, "servings").unwrap_err().message,
            "expected text, found int"
        );
    }

    #[test]
    fn test_narrowing_rejects_overflow() {
        let record = StorageRecord::new().with("servings", 300i64).with("weight", -1i64);
        assert!(int_as::<u8>(&record, "servings").is_err());
        assert!(int_as::<u32>(&record, "weight").is_err());
        assert_eq!(optional_int_as::<u16>(&record, "missing").unwrap(), None);
    }

    #[test]
    fn test_counter_range() {
        assert_eq!(counter("version", 7).unwrap(), StorageValue::Int(7));
        assert!(counter("version", u64::MAX).is_err());
    }

    #[test]
    fn test_missing_child_records_are_empty() {
        let record = StorageRecord::new();
        assert!(records(&record, "recipes").unwrap().is_empty());
    }
}
