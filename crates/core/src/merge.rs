// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Apply push and pull payloads to topic state.
//!
//! Merge rules:
//! - Scalar snapshot/update: the value is replaced wholesale
//! - Collection snapshot: the list is replaced, malformed entries dropped
//! - Collection update: upsert by id, then re-sort and truncate
//!
//! A payload that fails validation leaves the state untouched.

use std::str::FromStr;

use rust_decimal::Decimal;
use serde_json::Value;

use crate::collection::Upsert;
use crate::error::{Error, Result};
use crate::record::Record;
use crate::state::TopicData;

/// What a successful merge did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Applied {
    /// Scalar value replaced.
    Value,
    /// Collection replaced; `dropped` counts malformed or duplicate entries.
    List { len: usize, dropped: usize },
    /// Single record replaced in place.
    Updated,
    /// Single record inserted.
    Inserted,
}

/// Trait for applying topic payloads with validation.
pub trait Merge {
    /// Applies a full snapshot (initial or refreshed state).
    fn apply_snapshot(&mut self, topic: &str, data: &Value) -> Result<Applied>;

    /// Applies an incremental update.
    fn apply_update(&mut self, topic: &str, data: &Value) -> Result<Applied>;
}

impl Merge for TopicData {
    fn apply_snapshot(&mut self, topic: &str, data: &Value) -> Result<Applied> {
        match self {
            TopicData::Scalar(current) => {
                *current = parse_scalar(topic, data)?;
                Ok(Applied::Value)
            }
            TopicData::Collection(collection) => {
                let items = list_items(topic, data)?;
                let total = items.len();
                let records: Vec<Record> = items
                    .iter()
                    .filter_map(|item| match Record::from_value(item) {
                        Ok(record) => Some(record),
                        Err(e) => {
                            tracing::warn!(
                                topic,
                                error = %e,
                                "dropping malformed record from snapshot"
                            );
                            None
                        }
                    })
                    .collect();
                let malformed = total - records.len();
                let duplicates = collection.replace_all(records);
                Ok(Applied::List {
                    len: collection.len(),
                    dropped: malformed + duplicates,
                })
            }
        }
    }

    fn apply_update(&mut self, topic: &str, data: &Value) -> Result<Applied> {
        match self {
            TopicData::Scalar(current) => {
                *current = parse_scalar(topic, data)?;
                Ok(Applied::Value)
            }
            TopicData::Collection(collection) => {
                if is_list_payload(data) {
                    return self.apply_snapshot(topic, data);
                }
                let record = Record::from_value(data)
                    .map_err(|e| Error::malformed(topic, e.to_string()))?;
                Ok(match collection.upsert(record) {
                    Upsert::Updated => Applied::Updated,
                    Upsert::Inserted => Applied::Inserted,
                })
            }
        }
    }
}

/// Reads a scalar payload: a JSON number, or an object wrapping one in
/// `value` or `balance`.
pub fn parse_scalar(topic: &str, data: &Value) -> Result<Decimal> {
    let number = match data {
        Value::Number(n) => n,
        Value::Object(obj) => match obj.get("value").or_else(|| obj.get("balance")) {
            Some(Value::Number(n)) => n,
            _ => return Err(Error::malformed(topic, format!("expected a number, got {data}"))),
        },
        _ => return Err(Error::malformed(topic, format!("expected a number, got {data}"))),
    };
    let text = number.to_string();
    Decimal::from_str(&text)
        .or_else(|_| Decimal::from_scientific(&text))
        .map_err(|e| Error::malformed(topic, format!("unrepresentable number {text}: {e}")))
}

/// Whether `data` is a full list: a bare array or `{"items": [...]}`.
pub fn is_list_payload(data: &Value) -> bool {
    data.is_array() || data.get("items").is_some_and(Value::is_array)
}

fn list_items<'a>(topic: &str, data: &'a Value) -> Result<&'a Vec<Value>> {
    match data {
        Value::Array(items) => Ok(items),
        Value::Object(obj) => match obj.get("items") {
            Some(Value::Array(items)) => Ok(items),
            _ => Err(Error::malformed(topic, "expected a list of records")),
        },
        _ => Err(Error::malformed(topic, "expected a list of records")),
    }
}

#[cfg(test)]
#[path = "merge_tests.rs"]
mod tests;
