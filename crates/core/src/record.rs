// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Records held in collection topics.
//!
//! A record is identified by `id` and ordered by `timestamp` (epoch
//! milliseconds). Every other field is opaque to the sync core and carried
//! through untouched.
//!
//! Accepted wire shapes:
//! - `id`: non-empty string, or an integer (normalized to its decimal string)
//! - `timestamp`: integer epoch milliseconds, a numeric string, or an
//!   RFC 3339 date-time; `date` is read when `timestamp` is absent

use chrono::DateTime;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{Error, Result};

const ID_KEY: &str = "id";
const TIMESTAMP_KEY: &str = "timestamp";
const DATE_KEY: &str = "date";

/// A single entry of a collection topic (e.g. one transaction).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    /// Unique identity within the collection.
    pub id: String,
    /// Ordering key, epoch milliseconds.
    pub timestamp: i64,
    /// Opaque payload fields.
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl Record {
    /// Creates a record with no payload fields.
    pub fn new(id: impl Into<String>, timestamp: i64) -> Self {
        Record {
            id: id.into(),
            timestamp,
            fields: Map::new(),
        }
    }

    /// Adds a payload field (builder style).
    pub fn with_field(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.fields.insert(key.into(), value.into());
        self
    }

    /// Returns a payload field by name.
    pub fn field(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// Validates a JSON value and converts it into a record.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] if the value is not an object or lacks
    /// a usable `id`, and [`Error::InvalidTimestamp`] if the timestamp cannot be
    /// read.
    pub fn from_value(value: &Value) -> Result<Self> {
        let obj = value
            .as_object()
            .ok_or_else(|| Error::MalformedRecord(format!("expected an object, got {value}")))?;

        let id = parse_id(obj.get(ID_KEY))?;
        let (timestamp_key, raw_timestamp) = match obj.get(TIMESTAMP_KEY) {
            Some(v) => (TIMESTAMP_KEY, Some(v)),
            None => (DATE_KEY, obj.get(DATE_KEY)),
        };
        let timestamp = parse_timestamp(raw_timestamp)?;

        let fields = obj
            .iter()
            .filter(|(k, _)| k.as_str() != ID_KEY && k.as_str() != timestamp_key)
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        Ok(Record {
            id,
            timestamp,
            fields,
        })
    }

    /// Serializes the record back to its flat JSON shape.
    pub fn to_value(&self) -> Value {
        let mut obj = Map::with_capacity(self.fields.len() + 2);
        obj.insert(ID_KEY.to_string(), Value::String(self.id.clone()));
        obj.insert(TIMESTAMP_KEY.to_string(), Value::from(self.timestamp));
        for (k, v) in &self.fields {
            obj.insert(k.clone(), v.clone());
        }
        Value::Object(obj)
    }
}

fn parse_id(value: Option<&Value>) -> Result<String> {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => Ok(s.clone()),
        Some(Value::Number(n)) if n.is_i64() || n.is_u64() => Ok(n.to_string()),
        Some(other) => Err(Error::MalformedRecord(format!("invalid 'id': {other}"))),
        None => Err(Error::MalformedRecord("missing 'id'".to_string())),
    }
}

/// Reads a timestamp as epoch milliseconds.
pub fn parse_timestamp(value: Option<&Value>) -> Result<i64> {
    match value {
        None | Some(Value::Null) => Err(Error::MalformedRecord("missing 'timestamp'".to_string())),
        Some(Value::Number(n)) => n
            .as_i64()
            .or_else(|| whole_millis(n.as_f64()?))
            .ok_or_else(|| Error::InvalidTimestamp(n.to_string())),
        Some(Value::String(s)) => {
            let s = s.trim();
            if let Ok(ms) = s.parse::<i64>() {
                return Ok(ms);
            }
            DateTime::parse_from_rfc3339(s)
                .map(|dt| dt.timestamp_millis())
                .map_err(|_| Error::InvalidTimestamp(s.to_string()))
        }
        Some(other) => Err(Error::InvalidTimestamp(other.to_string())),
    }
}

// CORRECTNESS: range-checked before the cast, fraction must be zero
#[allow(clippy::cast_possible_truncation)]
fn whole_millis(f: f64) -> Option<i64> {
    if f.is_finite() && f.fract() == 0.0 && f.abs() < i64::MAX as f64 {
        Some(f as i64)
    } else {
        None
    }
}

#[cfg(test)]
#[path = "record_tests.rs"]
mod tests;
