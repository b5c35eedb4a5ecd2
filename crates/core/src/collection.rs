// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Ordered, size-capped record collections.
//!
//! Invariants held after every mutation:
//! - records are sorted by `timestamp`, newest first
//! - no two records share an `id`
//! - `len() <= max_items`; the oldest excess records are dropped
//!
//! Sorting is stable. Among equal timestamps an in-place update keeps its
//! position and a newly inserted record lands first.

use std::collections::HashSet;

use serde::Serialize;

use crate::record::Record;

/// Default cap for collection topics.
pub const DEFAULT_MAX_ITEMS: usize = 50;

/// Outcome of [`Collection::upsert`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    /// A record with the same id was replaced in place.
    Updated,
    /// The record was new and has been inserted.
    Inserted,
}

/// A capped, newest-first list of records with unique ids.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Collection {
    records: Vec<Record>,
    #[serde(skip)]
    max_items: usize,
}

impl Collection {
    /// Creates an empty collection holding at most `max_items` records.
    pub fn new(max_items: usize) -> Self {
        Collection {
            records: Vec::new(),
            max_items,
        }
    }

    /// The records, newest first.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn max_items(&self) -> usize {
        self.max_items
    }

    /// Looks up a record by id.
    pub fn get(&self, id: &str) -> Option<&Record> {
        self.records.iter().find(|r| r.id == id)
    }

    /// Record ids in display order.
    pub fn ids(&self) -> Vec<&str> {
        self.records.iter().map(|r| r.id.as_str()).collect()
    }

    /// Replaces the whole collection.
    ///
    /// Duplicate ids keep their first occurrence. Returns the number of
    /// duplicates discarded.
    pub fn replace_all(&mut self, records: impl IntoIterator<Item = Record>) -> usize {
        let mut seen = HashSet::new();
        let mut duplicates = 0;
        self.records = records
            .into_iter()
            .filter(|r| {
                let fresh = seen.insert(r.id.clone());
                if !fresh {
                    duplicates += 1;
                }
                fresh
            })
            .collect();
        self.normalize();
        duplicates
    }

    /// Applies a single-record change: replace by id, otherwise prepend.
    pub fn upsert(&mut self, record: Record) -> Upsert {
        let outcome = match self.records.iter_mut().find(|r| r.id == record.id) {
            Some(existing) => {
                *existing = record;
                Upsert::Updated
            }
            None => {
                self.records.insert(0, record);
                Upsert::Inserted
            }
        };
        self.normalize();
        outcome
    }

    /// Removes every record.
    pub fn clear(&mut self) {
        self.records.clear();
    }

    fn normalize(&mut self) {
        self.records.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        self.records.truncate(self.max_items);
    }
}

impl Default for Collection {
    fn default() -> Self {
        Collection::new(DEFAULT_MAX_ITEMS)
    }
}

#[cfg(test)]
#[path = "collection_tests.rs"]
mod tests;
