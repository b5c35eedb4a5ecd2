// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-topic state as seen by consumers.

use rust_decimal::Decimal;
use serde::Serialize;

use crate::collection::Collection;
use crate::topic::TopicKind;

/// The value held by a topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum TopicData {
    Scalar(Decimal),
    Collection(Collection),
}

impl TopicData {
    /// The logged-out default: zero, or an empty list.
    pub fn empty(kind: TopicKind, max_items: usize) -> Self {
        match kind {
            TopicKind::Scalar => TopicData::Scalar(Decimal::ZERO),
            TopicKind::Collection => TopicData::Collection(Collection::new(max_items)),
        }
    }

    pub fn kind(&self) -> TopicKind {
        match self {
            TopicData::Scalar(_) => TopicKind::Scalar,
            TopicData::Collection(_) => TopicKind::Collection,
        }
    }

    pub fn as_scalar(&self) -> Option<Decimal> {
        match self {
            TopicData::Scalar(v) => Some(*v),
            TopicData::Collection(_) => None,
        }
    }

    pub fn as_collection(&self) -> Option<&Collection> {
        match self {
            TopicData::Collection(c) => Some(c),
            TopicData::Scalar(_) => None,
        }
    }

    fn reset(&mut self) {
        match self {
            TopicData::Scalar(v) => *v = Decimal::ZERO,
            TopicData::Collection(c) => c.clear(),
        }
    }
}

/// Value plus loading/error flags for one topic.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TopicState {
    pub data: TopicData,
    pub is_loading: bool,
    pub last_error: Option<String>,
}

impl TopicState {
    /// Logged-out state: empty data, not loading, no error.
    pub fn new(kind: TopicKind, max_items: usize) -> Self {
        TopicState {
            data: TopicData::empty(kind, max_items),
            is_loading: false,
            last_error: None,
        }
    }

    /// Empties the data and marks the topic as loading.
    pub fn begin_loading(&mut self) {
        self.data.reset();
        self.is_loading = true;
        self.last_error = None;
    }

    /// Returns to the logged-out default.
    pub fn clear(&mut self) {
        self.data.reset();
        self.is_loading = false;
        self.last_error = None;
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
