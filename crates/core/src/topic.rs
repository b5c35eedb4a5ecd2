// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Topic kinds.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// The shape of state a topic synchronizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopicKind {
    /// A single numeric value replaced wholesale (e.g. balance).
    Scalar,
    /// An ordered, capped list of records (e.g. transaction feed).
    Collection,
}

impl TopicKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TopicKind::Scalar => "scalar",
            TopicKind::Collection => "collection",
        }
    }
}

impl fmt::Display for TopicKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TopicKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "scalar" => Ok(TopicKind::Scalar),
            "collection" => Ok(TopicKind::Collection),
            _ => Err(Error::InvalidTopicKind(s.to_string())),
        }
    }
}

#[cfg(test)]
#[path = "topic_tests.rs"]
mod tests;
