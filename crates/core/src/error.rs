// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for tally-core operations.

use thiserror::Error;

/// All possible errors that can occur while validating or merging payloads.
#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed record: {0}")]
    MalformedRecord(String),

    #[error("malformed payload for '{topic}': {reason}")]
    MalformedPayload { topic: String, reason: String },

    #[error(
        "invalid timestamp: '{0}'\n  hint: use epoch milliseconds or an RFC 3339 date-time"
    )]
    InvalidTimestamp(String),

    #[error("invalid topic kind: '{0}'\n  hint: valid kinds are: scalar, collection")]
    InvalidTopicKind(String),

    #[error("unknown topic: '{0}'")]
    UnknownTopic(String),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

impl Error {
    /// Shorthand for a [`Error::MalformedPayload`].
    pub fn malformed(topic: impl Into<String>, reason: impl Into<String>) -> Self {
        Error::MalformedPayload {
            topic: topic.into(),
            reason: reason.into(),
        }
    }
}

/// A specialized Result type for tally-core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
