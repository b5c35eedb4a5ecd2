// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Pull fallback abstraction.
//!
//! A pull source returns the current point-in-time value of a topic. The
//! engine only calls it when the push channel has not delivered a snapshot
//! within the topic's fallback delay.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use serde_json::Value;

/// Error type for pull requests.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PullError {
    /// The request could not be sent or the connection failed.
    #[error("request failed: {0}")]
    Request(String),

    /// The server answered with a non-success status.
    #[error("server returned status {0}")]
    Status(u16),

    /// The response body was not valid JSON.
    #[error("invalid response body: {0}")]
    Decode(String),

    /// No response within the configured timeout.
    #[error("timed out after {}ms", .0.as_millis())]
    Timeout(Duration),
}

/// Result type for pull requests.
pub type PullResult<T> = Result<T, PullError>;

/// Source of point-in-time topic snapshots.
pub trait PullSource: Send + Sync {
    /// Fetch the current value of `topic`.
    ///
    /// `params` (e.g. transaction filters) are passed through unchanged.
    fn fetch(
        &self,
        topic: &str,
        params: Option<Value>,
    ) -> Pin<Box<dyn Future<Output = PullResult<Value>> + Send + '_>>;
}
