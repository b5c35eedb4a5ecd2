// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push channel protocol messages.
//!
//! The protocol is simple:
//! - Client subscribes to topics and asks for their initial data
//! - Server pushes snapshots and incremental updates tagged with a topic
//!
//! Frames carry an explicit `snapshot`/`update` discriminator. Untagged
//! `data` frames from older servers are classified by shape, see
//! [`PushMessage::classify`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::merge::is_list_payload;
use crate::topic::TopicKind;

/// Messages sent from client to server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushRequest {
    /// Register interest in a topic.
    Subscribe { topic: String },

    /// Drop interest in a topic.
    Unsubscribe { topic: String },

    /// Ask the server to push a full snapshot of a topic.
    InitialData {
        topic: String,
        /// Optional filters, passed through unchanged.
        #[serde(default, skip_serializing_if = "Option::is_none")]
        params: Option<Value>,
    },

    /// Ping message for keepalive.
    Ping {
        /// Client-chosen ID echoed in Pong.
        id: u64,
    },
}

/// Messages sent from server to client.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PushMessage {
    /// Full point-in-time state of a topic.
    Snapshot { topic: String, data: Value },

    /// Incremental change to one record; a full list or scalar value is
    /// applied as a snapshot.
    Update { topic: String, data: Value },

    /// Untagged payload; snapshot or update is inferred from its shape.
    Data { topic: String, data: Value },

    /// Pong response to client Ping.
    Pong {
        /// Echoed from the Ping message.
        id: u64,
    },

    /// Error message, optionally scoped to one topic.
    Error {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        topic: Option<String>,
        message: String,
    },
}

/// Whether a payload replaces the topic state or changes part of it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameKind {
    Snapshot,
    Update,
}

impl PushRequest {
    /// Creates a Subscribe message.
    pub fn subscribe(topic: impl Into<String>) -> Self {
        PushRequest::Subscribe {
            topic: topic.into(),
        }
    }

    /// Creates an Unsubscribe message.
    pub fn unsubscribe(topic: impl Into<String>) -> Self {
        PushRequest::Unsubscribe {
            topic: topic.into(),
        }
    }

    /// Creates an InitialData message.
    pub fn initial_data(topic: impl Into<String>, params: Option<Value>) -> Self {
        PushRequest::InitialData {
            topic: topic.into(),
            params,
        }
    }

    /// Creates a Ping message.
    pub fn ping(id: u64) -> Self {
        PushRequest::Ping { id }
    }

    /// The topic this request concerns, if any.
    pub fn topic(&self) -> Option<&str> {
        match self {
            PushRequest::Subscribe { topic }
            | PushRequest::Unsubscribe { topic }
            | PushRequest::InitialData { topic, .. } => Some(topic),
            PushRequest::Ping { .. } => None,
        }
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

impl PushMessage {
    /// Creates a Snapshot message.
    pub fn snapshot(topic: impl Into<String>, data: Value) -> Self {
        PushMessage::Snapshot {
            topic: topic.into(),
            data,
        }
    }

    /// Creates an Update message.
    pub fn update(topic: impl Into<String>, data: Value) -> Self {
        PushMessage::Update {
            topic: topic.into(),
            data,
        }
    }

    /// Creates an untagged Data message.
    pub fn data(topic: impl Into<String>, data: Value) -> Self {
        PushMessage::Data {
            topic: topic.into(),
            data,
        }
    }

    /// Creates a Pong message.
    pub fn pong(id: u64) -> Self {
        PushMessage::Pong { id }
    }

    /// Creates an Error message.
    pub fn error(topic: Option<String>, message: impl Into<String>) -> Self {
        PushMessage::Error {
            topic,
            message: message.into(),
        }
    }

    /// The topic this message is addressed to, if any.
    pub fn topic(&self) -> Option<&str> {
        match self {
            PushMessage::Snapshot { topic, .. }
            | PushMessage::Update { topic, .. }
            | PushMessage::Data { topic, .. } => Some(topic),
            PushMessage::Error { topic, .. } => topic.as_deref(),
            PushMessage::Pong { .. } => None,
        }
    }

    /// Resolves a payload-carrying message into its kind and data.
    ///
    /// A scalar value has no delta form, so every scalar payload is a
    /// snapshot. On collection topics a full list (bare or under `items`)
    /// is a snapshot whatever the frame's tag; a single record in an
    /// `update` or `data` frame is an update.
    pub fn classify(&self, kind: TopicKind) -> Option<(FrameKind, &Value)> {
        let data = match self {
            PushMessage::Snapshot { data, .. } => return Some((FrameKind::Snapshot, data)),
            PushMessage::Update { data, .. } | PushMessage::Data { data, .. } => data,
            PushMessage::Pong { .. } | PushMessage::Error { .. } => return None,
        };
        let frame = match kind {
            TopicKind::Scalar => FrameKind::Snapshot,
            TopicKind::Collection if is_list_payload(data) => FrameKind::Snapshot,
            TopicKind::Collection => FrameKind::Update,
        };
        Some((frame, data))
    }

    /// Serializes the message to JSON.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Deserializes the message from JSON.
    pub fn from_json(s: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(s)
    }
}

#[cfg(test)]
#[path = "protocol_tests.rs"]
mod tests;
