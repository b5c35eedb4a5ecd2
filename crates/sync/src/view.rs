// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Consumer-facing handles.
//!
//! The engine publishes each topic's [`TopicState`] through a `watch`
//! channel; consumers read the latest value and await changes without
//! touching engine state. Refresh requests travel back as [`Command`]s.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tally_core::{TopicState, UserId};
use tokio::sync::{mpsc, watch};

use crate::config::Config;
use crate::connection::{ConnectionState, SharedConnectionState};
use crate::error::{Error, Result};

/// Requests from consumers to the engine.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Refresh {
        topic: String,
        params: Option<Value>,
    },
}

/// Engine side of the published state.
pub(crate) struct Views {
    topics: BTreeMap<String, TopicSlot>,
    user: watch::Sender<Option<UserId>>,
}

struct TopicSlot {
    tx: watch::Sender<TopicState>,
    /// Logged-out default, published while no session holds the topic.
    default: TopicState,
}

impl Views {
    pub(crate) fn new(config: &Config) -> Self {
        let topics = config
            .topics
            .iter()
            .map(|t| {
                let default = TopicState::new(t.kind, t.max_items);
                let (tx, _) = watch::channel(default.clone());
                (t.name.clone(), TopicSlot { tx, default })
            })
            .collect();
        let (user, _) = watch::channel(None);
        Views { topics, user }
    }

    pub(crate) fn handle(
        &self,
        commands: mpsc::UnboundedSender<Command>,
        connection: Arc<SharedConnectionState>,
    ) -> SyncHandle {
        SyncHandle {
            commands,
            topics: self
                .topics
                .iter()
                .map(|(name, slot)| (name.clone(), slot.tx.subscribe()))
                .collect(),
            connection,
            user: self.user.subscribe(),
        }
    }

    pub(crate) fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    /// Publish the state of `topic`, or its default when `None`.
    ///
    /// Receivers are only notified when the value actually changed.
    pub(crate) fn publish(&self, topic: &str, state: Option<&TopicState>) {
        let Some(slot) = self.topics.get(topic) else {
            return;
        };
        let state = state.unwrap_or(&slot.default);
        slot.tx.send_if_modified(|current| {
            if *current == *state {
                return false;
            }
            *current = state.clone();
            true
        });
    }

    pub(crate) fn publish_user(&self, user: Option<&UserId>) {
        self.user.send_if_modified(|current| {
            if current.as_ref() == user {
                return false;
            }
            *current = user.cloned();
            true
        });
    }
}

/// Consumer handle to a running engine.
#[derive(Clone)]
pub struct SyncHandle {
    commands: mpsc::UnboundedSender<Command>,
    topics: BTreeMap<String, watch::Receiver<TopicState>>,
    connection: Arc<SharedConnectionState>,
    user: watch::Receiver<Option<UserId>>,
}

impl SyncHandle {
    /// View of a configured topic.
    pub fn topic(&self, name: &str) -> Option<TopicView> {
        let state = self.topics.get(name)?.clone();
        Some(TopicView {
            name: name.to_string(),
            state,
            commands: self.commands.clone(),
        })
    }

    /// Names of all configured topics.
    pub fn topics(&self) -> impl Iterator<Item = &str> {
        self.topics.keys().map(String::as_str)
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.connection.get()
    }

    /// Human-readable connection status.
    pub fn connection_status(&self) -> String {
        self.connection.status_string()
    }

    /// The logged-in user, if any.
    pub fn user(&self) -> Option<UserId> {
        self.user.borrow().clone()
    }
}

/// Read access to one topic plus refresh.
#[derive(Clone)]
pub struct TopicView {
    name: String,
    state: watch::Receiver<TopicState>,
    commands: mpsc::UnboundedSender<Command>,
}

impl TopicView {
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Snapshot of the current state.
    pub fn get(&self) -> TopicState {
        self.state.borrow().clone()
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().is_loading
    }

    pub fn last_error(&self) -> Option<String> {
        self.state.borrow().last_error.clone()
    }

    /// Wait until the state changes.
    ///
    /// Fails once the engine has stopped.
    pub async fn changed(&mut self) -> Result<TopicState> {
        self.state
            .changed()
            .await
            .map_err(|_| Error::EngineStopped)?;
        Ok(self.state.borrow_and_update().clone())
    }

    /// Start a new snapshot round for this topic.
    ///
    /// `params` replace the topic's stored params when given.
    pub fn refresh(&self, params: Option<Value>) {
        let command = Command::Refresh {
            topic: self.name.clone(),
            params,
        };
        if self.commands.send(command).is_err() {
            tracing::debug!(topic = %self.name, "refresh after engine stopped");
        }
    }
}

#[cfg(test)]
#[path = "view_tests.rs"]
mod tests;
