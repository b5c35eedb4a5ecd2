// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Push-versus-pull snapshot reconciliation.
//!
//! After subscribing, a topic waits for a push snapshot while its fallback
//! timer runs. Whichever happens first populates the state:
//!
//! - a push snapshot applies immediately and cancels the timer and any
//!   in-flight pull;
//! - an expired timer starts a pull, whose result applies only if no
//!   snapshot landed in the same round.
//!
//! Push snapshots always apply, including after a fallback result.
//! Completions are matched against the subscription's current [`Ticket`];
//! anything else is stale and dropped.

use serde_json::Value;
use tally_core::{FrameKind, Merge, PushMessage, PushRequest};

use crate::pull::PullResult;
use crate::schedule::{Scheduler, Ticket};
use crate::subscription::{Phase, TopicSubscription};

impl TopicSubscription {
    /// Route a push frame addressed to this topic.
    pub fn on_push_message(&mut self, msg: &PushMessage) {
        if let PushMessage::Error { message, .. } = msg {
            self.on_push_error(message);
            return;
        }
        match msg.classify(self.config.kind) {
            Some((FrameKind::Snapshot, data)) => self.on_push_snapshot(data),
            Some((FrameKind::Update, data)) => self.on_push_update(data),
            None => tracing::debug!(topic = self.name(), ?msg, "ignoring frame"),
        }
    }

    /// Apply a push-delivered snapshot.
    ///
    /// A malformed snapshot leaves state, flags and timers untouched.
    pub fn on_push_snapshot(&mut self, data: &Value) {
        match self.state.data.apply_snapshot(&self.config.name, data) {
            Ok(applied) => {
                self.snapshot_applied = true;
                self.pending_fallback = None;
                self.pending_pull = None;
                self.state.is_loading = false;
                self.state.last_error = None;
                self.phase = Phase::Synced;
                tracing::debug!(topic = self.name(), ?applied, "push snapshot applied");
            }
            Err(e) => {
                tracing::warn!(topic = self.name(), error = %e, "discarding malformed snapshot");
            }
        }
    }

    /// Merge an incremental push update.
    pub fn on_push_update(&mut self, data: &Value) {
        if self.phase != Phase::Synced {
            tracing::debug!(topic = self.name(), "update before first snapshot");
        }
        match self.state.data.apply_update(&self.config.name, data) {
            Ok(applied) => tracing::debug!(topic = self.name(), ?applied, "update applied"),
            Err(e) => {
                tracing::warn!(topic = self.name(), error = %e, "discarding malformed update")
            }
        }
    }

    /// Record a server-reported error without touching the data.
    pub fn on_push_error(&mut self, message: &str) {
        tracing::warn!(topic = self.name(), message, "push channel reported an error");
        self.state.last_error = Some(message.to_string());
    }

    /// The fallback timer for `ticket` expired: start the pull.
    pub fn on_fallback_due(&mut self, ticket: Ticket, scheduler: &Scheduler) {
        let armed = self.pending_fallback.as_ref().map(|t| t.ticket());
        if !self.is_active || armed != Some(ticket) {
            tracing::debug!(topic = self.name(), ?ticket, "ignoring stale fallback timer");
            return;
        }
        self.pending_fallback = None;
        if self.snapshot_applied {
            return;
        }

        tracing::info!(topic = self.name(), "no push snapshot yet, falling back to pull");
        let pull = scheduler.start_pull(&self.config.name, ticket, self.params.clone());
        self.pending_pull = Some(pull);
    }

    /// A pull for `ticket` finished.
    ///
    /// The result is discarded if a snapshot was applied in the meantime.
    /// Errors land in `last_error` and end the loading state; the data is
    /// left as it was.
    pub fn on_pull_completed(&mut self, ticket: Ticket, result: PullResult<Value>) {
        let pending = self.pending_pull.as_ref().map(|p| p.ticket());
        if !self.is_active || pending != Some(ticket) {
            tracing::debug!(topic = self.name(), ?ticket, "ignoring stale pull result");
            return;
        }
        self.pending_pull = None;
        if self.snapshot_applied {
            tracing::debug!(topic = self.name(), "snapshot already applied, dropping pull result");
            return;
        }

        let outcome = result
            .map_err(|e| e.to_string())
            .and_then(|data| {
                self.state
                    .data
                    .apply_snapshot(&self.config.name, &data)
                    .map_err(|e| e.to_string())
            });

        match outcome {
            Ok(applied) => {
                self.snapshot_applied = true;
                self.state.last_error = None;
                self.phase = Phase::Synced;
                tracing::debug!(topic = self.name(), ?applied, "fallback snapshot applied");
            }
            Err(error) => {
                tracing::warn!(topic = self.name(), %error, "pull fallback failed");
                self.state.last_error = Some(error);
            }
        }
        self.state.is_loading = false;
    }

    /// Start a new snapshot round.
    ///
    /// Keeps the current data visible while loading. `params` replaces the
    /// stored params when given. Returns the initial-data request to send.
    pub fn refresh(&mut self, params: Option<Value>, scheduler: &Scheduler) -> Option<PushRequest> {
        if !self.is_active {
            tracing::debug!(topic = self.name(), "refresh on inactive topic ignored");
            return None;
        }
        if params.is_some() {
            self.params = params;
        }
        self.round += 1;
        self.snapshot_applied = false;
        self.pending_pull = None;
        self.state.is_loading = true;
        self.state.last_error = None;
        self.arm_fallback(scheduler);
        tracing::debug!(topic = self.name(), round = self.round, "refresh");
        Some(PushRequest::initial_data(
            self.config.name.clone(),
            self.params.clone(),
        ))
    }
}

#[cfg(test)]
#[path = "reconciler_tests.rs"]
mod tests;
