// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Per-topic subscription state.
//!
//! A [`TopicSubscription`] owns the topic's state, its fallback timer and
//! any in-flight pull. Lifecycle:
//!
//! ```text
//! Idle -> Subscribing -> AwaitingSnapshot -> Synced
//! ```
//!
//! `Subscribing` lasts until the registration requests reach the server.
//! `AwaitingSnapshot -> Synced` happens once, on the first applied push
//! snapshot or fallback result. Teardown returns the topic to `Idle`.
//! The race itself lives in [`crate::reconciler`].

use serde_json::Value;
use tally_core::{PushRequest, TopicState};

use crate::config::TopicConfig;
use crate::schedule::{FallbackTimer, PendingPull, Scheduler, Ticket};

/// Subscription phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Subscribing,
    AwaitingSnapshot,
    Synced,
}

/// One topic's subscription within a session.
#[derive(Debug)]
pub struct TopicSubscription {
    pub(crate) config: TopicConfig,
    pub(crate) epoch: u64,
    pub(crate) generation: u64,
    pub(crate) round: u64,
    pub(crate) phase: Phase,
    pub(crate) is_active: bool,
    /// Whether a snapshot has been applied in the current round.
    pub(crate) snapshot_applied: bool,
    pub(crate) params: Option<Value>,
    pub(crate) pending_fallback: Option<FallbackTimer>,
    pub(crate) pending_pull: Option<PendingPull>,
    pub(crate) state: TopicState,
}

impl TopicSubscription {
    pub fn new(config: TopicConfig, epoch: u64, generation: u64) -> Self {
        let state = TopicState::new(config.kind, config.max_items);
        TopicSubscription {
            config,
            epoch,
            generation,
            round: 0,
            phase: Phase::Idle,
            is_active: false,
            snapshot_applied: false,
            params: None,
            pending_fallback: None,
            pending_pull: None,
            state,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &TopicConfig {
        &self.config
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn state(&self) -> &TopicState {
        &self.state
    }

    pub fn params(&self) -> Option<&Value> {
        self.params.as_ref()
    }

    pub fn snapshot_applied(&self) -> bool {
        self.snapshot_applied
    }

    pub fn has_pending_fallback(&self) -> bool {
        self.pending_fallback.is_some()
    }

    pub fn has_pending_pull(&self) -> bool {
        self.pending_pull.is_some()
    }

    /// Ticket of the current round.
    pub fn ticket(&self) -> Ticket {
        Ticket {
            epoch: self.epoch,
            generation: self.generation,
            round: self.round,
        }
    }

    /// Activate the subscription and arm the first fallback timer.
    ///
    /// State is reset to empty and loading. Returns the registration
    /// requests to send over the push channel.
    pub fn begin(&mut self, scheduler: &Scheduler) -> [PushRequest; 2] {
        self.is_active = true;
        self.phase = Phase::Subscribing;
        self.round = 1;
        self.snapshot_applied = false;
        self.state.begin_loading();
        self.arm_fallback(scheduler);
        tracing::debug!(topic = self.name(), "subscription started");
        self.registration()
    }

    /// Subscribe and initial-data requests for the current params.
    pub fn registration(&self) -> [PushRequest; 2] {
        [
            PushRequest::subscribe(self.name()),
            PushRequest::initial_data(self.name(), self.params.clone()),
        ]
    }

    /// The registration requests reached the server.
    pub fn mark_registered(&mut self) {
        if self.phase == Phase::Subscribing {
            self.phase = Phase::AwaitingSnapshot;
        }
    }

    /// The push channel dropped; registration has to be redone.
    ///
    /// Timers keep running so the fallback still covers the gap.
    pub fn mark_unregistered(&mut self) {
        if self.phase == Phase::AwaitingSnapshot {
            self.phase = Phase::Subscribing;
        }
    }

    /// Cancel pending work and return to the logged-out default.
    pub fn teardown(&mut self) {
        self.pending_fallback = None;
        self.pending_pull = None;
        self.is_active = false;
        self.snapshot_applied = false;
        self.phase = Phase::Idle;
        self.state.clear();
        tracing::debug!(topic = self.name(), "subscription torn down");
    }

    pub(crate) fn arm_fallback(&mut self, scheduler: &Scheduler) {
        let ticket = self.ticket();
        let delay = self.config.fallback_delay();
        self.pending_fallback = Some(scheduler.arm_fallback(self.name(), ticket, delay));
    }
}

#[cfg(test)]
#[path = "subscription_tests.rs"]
mod tests;
