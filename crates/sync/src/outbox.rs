// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Outbox for push requests issued while the channel is not ready.
//!
//! Requests are held in memory in the order they were issued and flushed
//! to the server once the channel becomes ready. The outbox lives only as
//! long as the session; a dropped connection empties it because the
//! registry rebuilds registrations from its active subscriptions.

use std::collections::VecDeque;

use tally_core::PushRequest;

/// Ordered queue of pending push requests.
#[derive(Debug, Default)]
pub struct Outbox {
    pending: VecDeque<PushRequest>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a request for later sending.
    pub fn enqueue(&mut self, request: PushRequest) {
        self.pending.push_back(request);
    }

    /// All queued requests, oldest first, without removing them.
    pub fn peek_all(&self) -> impl Iterator<Item = &PushRequest> {
        self.pending.iter()
    }

    /// Remove the first `count` requests.
    ///
    /// Used after a partial flush so only unsent requests remain.
    pub fn remove_first(&mut self, count: usize) {
        let count = count.min(self.pending.len());
        self.pending.drain(..count);
    }

    /// Drop every queued request that targets `topic`.
    ///
    /// Returns the number removed.
    pub fn remove_topic(&mut self, topic: &str) -> usize {
        let before = self.pending.len();
        self.pending.retain(|r| r.topic() != Some(topic));
        before - self.pending.len()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }
}

#[cfg(test)]
#[path = "outbox_tests.rs"]
mod tests;
