// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Fallback timers and pull requests.
//!
//! Both run as spawned tasks and report back to the engine loop as
//! [`EngineEvent`]s. Each task is owned through a guard; dropping the guard
//! cancels the task. Every event carries the [`Ticket`] it was started
//! with, so a completion that outlives its subscription, round or session
//! can be recognised and ignored.

use std::sync::Arc;
use std::time::Duration;

use serde_json::Value;
use tokio::sync::mpsc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::pull::{PullError, PullResult, PullSource};

/// Identifies the subscription round an async completion belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Ticket {
    /// Session epoch; bumped on every login.
    pub epoch: u64,
    /// Subscription generation; unique per subscription within a session.
    pub generation: u64,
    /// Snapshot round; bumped on every refresh.
    pub round: u64,
}

/// Completions reported back to the engine loop.
#[derive(Debug)]
pub enum EngineEvent {
    /// A fallback timer expired without being cancelled.
    FallbackDue { topic: String, ticket: Ticket },
    /// A pull request finished (or timed out).
    PullCompleted {
        topic: String,
        ticket: Ticket,
        result: PullResult<Value>,
    },
}

impl EngineEvent {
    pub fn ticket(&self) -> Ticket {
        match self {
            EngineEvent::FallbackDue { ticket, .. } | EngineEvent::PullCompleted { ticket, .. } => {
                *ticket
            }
        }
    }

    pub fn topic(&self) -> &str {
        match self {
            EngineEvent::FallbackDue { topic, .. } | EngineEvent::PullCompleted { topic, .. } => {
                topic
            }
        }
    }
}

/// An armed fallback timer. Dropping it cancels the timer.
#[derive(Debug)]
pub struct FallbackTimer {
    ticket: Ticket,
    _guard: DropGuard,
}

impl FallbackTimer {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

/// An in-flight pull request. Dropping it abandons the request.
#[derive(Debug)]
pub struct PendingPull {
    ticket: Ticket,
    _guard: DropGuard,
}

impl PendingPull {
    pub fn ticket(&self) -> Ticket {
        self.ticket
    }
}

/// Spawns timers and pulls that report to the engine loop.
#[derive(Clone)]
pub struct Scheduler {
    events: mpsc::UnboundedSender<EngineEvent>,
    pull: Arc<dyn PullSource>,
    pull_timeout: Duration,
}

impl Scheduler {
    /// Create a scheduler and the receiver its events arrive on.
    pub fn new(
        pull: Arc<dyn PullSource>,
        pull_timeout: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<EngineEvent>) {
        let (events, rx) = mpsc::unbounded_channel();
        let scheduler = Scheduler {
            events,
            pull,
            pull_timeout,
        };
        (scheduler, rx)
    }

    /// Arm a timer that reports [`EngineEvent::FallbackDue`] after `delay`.
    pub fn arm_fallback(&self, topic: &str, ticket: Ticket, delay: Duration) -> FallbackTimer {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let events = self.events.clone();
        let topic = topic.to_string();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancelled.cancelled() => {}
                _ = tokio::time::sleep(delay) => {
                    let _ = events.send(EngineEvent::FallbackDue { topic, ticket });
                }
            }
        });

        FallbackTimer {
            ticket,
            _guard: token.drop_guard(),
        }
    }

    /// Fetch `topic` from the pull source, reporting
    /// [`EngineEvent::PullCompleted`] when done.
    ///
    /// A request that outlasts the pull timeout completes with
    /// [`PullError::Timeout`].
    pub fn start_pull(&self, topic: &str, ticket: Ticket, params: Option<Value>) -> PendingPull {
        let token = CancellationToken::new();
        let cancelled = token.clone();
        let events = self.events.clone();
        let pull = Arc::clone(&self.pull);
        let timeout = self.pull_timeout;
        let topic = topic.to_string();

        tokio::spawn(async move {
            let fetch = tokio::time::timeout(timeout, pull.fetch(&topic, params));
            let result = tokio::select! {
                _ = cancelled.cancelled() => return,
                outcome = fetch => match outcome {
                    Ok(result) => result,
                    Err(_) => Err(PullError::Timeout(timeout)),
                },
            };
            let _ = events.send(EngineEvent::PullCompleted {
                topic,
                ticket,
                result,
            });
        });

        PendingPull {
            ticket,
            _guard: token.drop_guard(),
        }
    }
}

#[cfg(test)]
#[path = "schedule_tests.rs"]
mod tests;
