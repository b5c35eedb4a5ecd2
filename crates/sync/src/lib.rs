// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! tally-sync: keeps topic state in step with a remote source.
//!
//! # Architecture
//!
//! ```text
//! session signal ──► SessionController ──► SubscriptionRegistry ──► PushChannel ──► PushTransport
//!                          │                     │                      │
//!                          │                     ▼                      ▼
//!                          │              TopicSubscription        Outbox / heartbeat
//!                          │              (reconciler, merge)
//!                          ▼                     │
//!                     SyncEngine ◄── Scheduler ◄─┘ (fallback timers, PullSource)
//!                          │
//!                          ▼
//!                SyncHandle / TopicView (watch channels)
//! ```
//!
//! # Features
//!
//! - One engine task owns all state; no locks around sync state
//! - Push snapshot raced against a timed pull fallback per topic
//! - Stale completions dropped by ticket (session epoch, generation, round)
//! - Automatic reconnect with exponential backoff and re-registration
//! - Heartbeat ping/pong to detect dead connections
//! - Injectable transport and pull traits for testing

mod channel;
mod controller;
mod engine;
mod outbox;
mod reconciler;
mod registry;
mod schedule;
mod subscription;
mod view;

pub mod config;
pub mod connection;
pub mod error;
pub mod pull;
pub mod transport;

pub use channel::{ChannelEvent, PushChannel};
pub use config::{Config, ConfigError, PullConfig, PushConfig, TopicConfig};
pub use connection::{
    ConnectionConfig, ConnectionManager, ConnectionState, SharedConnectionState, TransportFactory,
};
pub use controller::{SessionContext, SessionController};
pub use engine::SyncEngine;
pub use error::{Error, Result};
pub use pull::{PullError, PullResult, PullSource};
pub use registry::SubscriptionRegistry;
pub use schedule::{EngineEvent, Scheduler, Ticket};
pub use subscription::{Phase, TopicSubscription};
pub use transport::{PushTransport, TransportError, WebSocketTransport};
pub use view::{Command, SyncHandle, TopicView};

#[cfg(test)]
mod test_helpers;
