// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Background connection management for the push channel.
//!
//! Connection attempts run in a background task so the engine loop keeps
//! servicing timers, pull completions and session signals while the push
//! channel is (re)connecting.

use std::fmt;
use std::sync::atomic::{AtomicU32, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::transport::PushTransport;

/// Push channel connection state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Disconnected,
    Connecting,
    Ready,
}

impl ConnectionState {
    fn as_u8(self) -> u8 {
        match self {
            ConnectionState::Disconnected => 0,
            ConnectionState::Connecting => 1,
            ConnectionState::Ready => 2,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            1 => ConnectionState::Connecting,
            2 => ConnectionState::Ready,
            _ => ConnectionState::Disconnected,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            ConnectionState::Disconnected => "disconnected",
            ConnectionState::Connecting => "connecting",
            ConnectionState::Ready => "ready",
        })
    }
}

/// Connection state visible to both the background task and consumers.
///
/// Uses atomic fields for lock-free reads.
pub struct SharedConnectionState {
    state: AtomicU8,
    attempt: AtomicU32,
}

impl SharedConnectionState {
    /// Create a new shared state initialized to disconnected.
    pub fn new() -> Self {
        Self {
            state: AtomicU8::new(ConnectionState::Disconnected.as_u8()),
            attempt: AtomicU32::new(0),
        }
    }

    pub fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.state.load(Ordering::Acquire))
    }

    pub fn set(&self, state: ConnectionState) {
        self.state.store(state.as_u8(), Ordering::Release);
    }

    /// Current connection attempt count (0 when not connecting).
    pub fn attempt(&self) -> u32 {
        self.attempt.load(Ordering::Acquire)
    }

    pub fn set_attempt(&self, attempt: u32) {
        self.attempt.store(attempt, Ordering::Release);
    }

    pub fn is_ready(&self) -> bool {
        self.get() == ConnectionState::Ready
    }

    /// Get a human-readable status string.
    pub fn status_string(&self) -> String {
        match self.get() {
            ConnectionState::Connecting => {
                let attempt = self.attempt();
                if attempt > 0 {
                    format!("connecting (attempt {})", attempt)
                } else {
                    "connecting".to_string()
                }
            }
            state => state.to_string(),
        }
    }
}

impl Default for SharedConnectionState {
    fn default() -> Self {
        Self::new()
    }
}

/// Events sent from the connection task to the engine loop.
pub enum ConnectionEvent<T> {
    /// Successfully connected. Contains the connected transport.
    Connected(T),
    /// Connection attempts exhausted.
    Failed {
        /// Number of attempts made.
        attempts: u32,
        /// Error message.
        error: String,
    },
}

impl<T> fmt::Debug for ConnectionEvent<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connected(_) => f.debug_tuple("Connected").field(&"<transport>").finish(),
            Self::Failed { attempts, error } => f
                .debug_struct("Failed")
                .field("attempts", attempts)
                .field("error", error)
                .finish(),
        }
    }
}

/// Configuration for the connection manager.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    /// URL to connect to.
    pub url: String,
    /// Maximum reconnection attempts (0 = unlimited).
    pub max_retries: u32,
    /// Maximum delay between reconnection attempts (seconds).
    pub max_delay_secs: u64,
    /// Initial delay for exponential backoff (milliseconds).
    pub initial_delay_ms: u64,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:7890".to_string(),
            max_retries: 10,
            max_delay_secs: 30,
            initial_delay_ms: 100,
        }
    }
}

/// Creates a fresh, unconnected transport for each attempt.
pub type TransportFactory<T> = Arc<dyn Fn() -> T + Send + Sync>;

/// Manages background connection tasks for one session.
///
/// Results arrive on the receiver returned by [`ConnectionManager::new`].
/// Dropping or cancelling the manager stops every pending attempt.
pub struct ConnectionManager<T> {
    config: ConnectionConfig,
    shared_state: Arc<SharedConnectionState>,
    factory: TransportFactory<T>,
    event_tx: mpsc::Sender<ConnectionEvent<T>>,
    cancel_token: CancellationToken,
}

impl<T: PushTransport + 'static> ConnectionManager<T> {
    /// Create a new connection manager.
    ///
    /// Returns the manager and a receiver for connection events.
    pub fn new(
        config: ConnectionConfig,
        shared_state: Arc<SharedConnectionState>,
        factory: TransportFactory<T>,
    ) -> (Self, mpsc::Receiver<ConnectionEvent<T>>) {
        let (event_tx, event_rx) = mpsc::channel(16);
        let manager = Self {
            config,
            shared_state,
            factory,
            event_tx,
            cancel_token: CancellationToken::new(),
        };
        (manager, event_rx)
    }

    /// Start a connection attempt in the background.
    pub fn spawn_connect_task(&self) {
        self.spawn_delayed_connect(Duration::ZERO);
    }

    /// Start a connection attempt after a delay.
    pub fn spawn_delayed_connect(&self, delay: Duration) {
        let config = self.config.clone();
        let shared_state = Arc::clone(&self.shared_state);
        let factory = Arc::clone(&self.factory);
        let event_tx = self.event_tx.clone();
        let cancel_token = self.cancel_token.clone();

        shared_state.set(ConnectionState::Connecting);
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::select! {
                    _ = cancel_token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            connect_with_retry(config, shared_state, factory, event_tx, cancel_token).await;
        });
    }

    /// Cancel any pending connection attempts.
    pub fn cancel(&self) {
        self.cancel_token.cancel();
    }
}

impl<T> Drop for ConnectionManager<T> {
    fn drop(&mut self) {
        self.cancel_token.cancel();
    }
}

/// Background connection task with exponential backoff.
async fn connect_with_retry<T: PushTransport>(
    config: ConnectionConfig,
    shared_state: Arc<SharedConnectionState>,
    factory: TransportFactory<T>,
    event_tx: mpsc::Sender<ConnectionEvent<T>>,
    cancel_token: CancellationToken,
) {
    let mut attempt = 0u32;
    let mut delay_ms = config.initial_delay_ms;

    loop {
        if cancel_token.is_cancelled() {
            return;
        }

        attempt = attempt.saturating_add(1);
        shared_state.set(ConnectionState::Connecting);
        shared_state.set_attempt(attempt);

        let mut transport = factory();

        let connect_result = tokio::select! {
            _ = cancel_token.cancelled() => return,
            result = transport.connect(&config.url) => result,
        };

        match connect_result {
            Ok(()) => {
                tracing::debug!(attempt, "push channel connected");
                shared_state.set_attempt(0);
                let _ = event_tx.send(ConnectionEvent::Connected(transport)).await;
                return;
            }
            Err(e) => {
                let error = e.to_string();
                tracing::debug!(attempt, %error, "push channel connect failed");

                if config.max_retries > 0 && attempt >= config.max_retries {
                    shared_state.set(ConnectionState::Disconnected);
                    shared_state.set_attempt(0);
                    let _ = event_tx
                        .send(ConnectionEvent::Failed {
                            attempts: attempt,
                            error,
                        })
                        .await;
                    return;
                }

                let delay = Duration::from_millis(delay_ms);
                tokio::select! {
                    _ = cancel_token.cancelled() => return,
                    _ = tokio::time::sleep(delay) => {}
                }

                delay_ms = std::cmp::min(
                    delay_ms.saturating_mul(2),
                    config.max_delay_secs.saturating_mul(1000),
                );
            }
        }
    }
}

#[cfg(test)]
#[path = "connection_tests.rs"]
mod tests;
