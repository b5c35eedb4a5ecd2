// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The session's push channel.
//!
//! Wraps the connection manager, the connected transport, the outbox of
//! requests waiting for a ready connection, and heartbeat bookkeeping.
//! [`PushChannel::next_event`] is cancel-safe so the engine can race it
//! against its other event sources.

use std::sync::Arc;
use std::time::Duration;

use tally_core::{PushMessage, PushRequest};
use tokio::sync::mpsc;
use tokio::time::Instant;

use crate::config::PushConfig;
use crate::connection::{
    ConnectionConfig, ConnectionEvent, ConnectionManager, ConnectionState, SharedConnectionState,
    TransportFactory,
};
use crate::outbox::Outbox;
use crate::transport::{PushTransport, TransportError, TransportResult};

/// Delay before retrying after the connection manager gives up.
pub const RETRY_AFTER_FAILURE: Duration = Duration::from_secs(5);

/// Something the registry has to react to.
pub enum ChannelEvent<T> {
    /// A transport finished connecting.
    Connected(T),
    /// The connection manager exhausted its retries.
    ConnectFailed { attempts: u32, error: String },
    /// A topic-bearing message arrived.
    Message(PushMessage),
    /// The connection closed or failed.
    Lost(String),
    /// Time to send a heartbeat ping.
    PingDue,
    /// No pong arrived in time.
    PongTimeout,
}

/// Ping/pong state for the live connection.
#[derive(Debug)]
struct Heartbeat {
    interval: Option<Duration>,
    timeout: Duration,
    /// Last time the server was heard from; `None` while disconnected.
    last_activity: Option<Instant>,
    /// Ping awaiting its pong, with the time it was sent.
    pending: Option<(u64, Instant)>,
    next_id: u64,
}

impl Heartbeat {
    fn new(interval: Option<Duration>, timeout: Duration) -> Self {
        Heartbeat {
            interval,
            timeout,
            last_activity: None,
            pending: None,
            next_id: 0,
        }
    }

    fn start(&mut self) {
        self.last_activity = Some(Instant::now());
        self.pending = None;
    }

    fn stop(&mut self) {
        self.last_activity = None;
        self.pending = None;
    }

    fn ping_deadline(&self) -> Option<Instant> {
        if self.pending.is_some() {
            return None;
        }
        Some(self.last_activity? + self.interval?)
    }

    fn pong_deadline(&self) -> Option<Instant> {
        self.pending.map(|(_, sent)| sent + self.timeout)
    }

    /// Any inbound message proves the connection is alive. A pong only
    /// settles the ping it answers.
    fn on_message(&mut self, msg: &PushMessage) {
        self.last_activity = Some(Instant::now());
        match msg {
            PushMessage::Pong { id } => {
                if self.pending.is_some_and(|(pending, _)| pending == *id) {
                    self.pending = None;
                }
            }
            _ => self.pending = None,
        }
    }

    fn next_ping(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }
}

/// Push connection owned by one session.
pub struct PushChannel<T> {
    config: ConnectionConfig,
    factory: TransportFactory<T>,
    shared: Arc<SharedConnectionState>,
    manager: Option<ConnectionManager<T>>,
    events: Option<mpsc::Receiver<ConnectionEvent<T>>>,
    transport: Option<T>,
    outbox: Outbox,
    heartbeat: Heartbeat,
}

impl<T: PushTransport + 'static> PushChannel<T> {
    pub fn new(
        push: &PushConfig,
        shared: Arc<SharedConnectionState>,
        factory: TransportFactory<T>,
    ) -> Self {
        PushChannel {
            config: push.connection_config(),
            factory,
            shared,
            manager: None,
            events: None,
            transport: None,
            outbox: Outbox::new(),
            heartbeat: Heartbeat::new(push.heartbeat_interval(), push.heartbeat_timeout()),
        }
    }

    pub fn state(&self) -> ConnectionState {
        if self.manager.is_none() {
            return ConnectionState::Disconnected;
        }
        self.shared.get()
    }

    pub fn is_ready(&self) -> bool {
        self.transport.is_some() && self.state() == ConnectionState::Ready
    }

    /// Make sure the channel is connected or connecting.
    pub fn ensure_open(&mut self) {
        match &self.manager {
            None => {
                let (manager, events) = ConnectionManager::new(
                    self.config.clone(),
                    Arc::clone(&self.shared),
                    Arc::clone(&self.factory),
                );
                tracing::info!(url = %self.config.url, "opening push channel");
                manager.spawn_connect_task();
                self.manager = Some(manager);
                self.events = Some(events);
            }
            Some(manager) => {
                if self.transport.is_none() && self.shared.get() == ConnectionState::Disconnected
                {
                    manager.spawn_connect_task();
                }
            }
        }
    }

    /// Wait for the next channel event.
    pub async fn next_event(&mut self) -> ChannelEvent<T> {
        loop {
            let ping_at = self.heartbeat.ping_deadline();
            let pong_at = self.heartbeat.pong_deadline();
            let connected = self.transport.is_some();
            let events = &mut self.events;
            let transport = &mut self.transport;

            tokio::select! {
                Some(event) = recv_connection_event(events) => {
                    return match event {
                        ConnectionEvent::Connected(transport) => ChannelEvent::Connected(transport),
                        ConnectionEvent::Failed { attempts, error } => {
                            ChannelEvent::ConnectFailed { attempts, error }
                        }
                    };
                }
                result = recv_message(transport), if connected => {
                    match result {
                        Ok(Some(msg)) => {
                            self.heartbeat.on_message(&msg);
                            if matches!(msg, PushMessage::Pong { .. }) {
                                continue;
                            }
                            return ChannelEvent::Message(msg);
                        }
                        Ok(None) => return ChannelEvent::Lost("connection closed".to_string()),
                        Err(e) => return ChannelEvent::Lost(e.to_string()),
                    }
                }
                _ = sleep_until(ping_at), if connected && ping_at.is_some() => {
                    return ChannelEvent::PingDue;
                }
                _ = sleep_until(pong_at), if connected && pong_at.is_some() => {
                    return ChannelEvent::PongTimeout;
                }
                else => std::future::pending::<()>().await,
            }
        }
    }

    /// A transport finished connecting; the channel is now ready.
    pub fn on_connected(&mut self, transport: T) {
        self.transport = Some(transport);
        self.shared.set(ConnectionState::Ready);
        self.heartbeat.start();
        tracing::info!("push channel ready");
    }

    /// The manager gave up; try again after a pause.
    pub fn on_connect_failed(&mut self, attempts: u32, error: &str) {
        tracing::warn!(attempts, error, "push channel unavailable, retrying later");
        if let Some(manager) = &self.manager {
            manager.spawn_delayed_connect(RETRY_AFTER_FAILURE);
        }
    }

    /// Drop the dead transport and start reconnecting.
    ///
    /// Queued requests are discarded; registrations are rebuilt once the
    /// channel is ready again.
    pub fn on_lost(&mut self, reason: &str) {
        tracing::warn!(reason, "push channel lost");
        self.transport = None;
        self.heartbeat.stop();
        self.outbox.clear();
        self.shared.set(ConnectionState::Disconnected);
        if let Some(manager) = &self.manager {
            manager.spawn_connect_task();
        }
    }

    /// Queue a request; it goes out on the next flush once ready.
    pub fn enqueue(&mut self, request: PushRequest) {
        self.outbox.enqueue(request);
    }

    /// Drop queued requests for `topic`. Returns how many were removed.
    pub fn discard_queued(&mut self, topic: &str) -> usize {
        self.outbox.remove_topic(topic)
    }

    pub fn clear_outbox(&mut self) {
        self.outbox.clear();
    }

    pub fn queued(&self) -> usize {
        self.outbox.len()
    }

    /// Send queued requests in order.
    ///
    /// Returns the requests that were sent. Does nothing until ready. On a
    /// send failure the unsent tail stays queued and the error is returned.
    pub async fn flush(&mut self) -> TransportResult<Vec<PushRequest>> {
        if !self.is_ready() || self.outbox.is_empty() {
            return Ok(Vec::new());
        }
        let Some(transport) = self.transport.as_mut() else {
            return Ok(Vec::new());
        };

        let requests: Vec<PushRequest> = self.outbox.peek_all().cloned().collect();
        let mut sent = Vec::with_capacity(requests.len());
        for request in requests {
            match transport.send(request.clone()).await {
                Ok(()) => sent.push(request),
                Err(e) => {
                    self.outbox.remove_first(sent.len());
                    return Err(e);
                }
            }
        }
        self.outbox.clear();
        Ok(sent)
    }

    /// Send a heartbeat ping.
    pub async fn send_ping(&mut self) -> TransportResult<()> {
        let transport = self
            .transport
            .as_mut()
            .ok_or(TransportError::ConnectionClosed)?;
        let id = self.heartbeat.next_ping();
        transport.send(PushRequest::ping(id)).await?;
        self.heartbeat.pending = Some((id, Instant::now()));
        tracing::debug!(id, "ping sent");
        Ok(())
    }

    /// Close the connection and stop reconnecting.
    pub async fn close(&mut self) {
        if let Some(manager) = self.manager.take() {
            manager.cancel();
        }
        self.events = None;
        if let Some(mut transport) = self.transport.take() {
            if let Err(e) = transport.disconnect().await {
                tracing::debug!("error closing push channel: {}", e);
            }
        }
        self.outbox.clear();
        self.heartbeat.stop();
        self.shared.set(ConnectionState::Disconnected);
        self.shared.set_attempt(0);
        tracing::info!("push channel closed");
    }
}

async fn recv_connection_event<T>(
    events: &mut Option<mpsc::Receiver<ConnectionEvent<T>>>,
) -> Option<ConnectionEvent<T>> {
    match events {
        Some(rx) => rx.recv().await,
        None => std::future::pending().await,
    }
}

async fn recv_message<T: PushTransport>(
    transport: &mut Option<T>,
) -> TransportResult<Option<PushMessage>> {
    match transport {
        Some(t) => t.recv().await,
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(at) => tokio::time::sleep_until(at).await,
        None => std::future::pending().await,
    }
}

#[cfg(test)]
#[path = "channel_tests.rs"]
mod tests;
