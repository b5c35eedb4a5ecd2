// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session lifecycle controller.
//!
//! Owns the optional [`SessionContext`]: the logged-in user, the session
//! epoch and the subscription registry (which in turn owns the push
//! channel). Login builds a fresh context and subscribes every configured
//! topic; logout tears the context down. Nothing outlives the session.

use std::sync::Arc;

use tally_core::{SessionEvent, TopicState, UserId};

use crate::channel::{ChannelEvent, PushChannel};
use crate::config::Config;
use crate::connection::{SharedConnectionState, TransportFactory};
use crate::registry::SubscriptionRegistry;
use crate::schedule::{EngineEvent, Scheduler};
use crate::transport::PushTransport;

/// Everything that exists only while a user is logged in.
pub struct SessionContext<T> {
    pub user_id: UserId,
    pub epoch: u64,
    pub registry: SubscriptionRegistry<T>,
}

/// Reacts to login/logout signals.
pub struct SessionController<T> {
    config: Arc<Config>,
    factory: TransportFactory<T>,
    connection: Arc<SharedConnectionState>,
    session: Option<SessionContext<T>>,
    last_epoch: u64,
}

impl<T: PushTransport + 'static> SessionController<T> {
    pub fn new(
        config: Arc<Config>,
        factory: TransportFactory<T>,
        connection: Arc<SharedConnectionState>,
    ) -> Self {
        SessionController {
            config,
            factory,
            connection,
            session: None,
            last_epoch: 0,
        }
    }

    pub fn session(&self) -> Option<&SessionContext<T>> {
        self.session.as_ref()
    }

    pub fn session_mut(&mut self) -> Option<&mut SessionContext<T>> {
        self.session.as_mut()
    }

    pub fn user(&self) -> Option<&UserId> {
        self.session.as_ref().map(|s| &s.user_id)
    }

    /// Current state of `topic`, if a session is subscribed to it.
    pub fn state(&self, topic: &str) -> Option<&TopicState> {
        self.session.as_ref()?.registry.state(topic)
    }

    pub async fn on_session_event(&mut self, event: SessionEvent, scheduler: &Scheduler) {
        match event {
            SessionEvent::LoggedIn(user) => self.login(user, scheduler).await,
            SessionEvent::LoggedOut => self.logout().await,
        }
    }

    async fn login(&mut self, user: UserId, scheduler: &Scheduler) {
        if let Some(current) = &self.session {
            if current.user_id == user {
                tracing::debug!(user = %user, "already logged in");
                return;
            }
            tracing::info!(from = %current.user_id, to = %user, "switching user");
            self.logout().await;
        }

        self.last_epoch += 1;
        let epoch = self.last_epoch;
        let channel = PushChannel::new(
            &self.config.push,
            Arc::clone(&self.connection),
            Arc::clone(&self.factory),
        );
        let mut registry = SubscriptionRegistry::new(epoch, Arc::clone(&self.config), channel);

        for topic in &self.config.topics {
            if let Err(e) = registry.ensure_subscribed(&topic.name, scheduler) {
                tracing::warn!(topic = %topic.name, error = %e, "could not subscribe");
            }
        }

        tracing::info!(user = %user, epoch, "session started");
        self.session = Some(SessionContext {
            user_id: user,
            epoch,
            registry,
        });
    }

    async fn logout(&mut self) {
        let Some(mut session) = self.session.take() else {
            tracing::debug!("logout without an active session");
            return;
        };
        session.registry.close().await;
        tracing::info!(user = %session.user_id, epoch = session.epoch, "session ended");
    }

    /// End any active session.
    pub async fn shutdown(&mut self) {
        self.logout().await;
    }

    pub fn refresh(
        &mut self,
        topic: &str,
        params: Option<serde_json::Value>,
        scheduler: &Scheduler,
    ) {
        match self.session.as_mut() {
            Some(session) => session.registry.refresh(topic, params, scheduler),
            None => tracing::debug!(topic, "refresh ignored while logged out"),
        }
    }

    pub fn on_engine_event(&mut self, event: EngineEvent, scheduler: &Scheduler) {
        match self.session.as_mut() {
            Some(session) => session.registry.on_engine_event(event, scheduler),
            None => tracing::debug!(topic = event.topic(), "ignoring completion while logged out"),
        }
    }

    /// Wait for the session's next push channel event.
    ///
    /// Never resolves while logged out.
    pub async fn next_channel_event(&mut self) -> ChannelEvent<T> {
        match self.session.as_mut() {
            Some(session) => session.registry.next_channel_event().await,
            None => std::future::pending().await,
        }
    }

    pub async fn on_channel_event(&mut self, event: ChannelEvent<T>) {
        if let Some(session) = self.session.as_mut() {
            session.registry.on_channel_event(event).await;
        }
    }

    /// Send queued push requests.
    pub async fn flush(&mut self) {
        if let Some(session) = self.session.as_mut() {
            session.registry.flush().await;
        }
    }
}
