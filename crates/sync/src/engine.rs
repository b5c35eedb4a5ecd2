// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! The engine loop.
//!
//! A single task owns the session controller and everything below it and
//! handles one event at a time:
//! - session signals (login/logout)
//! - consumer commands (refresh)
//! - fallback timer and pull completions
//! - push channel events (connects, messages, drops, heartbeat)
//!
//! After every event the outbox is flushed and changed topic states are
//! published to consumers.

use std::sync::Arc;

use tally_core::SessionEvent;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::config::Config;
use crate::connection::{SharedConnectionState, TransportFactory};
use crate::controller::SessionController;
use crate::error::Result;
use crate::pull::PullSource;
use crate::schedule::{EngineEvent, Scheduler};
use crate::transport::PushTransport;
use crate::view::{Command, SyncHandle, Views};

/// The sync engine. Create with [`SyncEngine::new`] and drive with
/// [`SyncEngine::run`], or use [`SyncEngine::spawn`].
pub struct SyncEngine<T> {
    controller: SessionController<T>,
    scheduler: Scheduler,
    completions: mpsc::UnboundedReceiver<EngineEvent>,
    session: mpsc::Receiver<SessionEvent>,
    commands: mpsc::UnboundedReceiver<Command>,
    views: Views,
}

impl<T: PushTransport + 'static> SyncEngine<T> {
    /// Build an engine and the handle consumers use to observe it.
    ///
    /// The engine stops once the `session` sender is dropped.
    pub fn new(
        config: Config,
        factory: TransportFactory<T>,
        pull: Arc<dyn PullSource>,
        session: mpsc::Receiver<SessionEvent>,
    ) -> Result<(Self, SyncHandle)> {
        config.validate()?;
        let config = Arc::new(config);
        let connection = Arc::new(SharedConnectionState::new());
        let (scheduler, completions) = Scheduler::new(pull, config.pull.timeout());
        let (command_tx, commands) = mpsc::unbounded_channel();
        let views = Views::new(&config);
        let handle = views.handle(command_tx, Arc::clone(&connection));

        let engine = SyncEngine {
            controller: SessionController::new(config, factory, connection),
            scheduler,
            completions,
            session,
            commands,
            views,
        };
        Ok((engine, handle))
    }

    /// Build an engine and run it on a new task.
    pub fn spawn(
        config: Config,
        factory: TransportFactory<T>,
        pull: Arc<dyn PullSource>,
        session: mpsc::Receiver<SessionEvent>,
    ) -> Result<(SyncHandle, JoinHandle<()>)> {
        let (engine, handle) = Self::new(config, factory, pull, session)?;
        let task = tokio::spawn(engine.run());
        Ok((handle, task))
    }

    /// Process events until the session signal closes.
    pub async fn run(mut self) {
        tracing::debug!("sync engine started");
        loop {
            tokio::select! {
                event = self.session.recv() => match event {
                    Some(event) => {
                        tracing::debug!(?event, "session signal");
                        self.controller.on_session_event(event, &self.scheduler).await;
                    }
                    None => break,
                },
                Some(command) = self.commands.recv() => self.on_command(command),
                Some(event) = self.completions.recv() => {
                    self.controller.on_engine_event(event, &self.scheduler);
                }
                event = self.controller.next_channel_event() => {
                    self.controller.on_channel_event(event).await;
                }
            }
            self.controller.flush().await;
            self.publish();
        }

        self.controller.shutdown().await;
        self.publish();
        tracing::debug!("sync engine stopped");
    }

    fn on_command(&mut self, command: Command) {
        match command {
            Command::Refresh { topic, params } => {
                self.controller.refresh(&topic, params, &self.scheduler)
            }
        }
    }

    fn publish(&self) {
        for topic in self.views.topics() {
            self.views.publish(topic, self.controller.state(topic));
        }
        self.views.publish_user(self.controller.user());
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
