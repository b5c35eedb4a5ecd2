// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Subscription registry.
//!
//! Maps topic names to their subscriptions for one session and owns the
//! session's push channel. Registration requests go through the channel's
//! outbox, so subscribing never waits for the connection: requests made
//! while connecting are sent once the channel is ready, and a reconnect
//! re-registers every active topic.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::Value;
use tally_core::{PushMessage, PushRequest, TopicState};

use crate::channel::{ChannelEvent, PushChannel};
use crate::config::Config;
use crate::connection::ConnectionState;
use crate::error::Result;
use crate::schedule::{EngineEvent, Scheduler};
use crate::subscription::TopicSubscription;
use crate::transport::PushTransport;

/// All topic subscriptions of one session.
pub struct SubscriptionRegistry<T> {
    epoch: u64,
    config: Arc<Config>,
    channel: PushChannel<T>,
    subscriptions: BTreeMap<String, TopicSubscription>,
    next_generation: u64,
}

impl<T: PushTransport + 'static> SubscriptionRegistry<T> {
    pub fn new(epoch: u64, config: Arc<Config>, channel: PushChannel<T>) -> Self {
        SubscriptionRegistry {
            epoch,
            config,
            channel,
            subscriptions: BTreeMap::new(),
            next_generation: 1,
        }
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    pub fn connection_state(&self) -> ConnectionState {
        self.channel.state()
    }

    pub fn subscription(&self, topic: &str) -> Option<&TopicSubscription> {
        self.subscriptions.get(topic)
    }

    pub fn state(&self, topic: &str) -> Option<&TopicState> {
        self.subscriptions.get(topic).map(|s| s.state())
    }

    /// Names of the active topics.
    pub fn active_topics(&self) -> Vec<&str> {
        self.subscriptions
            .values()
            .filter(|s| s.is_active())
            .map(|s| s.name())
            .collect()
    }

    /// Subscribe to `topic` unless already subscribed.
    ///
    /// Opens the push channel if needed. Fails only for topics that are not
    /// configured.
    pub fn ensure_subscribed(&mut self, topic: &str, scheduler: &Scheduler) -> Result<()> {
        if self.subscriptions.get(topic).is_some_and(|s| s.is_active()) {
            tracing::debug!(topic, "already subscribed");
            return Ok(());
        }
        let Some(config) = self.config.topic(topic) else {
            tracing::warn!(topic, "refusing to subscribe to unknown topic");
            return Err(tally_core::Error::UnknownTopic(topic.to_string()).into());
        };

        self.channel.ensure_open();

        let generation = self.next_generation;
        self.next_generation += 1;
        let mut subscription = TopicSubscription::new(config.clone(), self.epoch, generation);
        for request in subscription.begin(scheduler) {
            self.channel.enqueue(request);
        }
        self.subscriptions.insert(topic.to_string(), subscription);
        tracing::info!(topic, generation, "subscribed");
        Ok(())
    }

    /// Unsubscribe from `topic`. A topic that is not subscribed is ignored.
    pub fn unsubscribe(&mut self, topic: &str) {
        let Some(mut subscription) = self.subscriptions.remove(topic) else {
            tracing::debug!(topic, "not subscribed");
            return;
        };
        subscription.teardown();
        let discarded = self.channel.discard_queued(topic);
        if self.channel.is_ready() {
            self.channel.enqueue(PushRequest::unsubscribe(topic));
        }
        tracing::info!(topic, discarded, "unsubscribed");
    }

    /// Unsubscribe from every topic.
    pub fn unsubscribe_all(&mut self) {
        let topics: Vec<String> = self.subscriptions.keys().cloned().collect();
        for topic in topics {
            self.unsubscribe(&topic);
        }
    }

    /// Start a new snapshot round for `topic`.
    pub fn refresh(&mut self, topic: &str, params: Option<Value>, scheduler: &Scheduler) {
        let Some(subscription) = self.subscriptions.get_mut(topic) else {
            tracing::warn!(topic, "refresh requested for a topic that is not subscribed");
            return;
        };
        if let Some(request) = subscription.refresh(params, scheduler) {
            self.channel.enqueue(request);
        }
    }

    /// Wait for the next event from the push channel.
    pub async fn next_channel_event(&mut self) -> ChannelEvent<T> {
        self.channel.next_event().await
    }

    pub async fn on_channel_event(&mut self, event: ChannelEvent<T>) {
        match event {
            ChannelEvent::Connected(transport) => {
                self.channel.on_connected(transport);
                self.reregister();
            }
            ChannelEvent::ConnectFailed { attempts, error } => {
                self.channel.on_connect_failed(attempts, &error);
            }
            ChannelEvent::Message(msg) => self.on_push_message(&msg),
            ChannelEvent::Lost(reason) => self.on_lost(&reason),
            ChannelEvent::PingDue => {
                if let Err(e) = self.channel.send_ping().await {
                    self.on_lost(&e.to_string());
                }
            }
            ChannelEvent::PongTimeout => self.on_lost("heartbeat timed out"),
        }
    }

    /// Route a timer or pull completion to its subscription.
    pub fn on_engine_event(&mut self, event: EngineEvent, scheduler: &Scheduler) {
        if event.ticket().epoch != self.epoch {
            tracing::debug!(topic = event.topic(), "ignoring completion from an earlier session");
            return;
        }
        let Some(subscription) = self.subscriptions.get_mut(event.topic()) else {
            tracing::debug!(topic = event.topic(), "ignoring completion for unsubscribed topic");
            return;
        };
        match event {
            EngineEvent::FallbackDue { ticket, .. } => {
                subscription.on_fallback_due(ticket, scheduler)
            }
            EngineEvent::PullCompleted { ticket, result, .. } => {
                subscription.on_pull_completed(ticket, result)
            }
        }
    }

    /// Send whatever the outbox holds, if the channel is ready.
    pub async fn flush(&mut self) {
        match self.channel.flush().await {
            Ok(sent) => {
                for request in sent {
                    if let PushRequest::InitialData { topic, .. } = request {
                        if let Some(subscription) = self.subscriptions.get_mut(&topic) {
                            subscription.mark_registered();
                        }
                    }
                }
            }
            Err(e) => self.on_lost(&e.to_string()),
        }
    }

    /// Tear down every subscription and close the push channel.
    pub async fn close(&mut self) {
        self.unsubscribe_all();
        self.flush().await;
        self.channel.close().await;
    }

    fn on_push_message(&mut self, msg: &PushMessage) {
        let Some(topic) = msg.topic() else {
            if let PushMessage::Error { message, .. } = msg {
                tracing::warn!(message = message.as_str(), "push channel reported an error");
            }
            return;
        };
        match self.subscriptions.get_mut(topic) {
            Some(subscription) if subscription.is_active() => subscription.on_push_message(msg),
            _ => tracing::debug!(topic, "ignoring message for inactive topic"),
        }
    }

    fn on_lost(&mut self, reason: &str) {
        self.channel.on_lost(reason);
        for subscription in self.subscriptions.values_mut() {
            subscription.mark_unregistered();
        }
    }

    /// Rebuild the outbox from the active subscriptions.
    fn reregister(&mut self) {
        self.channel.clear_outbox();
        for subscription in self.subscriptions.values_mut() {
            if !subscription.is_active() {
                continue;
            }
            subscription.mark_unregistered();
            for request in subscription.registration() {
                self.channel.enqueue(request);
            }
        }
        tracing::debug!(queued = self.channel.queued(), "re-registering topics");
    }
}

#[cfg(test)]
#[path = "registry_tests.rs"]
mod tests;
