// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]

use std::time::Duration;

use serde_json::json;
use tally_core::Decimal;
use tokio::sync::mpsc;

use super::*;
use crate::connection::SharedConnectionState;
use crate::schedule::Ticket;
use crate::subscription::Phase;
use crate::test_helpers::{test_config, MockPullSource, MockServer, MockTransport};

struct Harness {
    server: MockServer,
    scheduler: Scheduler,
    _events: mpsc::UnboundedReceiver<EngineEvent>,
    registry: SubscriptionRegistry<MockTransport>,
}

impl Harness {
    fn new() -> Self {
        let server = MockServer::new();
        let config = Arc::new(test_config());
        let (scheduler, events) =
            Scheduler::new(Arc::new(MockPullSource::new()), Duration::from_secs(10));
        let channel = PushChannel::new(
            &config.push,
            Arc::new(SharedConnectionState::new()),
            server.factory(),
        );
        Harness {
            server,
            scheduler,
            _events: events,
            registry: SubscriptionRegistry::new(1, config, channel),
        }
    }

    fn subscribe(&mut self, topic: &str) -> Result<()> {
        self.registry.ensure_subscribed(topic, &self.scheduler)
    }

    /// Process one channel event, then flush.
    async fn step(&mut self) {
        let event = self.registry.next_channel_event().await;
        self.registry.on_channel_event(event).await;
        self.registry.flush().await;
    }
}

#[tokio::test(start_paused = true)]
async fn ensure_subscribed_is_idempotent() {
    let mut h = Harness::new();

    h.subscribe("balance").unwrap();
    h.subscribe("balance").unwrap();
    h.step().await;

    assert_eq!(h.registry.active_topics(), vec!["balance"]);
    assert_eq!(
        h.server.sent(),
        vec![
            PushRequest::subscribe("balance"),
            PushRequest::initial_data("balance", None)
        ]
    );
    assert_eq!(
        h.registry.subscription("balance").unwrap().phase(),
        Phase::AwaitingSnapshot
    );
    assert_eq!(h.registry.connection_state(), ConnectionState::Ready);
}

#[tokio::test(start_paused = true)]
async fn subscribing_preserves_existing_state() {
    let mut h = Harness::new();
    h.subscribe("balance").unwrap();
    h.step().await;
    h.server.push(PushMessage::snapshot("balance", json!(40)));
    h.step().await;

    h.subscribe("balance").unwrap();

    let state = h.registry.state("balance").unwrap();
    assert_eq!(state.data.as_scalar(), Some(Decimal::from(40)));
    assert!(!state.is_loading);
}

#[tokio::test(start_paused = true)]
async fn unknown_topic_is_rejected() {
    let mut h = Harness::new();

    let err = h.subscribe("weather").unwrap_err();

    assert!(err.to_string().contains("unknown topic: 'weather'"));
    assert!(h.registry.subscription("weather").is_none());
    assert_eq!(h.registry.connection_state(), ConnectionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_before_ready_discards_queued_requests() {
    let mut h = Harness::new();
    h.subscribe("balance").unwrap();
    h.subscribe("transactions").unwrap();

    h.registry.unsubscribe("balance");
    h.registry.unsubscribe("balance");
    h.step().await;

    assert!(h.server.sent_for("balance").is_empty());
    assert_eq!(h.server.sent_for("transactions").len(), 2);
}

#[tokio::test(start_paused = true)]
async fn unsubscribe_when_ready_notifies_server() {
    let mut h = Harness::new();
    h.subscribe("balance").unwrap();
    h.step().await;

    h.registry.unsubscribe("balance");
    h.registry.flush().await;

    assert_eq!(
        h.server.count_sent(&PushRequest::unsubscribe("balance")),
        1
    );
    assert!(h.registry.state("balance").is_none());
}

#[tokio::test(start_paused = true)]
async fn messages_for_unsubscribed_topics_are_ignored() {
    let mut h = Harness::new();
    h.subscribe("balance").unwrap();
    h.step().await;

    h.server
        .push(PushMessage::snapshot("transactions", json!([{"id": "t1", "timestamp": 1}])));
    h.step().await;

    assert!(h.registry.state("transactions").is_none());
}

#[tokio::test(start_paused = true)]
async fn completions_from_another_session_are_ignored() {
    let mut h = Harness::new();
    h.subscribe("balance").unwrap();
    let current = h.registry.subscription("balance").unwrap().ticket();

    h.registry.on_engine_event(
        EngineEvent::FallbackDue {
            topic: "balance".to_string(),
            ticket: Ticket { epoch: 0, ..current },
        },
        &h.scheduler,
    );

    let subscription = h.registry.subscription("balance").unwrap();
    assert!(subscription.has_pending_fallback());
    assert!(!subscription.has_pending_pull());
}

#[tokio::test(start_paused = true)]
async fn reconnect_reregisters_active_topics() {
    let mut h = Harness::new();
    h.subscribe("balance").unwrap();
    h.subscribe("transactions").unwrap();
    h.step().await;
    h.registry
        .refresh("transactions", Some(json!({"limit": 5})), &h.scheduler);
    h.registry.flush().await;
    h.server.clear_sent();

    h.server.drop_connection();
    h.step().await; // lost
    assert_eq!(
        h.registry.subscription("balance").unwrap().phase(),
        Phase::Subscribing
    );
    h.step().await; // reconnected

    assert_eq!(h.server.connects(), 2);
    assert_eq!(h.server.count_sent(&PushRequest::subscribe("balance")), 1);
    assert_eq!(
        h.server.count_sent(&PushRequest::initial_data(
            "transactions",
            Some(json!({"limit": 5}))
        )),
        1
    );
    assert_eq!(h.server.sent().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn close_unsubscribes_and_disconnects() {
    let mut h = Harness::new();
    h.subscribe("balance").unwrap();
    h.subscribe("transactions").unwrap();
    h.step().await;

    h.registry.close().await;

    assert!(h.registry.active_topics().is_empty());
    assert_eq!(h.server.count_sent(&PushRequest::unsubscribe("balance")), 1);
    assert_eq!(
        h.server.count_sent(&PushRequest::unsubscribe("transactions")),
        1
    );
    assert!(!h.server.is_connected());
    assert_eq!(h.registry.connection_state(), ConnectionState::Disconnected);
}
