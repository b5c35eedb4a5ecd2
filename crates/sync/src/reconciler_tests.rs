// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use tally_core::{Decimal, TopicData};
use tokio::sync::mpsc;

use super::*;
use crate::config::TopicConfig;
use crate::pull::PullError;
use crate::schedule::EngineEvent;
use crate::test_helpers::MockPullSource;

struct Harness {
    scheduler: Scheduler,
    events: mpsc::UnboundedReceiver<EngineEvent>,
    pull: MockPullSource,
}

impl Harness {
    fn new() -> Self {
        let pull = MockPullSource::new();
        let (scheduler, events) = Scheduler::new(Arc::new(pull.clone()), Duration::from_secs(10));
        Harness {
            scheduler,
            events,
            pull,
        }
    }

    /// Wait for the next timer or pull completion and hand it to `sub`.
    async fn deliver_next(&mut self, sub: &mut TopicSubscription) -> EngineEvent {
        let event = self.events.recv().await.unwrap();
        match &event {
            EngineEvent::FallbackDue { ticket, .. } => {
                sub.on_fallback_due(*ticket, &self.scheduler)
            }
            EngineEvent::PullCompleted { ticket, result, .. } => {
                sub.on_pull_completed(*ticket, result.clone())
            }
        }
        event
    }

    fn nothing_pending(&mut self) -> bool {
        self.events.try_recv().is_err()
    }
}

fn balance() -> TopicSubscription {
    TopicSubscription::new(TopicConfig::scalar("balance", 3_000), 1, 1)
}

fn transactions() -> TopicSubscription {
    TopicSubscription::new(TopicConfig::collection("transactions", 50, 3_000), 1, 2)
}

fn scalar(sub: &TopicSubscription) -> Decimal {
    sub.state().data.as_scalar().unwrap()
}

fn ids(sub: &TopicSubscription) -> Vec<String> {
    sub.state()
        .data
        .as_collection()
        .unwrap()
        .ids()
        .into_iter()
        .map(String::from)
        .collect()
}

async fn sleep_ms(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

#[tokio::test(start_paused = true)]
async fn begin_resets_state_and_arms_fallback() {
    let h = Harness::new();
    let mut sub = balance();

    let requests = sub.begin(&h.scheduler);

    assert_eq!(
        requests,
        [
            PushRequest::subscribe("balance"),
            PushRequest::initial_data("balance", None)
        ]
    );
    assert!(sub.is_active());
    assert!(sub.state().is_loading);
    assert!(sub.has_pending_fallback());
    assert_eq!(sub.phase(), Phase::Subscribing);
    assert_eq!(sub.ticket().round, 1);

    sub.mark_registered();
    assert_eq!(sub.phase(), Phase::AwaitingSnapshot);
}

#[tokio::test(start_paused = true)]
async fn push_snapshot_wins_and_cancels_fallback() {
    let mut h = Harness::new();
    let mut sub = balance();
    sub.begin(&h.scheduler);
    sub.mark_registered();

    sleep_ms(100).await;
    sub.on_push_snapshot(&json!(100));

    assert_eq!(scalar(&sub), Decimal::from(100));
    assert!(!sub.state().is_loading);
    assert!(!sub.has_pending_fallback());
    assert_eq!(sub.phase(), Phase::Synced);

    sleep_ms(5_000).await;
    assert!(h.nothing_pending());
    assert_eq!(h.pull.call_count("balance"), 0);
}

#[tokio::test(start_paused = true)]
async fn fallback_applies_then_push_snapshot_overwrites() {
    let mut h = Harness::new();
    h.pull
        .respond("balance", Duration::from_millis(200), Ok(json!(50)));
    let mut sub = balance();
    sub.begin(&h.scheduler);

    let due = h.deliver_next(&mut sub).await;
    assert!(matches!(due, EngineEvent::FallbackDue { .. }));
    assert!(sub.has_pending_pull());

    let done = h.deliver_next(&mut sub).await;
    assert!(matches!(done, EngineEvent::PullCompleted { .. }));
    assert_eq!(scalar(&sub), Decimal::from(50));
    assert!(!sub.state().is_loading);
    assert_eq!(sub.phase(), Phase::Synced);

    sub.on_push_snapshot(&json!(75));
    assert_eq!(scalar(&sub), Decimal::from(75));
}

#[tokio::test(start_paused = true)]
async fn late_pull_after_push_snapshot_is_discarded() {
    let mut h = Harness::new();
    h.pull.respond("balance", Duration::from_secs(2), Ok(json!(10)));
    let mut sub = balance();
    sub.begin(&h.scheduler);

    h.deliver_next(&mut sub).await;
    let ticket = sub.ticket();
    assert!(sub.has_pending_pull());

    sleep_ms(1_000).await;
    sub.on_push_snapshot(&json!(99));
    assert!(!sub.has_pending_pull());

    // The pull task was cancelled; a completion racing the cancel is stale.
    sub.on_pull_completed(ticket, Ok(json!(10)));
    sleep_ms(5_000).await;

    assert!(h.nothing_pending());
    assert_eq!(scalar(&sub), Decimal::from(99));
}

#[tokio::test(start_paused = true)]
async fn pull_error_sets_last_error_and_clears_loading() {
    let mut h = Harness::new();
    h.pull.respond(
        "transactions",
        Duration::from_millis(10),
        Err(PullError::Status(503)),
    );
    let mut sub = transactions();
    sub.begin(&h.scheduler);

    h.deliver_next(&mut sub).await;
    h.deliver_next(&mut sub).await;

    assert_eq!(
        sub.state().last_error.as_deref(),
        Some("server returned status 503")
    );
    assert!(!sub.state().is_loading);
    assert!(ids(&sub).is_empty());
    assert_ne!(sub.phase(), Phase::Synced);
}

#[tokio::test(start_paused = true)]
async fn malformed_pull_result_is_reported_as_error() {
    let mut h = Harness::new();
    h.pull
        .respond("balance", Duration::from_millis(10), Ok(json!("lots")));
    let mut sub = balance();
    sub.begin(&h.scheduler);

    h.deliver_next(&mut sub).await;
    h.deliver_next(&mut sub).await;

    let error = sub.state().last_error.clone().unwrap();
    assert!(error.contains("malformed payload for 'balance'"), "{error}");
    assert_eq!(scalar(&sub), Decimal::ZERO);
    assert!(!sub.state().is_loading);
}

#[tokio::test(start_paused = true)]
async fn pull_timeout_is_reported_as_error() {
    let pull = MockPullSource::new();
    pull.respond("balance", Duration::from_secs(60), Ok(json!(1)));
    let (scheduler, events) = Scheduler::new(Arc::new(pull.clone()), Duration::from_secs(2));
    let mut h = Harness {
        scheduler,
        events,
        pull,
    };
    let mut sub = balance();
    sub.begin(&h.scheduler);

    h.deliver_next(&mut sub).await;
    h.deliver_next(&mut sub).await;

    assert_eq!(
        sub.state().last_error.as_deref(),
        Some("timed out after 2000ms")
    );
    assert!(!sub.state().is_loading);
}

#[tokio::test(start_paused = true)]
async fn stale_fallback_ticket_is_ignored() {
    let h = Harness::new();
    let mut sub = balance();
    sub.begin(&h.scheduler);

    let stale = Ticket {
        round: 0,
        ..sub.ticket()
    };
    sub.on_fallback_due(stale, &h.scheduler);

    assert!(sub.has_pending_fallback());
    assert!(!sub.has_pending_pull());
    assert_eq!(h.pull.call_count("balance"), 0);
}

#[tokio::test(start_paused = true)]
async fn malformed_push_snapshot_changes_nothing() {
    let h = Harness::new();
    let mut sub = balance();
    sub.begin(&h.scheduler);

    sub.on_push_snapshot(&json!({"currency": "EUR"}));

    assert!(sub.state().is_loading);
    assert!(sub.has_pending_fallback());
    assert!(!sub.snapshot_applied());
    assert_eq!(scalar(&sub), Decimal::ZERO);
}

#[tokio::test(start_paused = true)]
async fn updates_before_snapshot_are_replaced_by_it() {
    let h = Harness::new();
    let mut sub = transactions();
    sub.begin(&h.scheduler);

    sub.on_push_update(&json!({"id": "t9", "timestamp": 90}));
    assert_eq!(ids(&sub), vec!["t9"]);
    assert!(sub.state().is_loading);

    sub.on_push_snapshot(&json!([
        {"id": "t1", "timestamp": 10},
        {"id": "t2", "timestamp": 5}
    ]));
    assert_eq!(ids(&sub), vec!["t1", "t2"]);
}

#[tokio::test(start_paused = true)]
async fn legacy_data_frames_are_classified_by_shape() {
    let h = Harness::new();
    let mut sub = transactions();
    sub.begin(&h.scheduler);

    sub.on_push_message(&PushMessage::data(
        "transactions",
        json!([{"id": "t1", "timestamp": 10}]),
    ));
    assert!(sub.snapshot_applied());
    assert_eq!(sub.phase(), Phase::Synced);

    sub.on_push_message(&PushMessage::data(
        "transactions",
        json!({"id": "t2", "timestamp": 20}),
    ));
    assert_eq!(ids(&sub), vec!["t2", "t1"]);
}

async fn assert_scalar_push_wins_the_round(msg: PushMessage) {
    let mut h = Harness::new();
    h.pull
        .respond("balance", Duration::from_millis(200), Ok(json!(10)));
    let mut sub = balance();
    sub.begin(&h.scheduler);
    sub.mark_registered();

    sleep_ms(100).await;
    sub.on_push_message(&msg);

    assert_eq!(scalar(&sub), Decimal::from(99));
    assert!(!sub.state().is_loading);
    assert!(sub.snapshot_applied());
    assert!(!sub.has_pending_fallback());
    assert_eq!(sub.phase(), Phase::Synced);

    sleep_ms(5_000).await;
    assert!(h.nothing_pending());
    assert_eq!(h.pull.call_count("balance"), 0);
    assert_eq!(scalar(&sub), Decimal::from(99));
}

#[tokio::test(start_paused = true)]
async fn untagged_scalar_push_wins_the_round() {
    assert_scalar_push_wins_the_round(PushMessage::data("balance", json!(99))).await;
}

#[tokio::test(start_paused = true)]
async fn tagged_scalar_update_wins_the_round() {
    assert_scalar_push_wins_the_round(PushMessage::update("balance", json!(99))).await;
}

#[tokio::test(start_paused = true)]
async fn tagged_update_with_full_list_wins_the_round() {
    let mut h = Harness::new();
    h.pull.respond(
        "transactions",
        Duration::from_millis(200),
        Ok(json!([{"id": "p1", "timestamp": 1}])),
    );
    let mut sub = transactions();
    sub.begin(&h.scheduler);

    sleep_ms(100).await;
    sub.on_push_message(&PushMessage::update(
        "transactions",
        json!([
            {"id": "t1", "timestamp": 10},
            {"id": "t2", "timestamp": 20}
        ]),
    ));

    assert!(sub.snapshot_applied());
    assert!(!sub.has_pending_fallback());
    assert!(!sub.state().is_loading);

    sleep_ms(5_000).await;
    assert!(h.nothing_pending());
    assert_eq!(h.pull.call_count("transactions"), 0);
    assert_eq!(ids(&sub), vec!["t2", "t1"]);
}

#[tokio::test(start_paused = true)]
async fn malformed_scalar_update_leaves_fallback_armed() {
    let h = Harness::new();
    let mut sub = balance();
    sub.begin(&h.scheduler);

    sub.on_push_message(&PushMessage::update("balance", json!("oops")));

    assert!(sub.state().is_loading);
    assert!(sub.has_pending_fallback());
    assert!(!sub.snapshot_applied());
}

#[tokio::test(start_paused = true)]
async fn push_error_is_recorded_without_touching_data() {
    let h = Harness::new();
    let mut sub = balance();
    sub.begin(&h.scheduler);
    sub.on_push_snapshot(&json!(12.5));

    sub.on_push_message(&PushMessage::error(
        Some("balance".to_string()),
        "rate limited",
    ));

    assert_eq!(sub.state().last_error.as_deref(), Some("rate limited"));
    assert_eq!(sub.state().data, TopicData::Scalar(Decimal::new(125, 1)));
}

#[tokio::test(start_paused = true)]
async fn refresh_starts_new_round_with_params() {
    let mut h = Harness::new();
    h.pull
        .respond("transactions", Duration::from_millis(10), Ok(json!([])));
    let mut sub = transactions();
    sub.begin(&h.scheduler);
    sub.on_push_snapshot(&json!([{"id": "t1", "timestamp": 10}]));
    let first = sub.ticket();

    let request = sub.refresh(Some(json!({"limit": 5})), &h.scheduler);

    assert_eq!(
        request,
        Some(PushRequest::initial_data(
            "transactions",
            Some(json!({"limit": 5}))
        ))
    );
    assert_eq!(sub.ticket().round, first.round + 1);
    assert!(sub.state().is_loading);
    assert!(!sub.snapshot_applied());
    // Data stays visible during the refresh.
    assert_eq!(ids(&sub), vec!["t1"]);

    // A completion from the previous round is ignored.
    sub.on_pull_completed(first, Ok(json!([{"id": "old", "timestamp": 1}])));
    assert_eq!(ids(&sub), vec!["t1"]);

    h.deliver_next(&mut sub).await;
    h.deliver_next(&mut sub).await;

    assert!(ids(&sub).is_empty());
    assert!(!sub.state().is_loading);
    assert_eq!(
        h.pull.calls(),
        vec![("transactions".to_string(), Some(json!({"limit": 5})))]
    );
}

#[tokio::test(start_paused = true)]
async fn refresh_without_params_keeps_previous() {
    let h = Harness::new();
    let mut sub = transactions();
    sub.begin(&h.scheduler);
    sub.refresh(Some(json!({"limit": 5})), &h.scheduler);

    let request = sub.refresh(None, &h.scheduler);

    assert_eq!(
        request,
        Some(PushRequest::initial_data(
            "transactions",
            Some(json!({"limit": 5}))
        ))
    );
    assert_eq!(sub.params(), Some(&json!({"limit": 5})));
}

#[tokio::test(start_paused = true)]
async fn refresh_on_inactive_topic_is_ignored() {
    let h = Harness::new();
    let mut sub = balance();

    assert_eq!(sub.refresh(None, &h.scheduler), None);
    assert!(!sub.has_pending_fallback());
}

#[tokio::test(start_paused = true)]
async fn teardown_cancels_timer_and_clears_state() {
    let mut h = Harness::new();
    let mut sub = transactions();
    sub.begin(&h.scheduler);
    sub.on_push_update(&json!({"id": "t1", "timestamp": 10}));

    sub.teardown();

    assert!(!sub.is_active());
    assert_eq!(sub.phase(), Phase::Idle);
    assert!(!sub.state().is_loading);
    assert!(ids(&sub).is_empty());

    sleep_ms(5_000).await;
    assert!(h.nothing_pending());
    assert_eq!(h.pull.call_count("transactions"), 0);
}
