// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(clippy::unwrap_used)]
#![allow(clippy::panic)]

use super::*;
use crate::test_helpers::{MockServer, MockTransport};
use serde_json::json;

fn push_config(heartbeat_interval_ms: u64) -> PushConfig {
    PushConfig {
        reconnect_max_retries: 2,
        heartbeat_interval_ms,
        heartbeat_timeout_ms: 500,
        ..PushConfig::default()
    }
}

fn channel(server: &MockServer, heartbeat_interval_ms: u64) -> PushChannel<MockTransport> {
    PushChannel::new(
        &push_config(heartbeat_interval_ms),
        Arc::new(SharedConnectionState::new()),
        server.factory(),
    )
}

/// Open the channel and wait until it is ready.
async fn open(channel: &mut PushChannel<MockTransport>) {
    channel.ensure_open();
    match channel.next_event().await {
        ChannelEvent::Connected(transport) => channel.on_connected(transport),
        _ => panic!("expected the channel to connect"),
    }
}

#[tokio::test(start_paused = true)]
async fn requests_wait_until_ready() {
    let server = MockServer::new();
    let mut channel = channel(&server, 0);
    assert_eq!(channel.state(), ConnectionState::Disconnected);

    channel.enqueue(PushRequest::subscribe("balance"));
    channel.enqueue(PushRequest::initial_data("balance", None));
    assert!(channel.flush().await.unwrap().is_empty());
    assert_eq!(channel.queued(), 2);

    open(&mut channel).await;
    assert!(channel.is_ready());

    let sent = channel.flush().await.unwrap();
    assert_eq!(sent.len(), 2);
    assert_eq!(channel.queued(), 0);
    assert_eq!(
        server.sent(),
        vec![
            PushRequest::subscribe("balance"),
            PushRequest::initial_data("balance", None)
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn ensure_open_is_idempotent() {
    let server = MockServer::new();
    let mut channel = channel(&server, 0);

    open(&mut channel).await;
    channel.ensure_open();
    channel.ensure_open();
    tokio::time::sleep(Duration::from_secs(1)).await;

    assert_eq!(server.connects(), 1);
}

#[tokio::test(start_paused = true)]
async fn discard_queued_drops_one_topic() {
    let server = MockServer::new();
    let mut channel = channel(&server, 0);
    channel.enqueue(PushRequest::subscribe("balance"));
    channel.enqueue(PushRequest::subscribe("transactions"));

    assert_eq!(channel.discard_queued("balance"), 1);
    assert_eq!(channel.queued(), 1);
}

#[tokio::test(start_paused = true)]
async fn messages_are_delivered_and_pongs_swallowed() {
    let server = MockServer::new();
    let mut channel = channel(&server, 0);
    open(&mut channel).await;

    server.push(PushMessage::pong(42));
    server.push(PushMessage::snapshot("balance", json!(5)));

    match channel.next_event().await {
        ChannelEvent::Message(msg) => assert_eq!(msg, PushMessage::snapshot("balance", json!(5))),
        _ => panic!("expected a message"),
    }
}

#[tokio::test(start_paused = true)]
async fn server_close_is_reported_and_reconnects() {
    let server = MockServer::new();
    let mut channel = channel(&server, 0);
    open(&mut channel).await;
    channel.enqueue(PushRequest::subscribe("balance"));

    server.drop_connection();
    match channel.next_event().await {
        ChannelEvent::Lost(reason) => channel.on_lost(&reason),
        _ => panic!("expected the connection to be lost"),
    }
    assert!(!channel.is_ready());
    assert_eq!(channel.queued(), 0);

    match channel.next_event().await {
        ChannelEvent::Connected(transport) => channel.on_connected(transport),
        _ => panic!("expected a reconnect"),
    }
    assert!(channel.is_ready());
    assert_eq!(server.connects(), 2);
}

#[tokio::test(start_paused = true)]
async fn failed_connect_retries_after_pause() {
    let server = MockServer::new();
    server.fail_connects(2);
    let mut channel = channel(&server, 0);
    channel.ensure_open();

    let started = tokio::time::Instant::now();
    match channel.next_event().await {
        ChannelEvent::ConnectFailed { attempts, error } => {
            assert_eq!(attempts, 2);
            channel.on_connect_failed(attempts, &error);
        }
        _ => panic!("expected the connect to fail"),
    }

    assert!(matches!(
        channel.next_event().await,
        ChannelEvent::Connected(_)
    ));
    assert!(started.elapsed() >= RETRY_AFTER_FAILURE);
}

#[tokio::test(start_paused = true)]
async fn heartbeat_pings_and_detects_silence() {
    let server = MockServer::new();
    let mut channel = channel(&server, 1_000);
    open(&mut channel).await;
    let started = tokio::time::Instant::now();

    assert!(matches!(channel.next_event().await, ChannelEvent::PingDue));
    assert!(started.elapsed() >= Duration::from_millis(1_000));
    channel.send_ping().await.unwrap();
    assert_eq!(server.sent(), vec![PushRequest::ping(1)]);

    assert!(matches!(
        channel.next_event().await,
        ChannelEvent::PongTimeout
    ));
    assert!(started.elapsed() >= Duration::from_millis(1_500));
}

#[tokio::test(start_paused = true)]
async fn pong_keeps_connection_alive() {
    let server = MockServer::new();
    let mut channel = channel(&server, 1_000);
    open(&mut channel).await;

    assert!(matches!(channel.next_event().await, ChannelEvent::PingDue));
    channel.send_ping().await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    server.push(PushMessage::pong(1));

    // The next event is the following ping, not a timeout.
    assert!(matches!(channel.next_event().await, ChannelEvent::PingDue));
}

#[tokio::test(start_paused = true)]
async fn close_disconnects() {
    let server = MockServer::new();
    let mut channel = channel(&server, 0);
    open(&mut channel).await;
    channel.enqueue(PushRequest::subscribe("balance"));

    channel.close().await;

    assert_eq!(channel.state(), ConnectionState::Disconnected);
    assert!(!server.is_connected());
    assert_eq!(channel.queued(), 0);
}
