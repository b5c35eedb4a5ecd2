// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test doubles for the push channel and pull fallback.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::future::Future;
use std::pin::Pin;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use serde_json::Value;
use tally_core::{PushMessage, PushRequest};
use tokio::sync::mpsc;

use crate::config::{Config, PullConfig, PushConfig, TopicConfig};
use crate::connection::TransportFactory;
use crate::pull::{PullError, PullResult, PullSource};
use crate::transport::{PushTransport, TransportError, TransportFuture};

/// In-process stand-in for the push server.
///
/// Every transport created by [`MockServer::factory`] talks to this server;
/// only the most recently connected one receives pushed messages.
#[derive(Clone, Default)]
pub struct MockServer {
    inner: Arc<Mutex<MockServerInner>>,
}

#[derive(Default)]
struct MockServerInner {
    sent: Vec<PushRequest>,
    inbox: Option<mpsc::UnboundedSender<PushMessage>>,
    connect_failures_left: u32,
    connects: u32,
}

impl MockServer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn factory(&self) -> TransportFactory<MockTransport> {
        let server = self.clone();
        Arc::new(move || MockTransport::new(server.clone()))
    }

    /// Deliver a message on the current connection. Returns false if no
    /// client is connected.
    pub fn push(&self, msg: PushMessage) -> bool {
        let inner = self.inner.lock().unwrap();
        match &inner.inbox {
            Some(tx) => tx.send(msg).is_ok(),
            None => false,
        }
    }

    /// Close the current connection from the server side.
    pub fn drop_connection(&self) {
        self.inner.lock().unwrap().inbox = None;
    }

    /// Make the next `n` connect attempts fail.
    pub fn fail_connects(&self, n: u32) {
        self.inner.lock().unwrap().connect_failures_left = n;
    }

    pub fn connects(&self) -> u32 {
        self.inner.lock().unwrap().connects
    }

    pub fn is_connected(&self) -> bool {
        self.inner
            .lock()
            .unwrap()
            .inbox
            .as_ref()
            .is_some_and(|tx| !tx.is_closed())
    }

    /// All requests received so far.
    pub fn sent(&self) -> Vec<PushRequest> {
        self.inner.lock().unwrap().sent.clone()
    }

    /// Requests received for one topic.
    pub fn sent_for(&self, topic: &str) -> Vec<PushRequest> {
        self.sent()
            .into_iter()
            .filter(|r| r.topic() == Some(topic))
            .collect()
    }

    pub fn count_sent(&self, expected: &PushRequest) -> usize {
        self.sent().iter().filter(|r| *r == expected).count()
    }

    pub fn clear_sent(&self) {
        self.inner.lock().unwrap().sent.clear();
    }
}

/// Mock transport for testing without real sockets.
pub struct MockTransport {
    server: MockServer,
    rx: Option<mpsc::UnboundedReceiver<PushMessage>>,
}

impl MockTransport {
    fn new(server: MockServer) -> Self {
        MockTransport { server, rx: None }
    }
}

impl PushTransport for MockTransport {
    fn connect(&mut self, _url: &str) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            let mut inner = self.server.inner.lock().unwrap();
            if inner.connect_failures_left > 0 {
                inner.connect_failures_left -= 1;
                return Err(TransportError::ConnectionFailed("mock failure".into()));
            }
            let (tx, rx) = mpsc::unbounded_channel();
            inner.inbox = Some(tx);
            inner.connects += 1;
            drop(inner);
            self.rx = Some(rx);
            Ok(())
        })
    }

    fn disconnect(&mut self) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.rx.take().is_some() {
                self.server.inner.lock().unwrap().inbox = None;
            }
            Ok(())
        })
    }

    fn send(&mut self, msg: PushRequest) -> TransportFuture<'_, ()> {
        Box::pin(async move {
            if self.rx.is_none() || !self.server.is_connected() {
                return Err(TransportError::ConnectionClosed);
            }
            self.server.inner.lock().unwrap().sent.push(msg);
            Ok(())
        })
    }

    fn recv(&mut self) -> TransportFuture<'_, Option<PushMessage>> {
        Box::pin(async move {
            let rx = self.rx.as_mut().ok_or(TransportError::ConnectionClosed)?;
            match rx.recv().await {
                Some(msg) => Ok(Some(msg)),
                None => {
                    self.rx = None;
                    Ok(None)
                }
            }
        })
    }

    fn is_connected(&self) -> bool {
        self.rx.is_some()
    }
}

/// Scripted pull source.
///
/// Responses are queued per topic and handed out in order; each response
/// resolves after its own delay. With no queued response a fetch fails.
#[derive(Clone, Default)]
pub struct MockPullSource {
    inner: Arc<Mutex<MockPullInner>>,
}

#[derive(Default)]
struct MockPullInner {
    responses: HashMap<String, VecDeque<(Duration, PullResult<Value>)>>,
    calls: Vec<(String, Option<Value>)>,
}

impl MockPullSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, topic: &str, delay: Duration, result: PullResult<Value>) {
        self.inner
            .lock()
            .unwrap()
            .responses
            .entry(topic.to_string())
            .or_default()
            .push_back((delay, result));
    }

    pub fn calls(&self) -> Vec<(String, Option<Value>)> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, topic: &str) -> usize {
        self.calls().iter().filter(|(t, _)| t == topic).count()
    }
}

impl PullSource for MockPullSource {
    fn fetch(
        &self,
        topic: &str,
        params: Option<Value>,
    ) -> Pin<Box<dyn Future<Output = PullResult<Value>> + Send + '_>> {
        let topic = topic.to_string();
        Box::pin(async move {
            let next = {
                let mut inner = self.inner.lock().unwrap();
                inner.calls.push((topic.clone(), params));
                inner
                    .responses
                    .get_mut(&topic)
                    .and_then(|queue| queue.pop_front())
            };
            match next {
                Some((delay, result)) => {
                    tokio::time::sleep(delay).await;
                    result
                }
                None => Err(PullError::Request(format!("no scripted response for {topic}"))),
            }
        })
    }
}

/// Config with short, distinct fallback delays and heartbeat disabled.
pub fn test_config() -> Config {
    Config {
        push: PushConfig {
            heartbeat_interval_ms: 0,
            ..PushConfig::default()
        },
        pull: PullConfig::default(),
        topics: vec![
            TopicConfig::scalar("balance", 3_000),
            TopicConfig::collection("transactions", 50, 3_000),
        ],
    }
}
