// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! HTTP pull fallback.
//!
//! Each topic is fetched with `GET {base_url}/{topic}`. Object params are
//! sent as query pairs; any other params value is sent JSON-encoded as a
//! single `params` pair.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use reqwest::Client;
use serde_json::Value;
use tally_sync::{PullConfig, PullError, PullResult, PullSource};

use crate::error::Result;

/// Pull source backed by a REST endpoint.
pub struct HttpPullSource {
    http: Client,
    base_url: String,
    timeout: Duration,
}

impl HttpPullSource {
    pub fn new(config: &PullConfig) -> Result<Self> {
        let timeout = config.timeout();
        let http = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("tally/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    pub fn url(&self, topic: &str) -> String {
        format!("{}/{}", self.base_url, topic)
    }

    async fn get(&self, topic: &str, params: Option<Value>) -> PullResult<Value> {
        let url = self.url(topic);
        tracing::debug!(%url, "pull request");

        let response = self
            .http
            .get(&url)
            .query(&query_pairs(params.as_ref()))
            .send()
            .await
            .map_err(|e| self.request_error(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PullError::Status(status.as_u16()));
        }

        response.json::<Value>().await.map_err(|e| {
            if e.is_timeout() {
                PullError::Timeout(self.timeout)
            } else {
                PullError::Decode(e.to_string())
            }
        })
    }

    fn request_error(&self, e: reqwest::Error) -> PullError {
        if e.is_timeout() {
            PullError::Timeout(self.timeout)
        } else {
            PullError::Request(e.to_string())
        }
    }
}

impl PullSource for HttpPullSource {
    fn fetch(
        &self,
        topic: &str,
        params: Option<Value>,
    ) -> Pin<Box<dyn Future<Output = PullResult<Value>> + Send + '_>> {
        let topic = topic.to_string();
        Box::pin(async move { self.get(&topic, params).await })
    }
}

/// Query pairs for `params`.
pub fn query_pairs(params: Option<&Value>) -> Vec<(String, String)> {
    match params {
        None | Some(Value::Null) => Vec::new(),
        Some(Value::Object(map)) => map
            .iter()
            .filter(|(_, v)| !v.is_null())
            .map(|(k, v)| {
                let v = match v {
                    Value::String(s) => s.clone(),
                    other => other.to_string(),
                };
                (k.clone(), v)
            })
            .collect(),
        Some(other) => vec![("params".to_string(), other.to_string())],
    }
}

#[cfg(test)]
#[path = "http_tests.rs"]
mod tests;
