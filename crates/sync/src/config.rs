// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Engine configuration.
//!
//! Configuration is read from a TOML file (conventionally `tally.toml`) with
//! three sections:
//! - `[push]`: push channel URL, reconnect and heartbeat settings
//! - `[pull]`: pull fallback base URL and request timeout
//! - `[[topics]]`: one entry per synchronized topic
//!
//! Every field has a default; a missing file yields the default
//! configuration (balance + transactions).

use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tally_core::{TopicKind, DEFAULT_MAX_ITEMS};

use crate::connection::ConnectionConfig;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("{0}")]
    Invalid(String),
}

/// Top-level configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub push: PushConfig,
    #[serde(default)]
    pub pull: PullConfig,
    #[serde(default = "default_topics")]
    pub topics: Vec<TopicConfig>,
}

/// Push channel settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PushConfig {
    /// WebSocket URL (`ws://` or `wss://`).
    #[serde(default = "default_push_url")]
    pub url: String,
    /// Maximum reconnection attempts before backing off for a while (0 = unlimited).
    #[serde(default = "default_reconnect_max_retries")]
    pub reconnect_max_retries: u32,
    /// Maximum delay between reconnection attempts in seconds.
    #[serde(default = "default_reconnect_max_delay_secs")]
    pub reconnect_max_delay_secs: u64,
    /// Initial delay for exponential backoff in milliseconds.
    #[serde(default = "default_initial_delay_ms")]
    pub initial_delay_ms: u64,
    /// Heartbeat ping interval in milliseconds. 0 = disabled.
    #[serde(default = "default_heartbeat_interval_ms")]
    pub heartbeat_interval_ms: u64,
    /// Max time to wait for pong response in milliseconds.
    #[serde(default = "default_heartbeat_timeout_ms")]
    pub heartbeat_timeout_ms: u64,
}

/// Pull fallback settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PullConfig {
    /// Base URL; topics are fetched from `{base_url}/{topic}`.
    #[serde(default = "default_pull_base_url")]
    pub base_url: String,
    /// Per-request timeout in milliseconds.
    #[serde(default = "default_pull_timeout_ms")]
    pub timeout_ms: u64,
}

/// One synchronized topic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TopicConfig {
    pub name: String,
    pub kind: TopicKind,
    /// Collection cap (ignored for scalar topics).
    #[serde(default = "default_max_items")]
    pub max_items: usize,
    /// Delay before the pull fallback fires, in milliseconds.
    #[serde(default = "default_fallback_delay_ms")]
    pub fallback_delay_ms: u64,
}

fn default_push_url() -> String {
    "ws://localhost:7890".to_string()
}

fn default_reconnect_max_retries() -> u32 {
    10
}

fn default_reconnect_max_delay_secs() -> u64 {
    30
}

fn default_initial_delay_ms() -> u64 {
    100
}

fn default_heartbeat_interval_ms() -> u64 {
    30_000
}

fn default_heartbeat_timeout_ms() -> u64 {
    10_000
}

fn default_pull_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_pull_timeout_ms() -> u64 {
    10_000
}

fn default_max_items() -> usize {
    DEFAULT_MAX_ITEMS
}

fn default_fallback_delay_ms() -> u64 {
    3_000
}

fn default_topics() -> Vec<TopicConfig> {
    vec![
        TopicConfig::scalar("balance", 3_000),
        TopicConfig::collection("transactions", DEFAULT_MAX_ITEMS, 5_000),
    ]
}

impl Default for PushConfig {
    fn default() -> Self {
        PushConfig {
            url: default_push_url(),
            reconnect_max_retries: default_reconnect_max_retries(),
            reconnect_max_delay_secs: default_reconnect_max_delay_secs(),
            initial_delay_ms: default_initial_delay_ms(),
            heartbeat_interval_ms: default_heartbeat_interval_ms(),
            heartbeat_timeout_ms: default_heartbeat_timeout_ms(),
        }
    }
}

impl PushConfig {
    /// Connection manager settings derived from this section.
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            url: self.url.clone(),
            max_retries: self.reconnect_max_retries,
            max_delay_secs: self.reconnect_max_delay_secs,
            initial_delay_ms: self.initial_delay_ms,
        }
    }

    pub fn heartbeat_interval(&self) -> Option<Duration> {
        (self.heartbeat_interval_ms > 0).then(|| Duration::from_millis(self.heartbeat_interval_ms))
    }

    pub fn heartbeat_timeout(&self) -> Duration {
        Duration::from_millis(self.heartbeat_timeout_ms)
    }
}

impl Default for PullConfig {
    fn default() -> Self {
        PullConfig {
            base_url: default_pull_base_url(),
            timeout_ms: default_pull_timeout_ms(),
        }
    }
}

impl PullConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl TopicConfig {
    /// A scalar topic with the given fallback delay.
    pub fn scalar(name: impl Into<String>, fallback_delay_ms: u64) -> Self {
        TopicConfig {
            name: name.into(),
            kind: TopicKind::Scalar,
            max_items: default_max_items(),
            fallback_delay_ms,
        }
    }

    /// A collection topic with the given cap and fallback delay.
    pub fn collection(name: impl Into<String>, max_items: usize, fallback_delay_ms: u64) -> Self {
        TopicConfig {
            name: name.into(),
            kind: TopicKind::Collection,
            max_items,
            fallback_delay_ms,
        }
    }

    pub fn fallback_delay(&self) -> Duration {
        Duration::from_millis(self.fallback_delay_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            push: PushConfig::default(),
            pull: PullConfig::default(),
            topics: default_topics(),
        }
    }
}

impl Config {
    /// Loads and validates configuration from a TOML file.
    ///
    /// A missing file yields [`Config::default`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match fs::read_to_string(path) {
            Ok(content) => Self::from_toml(&content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Config::default()),
            Err(e) => Err(e.into()),
        }
    }

    /// Parses and validates configuration from TOML text.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks URLs and topic definitions.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = &self.push.url;
        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(ConfigError::Invalid(format!(
                "invalid push URL '{}': must be ws:// or wss://",
                url
            )));
        }

        let mut seen = HashSet::new();
        for topic in &self.topics {
            if topic.name.trim().is_empty() {
                return Err(ConfigError::Invalid("topic name cannot be empty".to_string()));
            }
            if !seen.insert(topic.name.as_str()) {
                return Err(ConfigError::Invalid(format!(
                    "duplicate topic '{}'",
                    topic.name
                )));
            }
            if topic.kind == TopicKind::Collection && topic.max_items == 0 {
                return Err(ConfigError::Invalid(format!(
                    "topic '{}': max_items must be at least 1",
                    topic.name
                )));
            }
        }
        Ok(())
    }

    /// Looks up a topic by name.
    pub fn topic(&self, name: &str) -> Option<&TopicConfig> {
        self.topics.iter().find(|t| t.name == name)
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
