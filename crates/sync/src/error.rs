// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the sync engine.

use thiserror::Error;

use crate::config::ConfigError;
use crate::pull::PullError;
use crate::transport::TransportError;

/// Errors surfaced by tally-sync setup and plumbing.
///
/// Runtime failures (transport drops, pull errors, malformed payloads) never
/// reach consumers through this type; they end up in a topic's `last_error`.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Core(#[from] tally_core::Error),

    #[error("transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("pull error: {0}")]
    Pull(#[from] PullError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("sync engine has stopped")]
    EngineStopped,
}

/// A specialized Result type for tally-sync operations.
pub type Result<T> = std::result::Result<T, Error>;
