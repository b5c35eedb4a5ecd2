// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use thiserror::Error;

/// Errors surfaced by the `tally` front-end.
#[derive(Debug, Error)]
pub enum Error {
    #[error("config error: {0}\n  hint: check the file passed with --config")]
    Config(#[from] tally_sync::ConfigError),

    #[error(transparent)]
    Sync(#[from] tally_sync::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("unknown topic: {0}\n  hint: run 'show' to list configured topics")]
    UnknownTopic(String),

    #[error("{0}\n  hint: type 'help' for the list of commands")]
    Usage(String),
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
