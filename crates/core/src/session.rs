// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Session signal types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of an authenticated user.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(String);

impl UserId {
    pub fn new(id: impl Into<String>) -> Self {
        UserId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UserId {
    fn from(s: &str) -> Self {
        UserId(s.to_string())
    }
}

/// Login/logout transitions emitted by the host application.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    LoggedIn(UserId),
    LoggedOut,
}

impl SessionEvent {
    pub fn logged_in(user: impl Into<String>) -> Self {
        SessionEvent::LoggedIn(UserId::new(user))
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
