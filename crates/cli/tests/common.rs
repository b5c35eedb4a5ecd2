// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

#![allow(dead_code)]
#![allow(unused_imports)]

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;

pub use predicates::prelude::*;
pub use tempfile::TempDir;

/// A config whose push channel and pull endpoint are never reachable.
pub const OFFLINE_CONFIG: &str = r#"
[push]
url = "ws://127.0.0.1:9"
reconnect_max_retries = 1

[pull]
base_url = "http://127.0.0.1:9"
timeout_ms = 200

[[topics]]
name = "balance"
kind = "scalar"
fallback_delay_ms = 100

[[topics]]
name = "transactions"
kind = "collection"
max_items = 20
fallback_delay_ms = 100
"#;

pub fn tally() -> Command {
    let mut cmd = cargo_bin_cmd!("tally");
    cmd.env("NO_COLOR", "1").env_remove("COLOR").env_remove("RUST_LOG");
    cmd
}

/// Temp directory holding `tally.toml` with `content`.
pub fn config_dir(content: &str) -> TempDir {
    let temp = TempDir::new().unwrap();
    std::fs::write(temp.path().join("tally.toml"), content).unwrap();
    temp
}
