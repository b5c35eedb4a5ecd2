// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

use std::path::PathBuf;

use clap::Parser;

const AFTER_HELP: &str = "\
Once running, type commands on stdin:
  login <user>              Start a session for <user>
  refresh <topic> [json]    Reload a topic, optionally with new params
  show [topic]              Print one topic or all of them
  quit                      Stop syncing and exit";

/// tally: live account state from a push channel with HTTP fallback
#[derive(Parser, Debug)]
#[command(name = "tally", version)]
#[command(about = "Keep account balance and transactions in sync with a push server")]
#[command(after_help = AFTER_HELP)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, default_value = "tally.toml")]
    pub config: PathBuf,

    /// Log in as this user on startup
    #[arg(short, long)]
    pub user: Option<String>,

    /// Print every topic change as it happens
    #[arg(short, long)]
    pub watch: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

#[cfg(test)]
#[path = "cli_tests.rs"]
mod tests;
