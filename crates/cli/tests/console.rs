// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

mod common;
use common::*;

#[test]
fn help_lists_console_commands() {
    tally()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--config"))
        .stdout(predicate::str::contains("refresh <topic> [json]"));
}

#[test]
fn show_prints_configured_topics() {
    let temp = config_dir(OFFLINE_CONFIG);
    tally()
        .current_dir(temp.path())
        .write_stdin("show\nquit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("balance: 0"))
        .stdout(predicate::str::contains("transactions: 0 records (max 20)"));
}

#[test]
fn end_of_input_exits_cleanly() {
    let temp = config_dir(OFFLINE_CONFIG);
    tally()
        .current_dir(temp.path())
        .write_stdin("status\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("user: (logged out)"));
}

#[test]
fn bad_commands_are_reported_and_skipped() {
    let temp = config_dir(OFFLINE_CONFIG);
    tally()
        .current_dir(temp.path())
        .write_stdin("frobnicate\nshow stocks\nshow balance\nquit\n")
        .assert()
        .success()
        .stderr(predicate::str::contains("unknown command 'frobnicate'"))
        .stderr(predicate::str::contains("unknown topic: stocks"))
        .stdout(predicate::str::contains("balance: 0"));
}

#[test]
fn missing_config_file_uses_defaults() {
    let temp = TempDir::new().unwrap();
    tally()
        .current_dir(temp.path())
        .args(["--config", "absent.toml"])
        .write_stdin("show\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("transactions: 0 records (max 50)"));
}

#[test]
fn invalid_config_is_rejected() {
    let temp = config_dir("[push]\nurl = \"http://example.com\"\n");
    tally()
        .current_dir(temp.path())
        .write_stdin("quit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("must be ws:// or wss://"));
}

#[test]
fn login_at_startup_then_logout_exits_cleanly() {
    let temp = config_dir(OFFLINE_CONFIG);
    tally()
        .current_dir(temp.path())
        .args(["--user", "alice"])
        .write_stdin("logout\nquit\n")
        .assert()
        .success();
}
