// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Line commands read from stdin.

use serde_json::Value;

use crate::error::{Error, Result};

pub const HELP: &str = "\
Commands:
  login <user>              Start a session for <user>
  logout                    End the current session
  refresh <topic> [json]    Reload a topic, optionally with new params
  show [topic]              Print one topic or all of them
  status                    Show connection and session status
  help                      Show this help
  quit                      Stop syncing and exit";

#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Login(String),
    Logout,
    Refresh { topic: String, params: Option<Value> },
    Show(Option<String>),
    Status,
    Help,
    Quit,
}

/// Parse one input line. Blank lines yield `None`.
pub fn parse(line: &str) -> Result<Option<ConsoleCommand>> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(None);
    }

    let (word, rest) = split_word(line);
    let command = match word {
        "login" => match split_word(rest) {
            ("", _) => return Err(missing("login", "<user>")),
            (user, "") => ConsoleCommand::Login(user.to_string()),
            _ => return Err(Error::Usage("login takes a single user id".to_string())),
        },
        "logout" => no_args("logout", rest, ConsoleCommand::Logout)?,
        "refresh" => {
            let (topic, json) = split_word(rest);
            if topic.is_empty() {
                return Err(missing("refresh", "<topic>"));
            }
            let params = if json.is_empty() {
                None
            } else {
                Some(
                    serde_json::from_str(json)
                        .map_err(|e| Error::Usage(format!("invalid params: {e}")))?,
                )
            };
            ConsoleCommand::Refresh {
                topic: topic.to_string(),
                params,
            }
        }
        "show" => match split_word(rest) {
            ("", _) => ConsoleCommand::Show(None),
            (topic, "") => ConsoleCommand::Show(Some(topic.to_string())),
            _ => return Err(Error::Usage("show takes at most one topic".to_string())),
        },
        "status" => no_args("status", rest, ConsoleCommand::Status)?,
        "help" | "?" => ConsoleCommand::Help,
        "quit" | "exit" => ConsoleCommand::Quit,
        other => return Err(Error::Usage(format!("unknown command '{other}'"))),
    };
    Ok(Some(command))
}

fn split_word(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim()),
        None => (s, ""),
    }
}

fn no_args(name: &str, rest: &str, command: ConsoleCommand) -> Result<ConsoleCommand> {
    if rest.is_empty() {
        Ok(command)
    } else {
        Err(Error::Usage(format!("{name} takes no arguments")))
    }
}

fn missing(name: &str, arg: &str) -> Error {
    Error::Usage(format!("{name}: missing {arg}"))
}

#[cfg(test)]
#[path = "console_tests.rs"]
mod tests;
