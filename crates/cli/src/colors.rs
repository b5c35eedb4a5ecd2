// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Terminal color utilities for console output.
//!
//! Respects environment variables:
//! - `NO_COLOR=1`: Disables colors
//! - `COLOR=1`: Forces colors even without TTY

use std::io::IsTerminal;

/// ANSI 256-color codes.
pub mod codes {
    /// Topic names and section headers: pastel cyan/steel blue
    pub const HEADER: u8 = 74;
    /// Values and commands: light grey
    pub const LITERAL: u8 = 250;
    /// Status flags, timestamps and placeholders: medium grey
    pub const CONTEXT: u8 = 245;
    /// Errors: soft red
    pub const ERROR: u8 = 167;
}

/// Check if colors should be enabled based on TTY and environment variables.
pub fn should_colorize() -> bool {
    if std::env::var("NO_COLOR").is_ok_and(|v| v == "1") {
        return false;
    }

    if std::env::var("COLOR").is_ok_and(|v| v == "1") {
        return true;
    }

    std::io::stdout().is_terminal()
}

/// Format a 256-color ANSI escape sequence for foreground color.
fn fg256(code: u8) -> String {
    format!("\x1b[38;5;{code}m")
}

const RESET: &str = "\x1b[0m";

fn paint(code: u8, text: &str) -> String {
    format!("{}{}{}", fg256(code), text, RESET)
}

/// Apply header color to text.
pub fn header(text: &str) -> String {
    paint(codes::HEADER, text)
}

/// Apply literal color to text.
pub fn literal(text: &str) -> String {
    paint(codes::LITERAL, text)
}

/// Apply context color to text.
pub fn context(text: &str) -> String {
    paint(codes::CONTEXT, text)
}

/// Apply error color to text.
pub fn error(text: &str) -> String {
    paint(codes::ERROR, text)
}

/// Colorize a help block.
///
/// Expects format like:
/// ```text
/// Commands:
///   login <user>    Start a session
/// ```
///
/// Lines ending with `:` become headers; the command part of an indented
/// `command    description` line is colored as a literal, with `<...>` and
/// `[...]` placeholders as context.
pub fn examples(text: &str, color: bool) -> String {
    if !color {
        return text.to_string();
    }

    let mut result = String::with_capacity(text.len() + 256);

    for line in text.lines() {
        if !result.is_empty() {
            result.push('\n');
        }

        let trimmed = line.trim_start();
        let indent = &line[..line.len() - trimmed.len()];

        if trimmed.ends_with(':') && !trimmed.contains("  ") {
            result.push_str(indent);
            result.push_str(&header(trimmed));
            continue;
        }

        if let Some(cmd_end) = find_description_start(trimmed) {
            result.push_str(indent);
            result.push_str(&colorize_command(&trimmed[..cmd_end]));
            result.push_str(&trimmed[cmd_end..]);
            continue;
        }

        result.push_str(line);
    }

    result
}

/// Colorize a command string, highlighting placeholders as context.
pub fn colorize_command(cmd: &str) -> String {
    cmd.split(' ')
        .map(|word| {
            if word.is_empty() {
                String::new()
            } else if is_placeholder(word) {
                context(word)
            } else {
                literal(word)
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn is_placeholder(word: &str) -> bool {
    (word.starts_with('<') && word.ends_with('>')) || (word.starts_with('[') && word.ends_with(']'))
}

/// Find where the description starts (after 2+ spaces following the command).
pub fn find_description_start(line: &str) -> Option<usize> {
    let bytes = line.as_bytes();
    let mut in_spaces = false;
    let mut space_start = 0;

    for (i, &b) in bytes.iter().enumerate() {
        if b == b' ' {
            if !in_spaces {
                in_spaces = true;
                space_start = i;
            }
        } else {
            if in_spaces && i - space_start >= 2 {
                return Some(space_start);
            }
            in_spaces = false;
        }
    }

    None
}

#[cfg(test)]
#[path = "colors_tests.rs"]
mod tests;
