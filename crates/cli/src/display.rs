// SPDX-License-Identifier: MIT
// Copyright (c) 2026 Alfred Jean LLC

//! Text rendering of topic views for the console.

use chrono::DateTime;
use serde_json::Value;
use tally_core::{Collection, Record, TopicData, TopicState, UserId};

use crate::colors;

const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Render one topic: a header line, then one line per record for collections.
pub fn topic(name: &str, state: &TopicState, color: bool) -> String {
    let mut out = match &state.data {
        TopicData::Scalar(value) => {
            let value = value.to_string();
            format!(
                "{}: {}",
                paint(colors::header, name, color),
                paint(colors::literal, &value, color)
            )
        }
        TopicData::Collection(records) => format!(
            "{}: {}",
            paint(colors::header, name, color),
            paint(colors::context, &count(records), color)
        ),
    };

    if state.is_loading {
        out.push(' ');
        out.push_str(&paint(colors::context, "[loading]", color));
    }
    if let Some(err) = &state.last_error {
        out.push(' ');
        out.push_str(&paint(colors::error, &format!("[error: {err}]"), color));
    }

    if let TopicData::Collection(records) = &state.data {
        for record in records.records() {
            out.push('\n');
            out.push_str(&record_line(record, color));
        }
    }
    out
}

/// Render connection and session status.
pub fn status(connection: &str, user: Option<&UserId>, color: bool) -> String {
    let user = user.map_or_else(|| "(logged out)".to_string(), |u| u.to_string());
    format!(
        "{} {}\n{} {}",
        paint(colors::header, "connection:", color),
        connection,
        paint(colors::header, "user:", color),
        user
    )
}

fn count(records: &Collection) -> String {
    let noun = if records.len() == 1 { "record" } else { "records" };
    format!("{} {noun} (max {})", records.len(), records.max_items())
}

fn record_line(record: &Record, color: bool) -> String {
    let mut line = format!(
        "  {}  {}",
        paint(colors::literal, &record.id, color),
        paint(colors::context, &format_timestamp(record.timestamp), color)
    );
    for (key, value) in &record.fields {
        line.push_str(&format!("  {key}={}", field_value(value)));
    }
    line
}

/// Formats epoch milliseconds as UTC, falling back to the raw number when
/// out of range.
pub fn format_timestamp(ms: i64) -> String {
    DateTime::from_timestamp_millis(ms)
        .map(|dt| dt.format(TIMESTAMP_FORMAT).to_string())
        .unwrap_or_else(|| ms.to_string())
}

fn field_value(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn paint(painter: fn(&str) -> String, text: &str, color: bool) -> String {
    if color {
        painter(text)
    } else {
        text.to_string()
    }
}

#[cfg(test)]
#[path = "display_tests.rs"]
mod tests;
