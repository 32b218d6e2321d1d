use chrono::NaiveDateTime;
use serde::Serialize;
use std::fmt;

use crate::level::Level;

/// Structured record built from one logical log entry (one or more physical lines).
///
/// Fields are only written through the setters below; a field whose specifier is
/// absent from the pattern stays `None`. Serialization keeps declaration order and
/// omits absent fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct LogEvent {
    #[serde(rename = "line")]
    line_number: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    timestamp: Option<NaiveDateTime>,
    #[serde(skip_serializing_if = "Option::is_none")]
    level: Option<Level>,
    #[serde(skip_serializing_if = "Option::is_none")]
    category: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    thread: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    raw: Option<String>,
}

impl LogEvent {
    /// Output field names, in serialization order.
    pub const FIELD_NAMES: &'static [&'static str] =
        &["line", "timestamp", "level", "category", "thread", "message", "raw"];

    pub fn new(line_number: usize) -> Self {
        LogEvent {
            line_number,
            ..Default::default()
        }
    }

    pub fn line_number(&self) -> usize {
        self.line_number
    }

    pub fn timestamp(&self) -> Option<NaiveDateTime> {
        self.timestamp
    }

    /// Milliseconds since the epoch, reading the timestamp as UTC.
    pub fn timestamp_millis(&self) -> Option<i64> {
        self.timestamp.map(|t| t.and_utc().timestamp_millis())
    }

    pub fn level(&self) -> Option<Level> {
        self.level
    }

    pub fn category(&self) -> Option<&str> {
        self.category.as_deref()
    }

    pub fn thread_name(&self) -> Option<&str> {
        self.thread.as_deref()
    }

    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    pub fn raw(&self) -> Option<&str> {
        self.raw.as_deref()
    }

    pub fn set_timestamp(&mut self, timestamp: NaiveDateTime) {
        self.timestamp = Some(timestamp);
    }

    pub fn set_level(&mut self, level: Level) {
        self.level = Some(level);
    }

    pub fn set_category(&mut self, category: impl Into<String>) {
        self.category = Some(category.into());
    }

    pub fn set_thread_name(&mut self, thread: impl Into<String>) {
        self.thread = Some(thread.into());
    }

    pub fn set_message(&mut self, message: impl Into<String>) {
        self.message = Some(message.into());
    }

    /// Append a physical line to the raw representation. The first line is
    /// stored as-is, later ones are joined with `\n`.
    pub fn append_raw(&mut self, line: &str) {
        match self.raw.as_mut() {
            Some(raw) => {
                raw.push('\n');
                raw.push_str(line);
            }
            None => self.raw = Some(line.to_string()),
        }
    }

    /// Attach a continuation line to both the message and the raw text.
    pub fn append_continuation(&mut self, line: &str) {
        match self.message.as_mut() {
            Some(message) => {
                message.push('\n');
                message.push_str(line);
            }
            None => self.message = Some(line.to_string()),
        }
        self.append_raw(line);
    }

    pub fn to_json(&self) -> serde_json::Value {
        // Plain struct of strings, numbers and a chrono value: serialization cannot fail.
        serde_json::to_value(self).unwrap_or(serde_json::Value::Null)
    }
}

impl fmt::Display for LogEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.line_number)?;
        match self.timestamp {
            Some(t) => write!(f, ", {}", t.format("%m/%d/%y %H:%M:%S,%3f"))?,
            None => write!(f, ", -")?,
        }
        match self.level {
            Some(level) => write!(f, ", {}", level)?,
            None => write!(f, ", -")?,
        }
        write!(
            f,
            ", {}, {}",
            self.category.as_deref().unwrap_or("-"),
            self.message.as_deref().unwrap_or("")
        )
    }
}
