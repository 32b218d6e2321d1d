use crate::colors::ColorScheme;
use crate::formatters::{value_to_string, RecordFormatter};
use crate::level::Level;
use serde_json::{Map, Value};

/// Standard logfmt formatter with colored output
pub struct LogfmtFormatter {
    colors: ColorScheme,
}

impl LogfmtFormatter {
    pub fn new(use_colors: bool) -> Self {
        Self {
            colors: ColorScheme::new(use_colors),
        }
    }

    /// Format a single key=value pair with appropriate colors
    pub fn format_key_value_pair(&self, key: &str, value: &str) -> String {
        let colored_key = if self.colors.key.is_empty() {
            key.to_string()
        } else {
            format!("{}{}{}", self.colors.key, key, self.colors.reset)
        };

        let equals = if self.colors.equals.is_empty() {
            "=".to_string()
        } else {
            format!("{}={}", self.colors.equals, self.colors.reset)
        };

        format!("{}{}{}", colored_key, equals, self.format_value(key, value))
    }

    fn format_value(&self, key: &str, value: &str) -> String {
        let color = match key {
            "level" => Level::from_literal(value)
                .map(|level| self.colors.level(level))
                .unwrap_or(""),
            "timestamp" => self.colors.timestamp,
            "line" => self.colors.number,
            _ => self.colors.string,
        };

        let quoted_value = if self.needs_quoting(value) {
            format!("\"{}\"", self.escape(value))
        } else {
            value.to_string()
        };

        if color.is_empty() {
            quoted_value
        } else {
            format!("{}{}{}", color, quoted_value, self.colors.reset)
        }
    }

    fn needs_quoting(&self, value: &str) -> bool {
        value.is_empty()
            || value
                .chars()
                .any(|c| matches!(c, ' ' | '\t' | '\n' | '\r' | '"' | '=' | '\\'))
    }

    /// Escape backslashes, quotes and line breaks so a record stays on one line
    fn escape(&self, value: &str) -> String {
        let mut escaped = String::with_capacity(value.len());
        for c in value.chars() {
            match c {
                '\\' => escaped.push_str("\\\\"),
                '"' => escaped.push_str("\\\""),
                '\n' => escaped.push_str("\\n"),
                '\r' => escaped.push_str("\\r"),
                '\t' => escaped.push_str("\\t"),
                other => escaped.push(other),
            }
        }
        escaped
    }
}

impl RecordFormatter for LogfmtFormatter {
    fn format_record(&self, fields: &Map<String, Value>) -> String {
        fields
            .iter()
            .map(|(key, value)| self.format_key_value_pair(key, &value_to_string(value)))
            .collect::<Vec<_>>()
            .join(" ")
    }
}
