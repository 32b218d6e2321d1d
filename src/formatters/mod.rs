use serde_json::{Map, Value};

/// Trait for formatting a selection of event fields to a single output line
pub trait RecordFormatter {
    fn format_record(&self, fields: &Map<String, Value>) -> String;
}

/// Plain string form of a field value, as used in logfmt and CSV cells.
pub fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        other => serde_json::to_string(other).unwrap_or_else(|_| "null".to_string()),
    }
}

pub mod logfmt;
