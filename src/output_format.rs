use crate::error::ProcessingError;
use crate::event::LogEvent;
use crate::formatters::logfmt::LogfmtFormatter;
use crate::formatters::{value_to_string, RecordFormatter};
use crate::pattern::{ConversionPattern, SpecifierKind};
use serde_json::{Map, Value};
use std::io::Write;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    #[default]
    #[value(name = "jsonl", help = "JSON Lines format (one JSON object per event)")]
    Jsonl,
    #[value(name = "logfmt", help = "Logfmt format (key=value pairs)")]
    Logfmt,
    #[value(name = "csv", help = "Comma-separated values with a header row")]
    Csv,
    #[value(name = "raw", help = "The original text of each event")]
    Raw,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "jsonl" => Ok(OutputFormat::Jsonl),
            "logfmt" => Ok(OutputFormat::Logfmt),
            "csv" => Ok(OutputFormat::Csv),
            "raw" => Ok(OutputFormat::Raw),
            _ => Err(format!("Unknown output format: {}", s)),
        }
    }
}

/// Event field fed by a conversion specifier, if any.
pub fn field_name(kind: SpecifierKind) -> Option<&'static str> {
    match kind {
        SpecifierKind::Date => Some("timestamp"),
        SpecifierKind::Level => Some("level"),
        SpecifierKind::Category => Some("category"),
        SpecifierKind::Thread => Some("thread"),
        SpecifierKind::Message => Some("message"),
        SpecifierKind::LineSeparator => None,
    }
}

/// Columns an event parsed with `pattern` can carry, in output order.
pub fn default_columns(pattern: &ConversionPattern) -> Vec<String> {
    LogEvent::FIELD_NAMES
        .iter()
        .filter(|name| match **name {
            "line" | "raw" => true,
            name => pattern
                .specifiers()
                .any(|s| field_name(s.kind()) == Some(name)),
        })
        .map(|name| name.to_string())
        .collect()
}

pub struct OutputFormatter {
    format: OutputFormat,
    keys: Option<Vec<String>>,
    csv_headers_written: bool,
    use_colors: bool,
}

impl OutputFormatter {
    pub fn new(format: OutputFormat, keys: Option<Vec<String>>) -> Self {
        Self::new_with_colors(format, keys, false)
    }

    pub fn new_with_colors(format: OutputFormat, keys: Option<Vec<String>>, use_colors: bool) -> Self {
        OutputFormatter {
            format,
            keys,
            csv_headers_written: false,
            use_colors,
        }
    }

    /// Event fields restricted to `--keys`, in the order given there.
    fn select_fields(&self, event: &LogEvent) -> Map<String, Value> {
        let Value::Object(obj) = event.to_json() else {
            return Map::new();
        };
        match &self.keys {
            Some(key_list) => {
                let mut filtered = Map::new();
                for key in key_list {
                    if let Some(value) = obj.get(key) {
                        filtered.insert(key.clone(), value.clone());
                    }
                }
                filtered
            }
            None => obj,
        }
    }

    pub fn write_event<W: Write>(&mut self, output: &mut W, event: &LogEvent) -> Result<(), ProcessingError> {
        match self.format {
            OutputFormat::Jsonl => self.write_jsonl(output, event),
            OutputFormat::Logfmt => self.write_logfmt(output, event),
            OutputFormat::Csv => self.write_csv(output, event),
            OutputFormat::Raw => self.write_raw(output, event),
        }
    }

    fn write_jsonl<W: Write>(&mut self, output: &mut W, event: &LogEvent) -> Result<(), ProcessingError> {
        let json_line = if self.keys.is_some() {
            serde_json::to_string(&self.select_fields(event))?
        } else {
            serde_json::to_string(event)?
        };
        writeln!(output, "{}", json_line)?;
        Ok(())
    }

    fn write_logfmt<W: Write>(&mut self, output: &mut W, event: &LogEvent) -> Result<(), ProcessingError> {
        let formatter = LogfmtFormatter::new(self.use_colors);
        writeln!(output, "{}", formatter.format_record(&self.select_fields(event)))?;
        Ok(())
    }

    fn write_csv<W: Write>(&mut self, output: &mut W, event: &LogEvent) -> Result<(), ProcessingError> {
        let fields = self.select_fields(event);
        let columns: Vec<String> = match &self.keys {
            Some(key_list) => key_list.clone(),
            None => fields.keys().cloned().collect(),
        };

        let mut writer = csv::WriterBuilder::new().from_writer(&mut *output);
        if !self.csv_headers_written {
            writer.write_record(&columns)?;
            self.csv_headers_written = true;
        }
        // Missing keys become empty cells
        writer.write_record(
            columns
                .iter()
                .map(|key| fields.get(key).map(value_to_string).unwrap_or_default()),
        )?;
        writer.flush()?;
        Ok(())
    }

    fn write_raw<W: Write>(&mut self, output: &mut W, event: &LogEvent) -> Result<(), ProcessingError> {
        writeln!(output, "{}", event.raw().unwrap_or_default())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    fn event() -> LogEvent {
        let mut event = LogEvent::new(4);
        event.set_level(Level::Warn);
        event.set_thread_name("main");
        event.set_message("low disk, 5% left");
        event.append_raw("WARN [main] low disk, 5% left");
        event
    }

    fn render(formatter: &mut OutputFormatter, events: &[LogEvent]) -> String {
        let mut out = Vec::new();
        for e in events {
            formatter.write_event(&mut out, e).unwrap();
        }
        String::from_utf8(out).unwrap()
    }

    #[test]
    fn test_jsonl() {
        let mut formatter = OutputFormatter::new(OutputFormat::Jsonl, None);
        assert_eq!(
            render(&mut formatter, &[event()]),
            "{\"line\":4,\"level\":\"WARN\",\"thread\":\"main\",\"message\":\"low disk, 5% left\",\"raw\":\"WARN [main] low disk, 5% left\"}\n"
        );
    }

    #[test]
    fn test_jsonl_keys_order() {
        let keys = vec!["message".to_string(), "line".to_string(), "category".to_string()];
        let mut formatter = OutputFormatter::new(OutputFormat::Jsonl, Some(keys));
        assert_eq!(
            render(&mut formatter, &[event()]),
            "{\"message\":\"low disk, 5% left\",\"line\":4}\n"
        );
    }

    #[test]
    fn test_csv_header_once_and_missing_cells() {
        let keys = vec!["line".to_string(), "category".to_string(), "message".to_string()];
        let mut formatter = OutputFormatter::new(OutputFormat::Csv, Some(keys));
        let out = render(&mut formatter, &[event(), event()]);
        assert_eq!(
            out,
            "line,category,message\n4,,\"low disk, 5% left\"\n4,,\"low disk, 5% left\"\n"
        );
    }

    #[test]
    fn test_logfmt() {
        let keys = vec!["level".to_string(), "thread".to_string()];
        let mut formatter = OutputFormatter::new(OutputFormat::Logfmt, Some(keys));
        assert_eq!(render(&mut formatter, &[event()]), "level=WARN thread=main\n");
    }

    #[test]
    fn test_raw() {
        let mut formatter = OutputFormatter::new(OutputFormat::Raw, None);
        assert_eq!(render(&mut formatter, &[event()]), "WARN [main] low disk, 5% left\n");
    }

    #[test]
    fn test_default_columns() {
        let pattern = ConversionPattern::compile("%d [%t] %p - %m%n").unwrap();
        assert_eq!(
            default_columns(&pattern),
            vec!["line", "timestamp", "level", "thread", "message", "raw"]
        );
    }

    #[test]
    fn test_parse_format_name() {
        assert_eq!("LOGFMT".parse::<OutputFormat>(), Ok(OutputFormat::Logfmt));
        assert!("yaml".parse::<OutputFormat>().is_err());
    }
}
