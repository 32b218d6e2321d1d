use indexmap::IndexMap;
use std::fmt;
use std::io::{BufRead, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{ErrorStrategy, ParserConfig};
use crate::error::{ParseError, ProcessingError};
use crate::event::LogEvent;
use crate::output_format::OutputFormatter;
use crate::parser::EventParser;
use crate::pattern::ConversionPattern;

/// Parse error details for deferred reporting
#[derive(Debug, Clone)]
pub struct ParseErrorInfo {
    pub line_number: usize,
    pub error: String,
}

/// Runtime statistics
#[derive(Debug, Default, Clone)]
pub struct ProcessingStats {
    pub lines_read: usize,
    pub records_output: usize,
    pub continuation_lines: usize,
    pub errors: usize,
    pub processing_time: Duration,
    pub parse_errors: Vec<ParseErrorInfo>,
    pub earliest_timestamp: Option<i64>,
    pub latest_timestamp: Option<i64>,
    /// Events per level, in order of first appearance
    pub levels_seen: IndexMap<String, usize>,
}

impl ProcessingStats {
    fn update_with_event(&mut self, event: &LogEvent) {
        self.records_output += 1;
        if let Some(millis) = event.timestamp_millis() {
            self.earliest_timestamp = Some(self.earliest_timestamp.map_or(millis, |t| t.min(millis)));
            self.latest_timestamp = Some(self.latest_timestamp.map_or(millis, |t| t.max(millis)));
        }
        if let Some(level) = event.level() {
            *self.levels_seen.entry(level.to_string()).or_insert(0) += 1;
        }
    }

    fn record_error(&mut self, error: &ParseError) {
        self.errors += 1;
        self.parse_errors.push(ParseErrorInfo {
            line_number: error.line_number(),
            error: error.to_string(),
        });
    }

    /// Time covered by the parsed events, when at least one carried a timestamp.
    pub fn time_span(&self) -> Option<Duration> {
        let (earliest, latest) = (self.earliest_timestamp?, self.latest_timestamp?);
        u64::try_from(latest - earliest).ok().map(Duration::from_millis)
    }
}

impl fmt::Display for ProcessingStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Lines read: {}", self.lines_read)?;
        writeln!(f, "Events: {}", self.records_output)?;
        writeln!(f, "Continuation lines: {}", self.continuation_lines)?;
        writeln!(f, "Errors: {}", self.errors)?;
        if !self.levels_seen.is_empty() {
            let levels: Vec<String> = self
                .levels_seen
                .iter()
                .map(|(level, count)| format!("{}={}", level, count))
                .collect();
            writeln!(f, "Levels: {}", levels.join(" "))?;
        }
        if let Some(span) = self.time_span() {
            writeln!(f, "Time span: {}", humantime::format_duration(span))?;
        }
        let elapsed = Duration::from_millis(self.processing_time.as_millis() as u64);
        write!(f, "Processing time: {}", humantime::format_duration(elapsed))
    }
}

/// Drives a line stream through an `EventParser` into an `OutputFormatter`.
pub struct LogProcessor {
    pattern: Arc<ConversionPattern>,
    config: ParserConfig,
    formatter: OutputFormatter,
}

impl LogProcessor {
    pub fn new(pattern: Arc<ConversionPattern>, config: ParserConfig, formatter: OutputFormatter) -> Self {
        Self {
            pattern,
            config,
            formatter,
        }
    }

    /// Process a whole stream. Under `ErrorStrategy::FailFast` the first parse
    /// problem is returned as an error; otherwise problems are counted in the stats.
    pub fn process_stream<R: BufRead, W: Write>(
        &mut self,
        reader: R,
        output: &mut W,
    ) -> Result<ProcessingStats, ProcessingError> {
        let start = Instant::now();
        let mut stats = ProcessingStats::default();
        let mut parser = EventParser::new(Arc::clone(&self.pattern), self.config.clone());

        for line_result in reader.lines() {
            let line = line_result?;
            if let Some(result) = parser.add_line(&line) {
                self.handle_result(result, output, &mut stats)?;
            }
        }
        if let Some(result) = parser.flush() {
            self.handle_result(result, output, &mut stats)?;
        }
        output.flush()?;

        stats.lines_read = parser.lines_read();
        stats.continuation_lines = parser.continuation_lines();
        stats.processing_time = start.elapsed();
        tracing::debug!(
            lines = stats.lines_read,
            events = stats.records_output,
            errors = stats.errors,
            "stream processed"
        );
        Ok(stats)
    }

    fn handle_result<W: Write>(
        &mut self,
        result: Result<LogEvent, ParseError>,
        output: &mut W,
        stats: &mut ProcessingStats,
    ) -> Result<(), ProcessingError> {
        match result {
            Ok(event) => {
                self.formatter.write_event(output, &event)?;
                stats.update_with_event(&event);
            }
            Err(error) => match self.config.error_strategy {
                ErrorStrategy::FailFast => return Err(ProcessingError::ParseError(error)),
                ErrorStrategy::Skip => {
                    tracing::debug!(line_number = error.line_number(), "skipping: {}", error);
                    stats.record_error(&error);
                }
            },
        }
        Ok(())
    }
}
