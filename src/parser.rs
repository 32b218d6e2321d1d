use std::io::{BufRead, Result as IoResult};
use std::sync::Arc;

use crate::config::ParserConfig;
use crate::error::ParseError;
use crate::event::LogEvent;
use crate::pattern::{ConversionPattern, LineMatcher, OpenRecord};

/// Assembles physical lines into log events, one line at a time.
///
/// Lines are numbered from 1. When the pattern ends with the message, a record is
/// held back until the next conforming line (or `flush`) since any line in between
/// may continue it. Otherwise every conforming line is a complete record.
pub struct EventParser {
    pattern: Arc<ConversionPattern>,
    config: ParserConfig,
    pending: Option<OpenRecord>,
    line_number: usize,
    continuation_lines: usize,
}

impl EventParser {
    pub fn new(pattern: Arc<ConversionPattern>, config: ParserConfig) -> Self {
        Self {
            pattern,
            config,
            pending: None,
            line_number: 0,
            continuation_lines: 0,
        }
    }

    /// Physical lines seen so far.
    pub fn lines_read(&self) -> usize {
        self.line_number
    }

    /// Lines that were attached to an earlier record instead of starting one.
    pub fn continuation_lines(&self) -> usize {
        self.continuation_lines
    }

    /// Feed the next physical line, without its terminator. A trailing `\r` is ignored.
    ///
    /// Returns a completed record or a problem report, if this line produced one.
    pub fn add_line(&mut self, line: &str) -> Option<Result<LogEvent, ParseError>> {
        self.line_number += 1;
        let line = line.strip_suffix('\r').unwrap_or(line);

        if line.len() > self.config.max_line_length {
            return Some(Err(ParseError::LineTooLong {
                line_number: self.line_number,
                length: line.len(),
                max_length: self.config.max_line_length,
            }));
        }

        let Some(record) = LineMatcher::new(&self.pattern).open_record(line, self.line_number) else {
            return self.continue_record(line);
        };

        if !self.pattern.is_continuable() {
            return Some(complete(record));
        }

        tracing::trace!(line_number = self.line_number, "record opened");
        self.pending.replace(record).map(complete)
    }

    fn continue_record(&mut self, line: &str) -> Option<Result<LogEvent, ParseError>> {
        match self.pending.as_mut() {
            Some(record) => {
                record.append(line);
                self.continuation_lines += 1;
                tracing::trace!(line_number = self.line_number, "continuation line");
                None
            }
            None => {
                tracing::debug!(line_number = self.line_number, "line does not match pattern");
                Some(Err(ParseError::NoMatch {
                    line_number: self.line_number,
                    line: line.to_string(),
                }))
            }
        }
    }

    /// Complete the pending record at end of input.
    pub fn flush(&mut self) -> Option<Result<LogEvent, ParseError>> {
        self.pending.take().map(complete)
    }
}

fn complete(record: OpenRecord) -> Result<LogEvent, ParseError> {
    record.complete().map_err(ParseError::from)
}

/// Parse a whole reader. I/O errors abort; parse problems are returned in line order.
pub fn parse_events<R: BufRead>(
    reader: R,
    pattern: Arc<ConversionPattern>,
    config: ParserConfig,
) -> IoResult<Vec<Result<LogEvent, ParseError>>> {
    let mut parser = EventParser::new(pattern, config);
    let mut results = Vec::new();

    for line_result in reader.lines() {
        let line = line_result?;
        if let Some(result) = parser.add_line(&line) {
            results.push(result);
        }
    }

    if let Some(result) = parser.flush() {
        results.push(result);
    }

    Ok(results)
}
