use std::ops::Range;

use crate::error::{DecodeError, RecordError};
use crate::event::LogEvent;
use crate::pattern::compiler::ConversionPattern;
use crate::pattern::component::{PatternComponent, RenderedLogEvent, RenderedValue};

/// Spans of one conforming line, one per pattern component, in order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineMatch {
    spans: Vec<RenderedLogEvent>,
}

impl LineMatch {
    pub fn spans(&self) -> &[RenderedLogEvent] {
        &self.spans
    }

    /// Write every decoded field into `event`.
    pub fn inject_into(self, pattern: &ConversionPattern, event: &mut LogEvent) {
        for (component, span) in pattern.components().iter().zip(self.spans) {
            if let PatternComponent::Specifier(specifier) = component {
                specifier.inject(event, span.into_value());
            }
        }
    }
}

/// A record assembled from a conforming first line plus its continuation lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordMatch {
    pub event: LogEvent,
    /// Physical lines consumed, the first one included.
    pub consumed: usize,
}

/// A record opened by a conforming line that may still take continuation lines.
///
/// A line that conformed but failed to decode still opens a record, so the lines
/// that follow it stay attached to it and the error reports the whole raw text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenRecord {
    event: LogEvent,
    line_count: usize,
    error: Option<DecodeError>,
}

impl OpenRecord {
    pub fn line_number(&self) -> usize {
        self.event.line_number()
    }

    /// Physical lines in the record so far.
    pub fn line_count(&self) -> usize {
        self.line_count
    }

    /// Attach a continuation line: to the message when decoding succeeded, to the raw text only otherwise.
    pub fn append(&mut self, line: &str) {
        if self.error.is_some() {
            self.event.append_raw(line);
        } else {
            self.event.append_continuation(line);
        }
        self.line_count += 1;
    }

    pub fn complete(self) -> Result<LogEvent, RecordError> {
        match self.error {
            None => Ok(self.event),
            Some(source) => Err(RecordError {
                line_number: self.event.line_number(),
                line_count: self.line_count,
                raw: self.event.raw().unwrap_or_default().to_string(),
                source,
            }),
        }
    }
}

/// Replays a compiled pattern against log lines. Holds no state between calls.
#[derive(Debug, Clone, Copy)]
pub struct LineMatcher<'p> {
    pattern: &'p ConversionPattern,
}

impl<'p> LineMatcher<'p> {
    pub fn new(pattern: &'p ConversionPattern) -> Self {
        LineMatcher { pattern }
    }

    pub fn pattern(&self) -> &'p ConversionPattern {
        self.pattern
    }

    /// Walk the chain over `line`, returning the byte span of every component.
    /// `None` if a literal is out of place, an anchor is missing, or text is left over.
    pub fn locate(&self, line: &str) -> Option<Vec<Range<usize>>> {
        let components = self.pattern.components();
        let mut spans = Vec::with_capacity(components.len());
        let mut cursor = 0;

        for component in components {
            let span = match component {
                PatternComponent::Literal(literal) => {
                    let text = literal.text();
                    if !line[cursor..].starts_with(text) {
                        return None;
                    }
                    cursor..cursor + text.len()
                }
                PatternComponent::Specifier(specifier) => {
                    let next = specifier.next().and_then(|i| self.pattern.component(i));
                    specifier.locate_span(line, cursor, next)?
                }
            };
            cursor = span.end;
            spans.push(span);
        }

        if cursor != line.len() {
            return None;
        }
        Some(spans)
    }

    /// True when `line` structurally conforms to the pattern, i.e. starts a new record.
    pub fn is_record_start(&self, line: &str) -> bool {
        self.locate(line).is_some()
    }

    /// Match one physical line.
    ///
    /// `Ok(None)` means the line does not conform. `Err` means it conforms but a
    /// field failed to decode; the structural check always runs first.
    pub fn match_line(&self, line: &str) -> Result<Option<LineMatch>, DecodeError> {
        let Some(spans) = self.locate(line) else {
            tracing::trace!(line, "line does not match conversion pattern");
            return Ok(None);
        };

        let mut rendered = Vec::with_capacity(spans.len());
        for (component, span) in self.pattern.components().iter().zip(spans) {
            let text = &line[span.clone()];
            let value = match component {
                PatternComponent::Literal(_) => RenderedValue::None,
                PatternComponent::Specifier(specifier) => specifier.decode(text)?,
            };
            rendered.push(RenderedLogEvent::new(text, span.start, span.end, value));
        }
        Ok(Some(LineMatch { spans: rendered }))
    }

    /// Open a record at `line`, numbered `line_number`. `None` if the line does not conform.
    pub fn open_record(&self, line: &str, line_number: usize) -> Option<OpenRecord> {
        let mut event = LogEvent::new(line_number);
        let error = match self.match_line(line) {
            Ok(None) => return None,
            Ok(Some(line_match)) => {
                line_match.inject_into(self.pattern, &mut event);
                None
            }
            Err(e) => {
                tracing::debug!(line_number, error = %e, "record field failed to decode");
                Some(e)
            }
        };
        event.append_raw(line);
        Some(OpenRecord {
            event,
            line_count: 1,
            error,
        })
    }

    /// Match a record starting at `lines[0]`, numbered `line_number`.
    ///
    /// When the pattern ends with the message, following lines that do not start a
    /// record are appended to it. Raw text is collected before decoding is judged,
    /// so a decode failure still reports the complete raw record.
    pub fn match_record(&self, lines: &[&str], line_number: usize) -> Result<Option<RecordMatch>, RecordError> {
        let Some(first) = lines.first() else {
            return Ok(None);
        };
        let Some(mut record) = self.open_record(first, line_number) else {
            return Ok(None);
        };

        if self.pattern.is_continuable() {
            for line in lines[1..].iter().take_while(|line| !self.is_record_start(line)) {
                record.append(line);
            }
        }

        let consumed = record.line_count();
        let event = record.complete()?;
        Ok(Some(RecordMatch { event, consumed }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::level::Level;

    fn compile(template: &str) -> ConversionPattern {
        ConversionPattern::compile(template).unwrap()
    }

    #[test]
    fn test_simple_layout() {
        let pattern = compile("%-5p [%c] %t - %m");
        let matcher = LineMatcher::new(&pattern);
        let record = matcher
            .match_record(&["INFO  [com.example.Foo] main - started up"], 1)
            .unwrap()
            .unwrap();

        assert_eq!(record.consumed, 1);
        assert_eq!(record.event.level(), Some(Level::Info));
        assert_eq!(record.event.category(), Some("com.example.Foo"));
        assert_eq!(record.event.thread_name(), Some("main"));
        assert_eq!(record.event.message(), Some("started up"));
        assert_eq!(record.event.raw(), Some("INFO  [com.example.Foo] main - started up"));
    }

    #[test]
    fn test_spans_are_adjacent_and_cover_line() {
        let pattern = compile("%d %-5p [%c] %t - %m");
        let line = "2017-10-30 12:34:56,789 WARN  [a.b.C] worker-1 - careful - really";
        let m = LineMatcher::new(&pattern).match_line(line).unwrap().unwrap();

        let spans = m.spans();
        assert_eq!(spans.len(), pattern.components().len());
        assert_eq!(spans[0].start(), 0);
        for pair in spans.windows(2) {
            assert_eq!(pair[0].end(), pair[1].start());
        }
        assert_eq!(spans.last().unwrap().end(), line.len());
        assert_eq!(spans.last().unwrap().literal(), "careful - really");
    }

    #[test]
    fn test_literal_mismatch() {
        let pattern = compile("%p [%c] %m");
        let matcher = LineMatcher::new(&pattern);
        assert!(matcher.match_line("INFO com.example.Foo message").unwrap().is_none());
    }

    #[test]
    fn test_trailing_text_is_a_mismatch() {
        let pattern = compile("[%t]");
        let matcher = LineMatcher::new(&pattern);
        assert!(matcher.match_line("[main]").unwrap().is_some());
        assert!(matcher.match_line("[main] extra").unwrap().is_none());
    }

    #[test]
    fn test_line_separator_at_end() {
        let pattern = compile("%p %m%n");
        let m = LineMatcher::new(&pattern).match_line("INFO hello").unwrap().unwrap();
        assert_eq!(m.spans()[2].literal(), "hello");
        assert_eq!(m.spans()[3].start(), 10);
        assert_eq!(m.spans()[3].end(), 10);
    }

    #[test]
    fn test_decode_failure_is_distinct_from_no_match() {
        let pattern = compile("%p %m");
        let matcher = LineMatcher::new(&pattern);
        let err = matcher.match_line("LOUD hello").unwrap_err();
        assert_eq!(err, DecodeError::UnknownLevel("LOUD".to_string()));
        assert!(matcher.match_line("").unwrap().is_none());
    }

    #[test]
    fn test_multi_line_record() {
        let pattern = compile("%d %p %c - %m");
        let lines = [
            "2017-10-30 12:34:56,789 ERROR com.example.Foo - NPE at line 10",
            "    at com.example.Foo.bar(Foo.java:10)",
            "2017-10-30 12:34:57,000 INFO com.example.Foo - recovered",
        ];
        let record = LineMatcher::new(&pattern).match_record(&lines, 5).unwrap().unwrap();

        assert_eq!(record.consumed, 2);
        assert_eq!(record.event.line_number(), 5);
        assert_eq!(
            record.event.message(),
            Some("NPE at line 10\n    at com.example.Foo.bar(Foo.java:10)")
        );
        assert_eq!(record.event.raw(), Some(&lines[..2].join("\n")[..]));
    }

    #[test]
    fn test_non_continuable_pattern_consumes_one_line() {
        let pattern = compile("%p %m [%t]");
        let lines = ["INFO hello [main]", "stray line"];
        let record = LineMatcher::new(&pattern).match_record(&lines, 1).unwrap().unwrap();
        assert_eq!(record.consumed, 1);
        assert_eq!(record.event.message(), Some("hello"));
    }

    #[test]
    fn test_decode_failure_keeps_raw_record() {
        let pattern = compile("%p %m");
        let lines = ["LOUD first", "  continued", "INFO next"];
        let err = LineMatcher::new(&pattern).match_record(&lines, 3).unwrap_err();
        assert_eq!(err.line_number, 3);
        assert_eq!(err.line_count, 2);
        assert_eq!(err.raw, "LOUD first\n  continued");
        assert_eq!(err.source, DecodeError::UnknownLevel("LOUD".to_string()));
    }

    #[test]
    fn test_first_anchor_occurrence_wins() {
        // No retry at a later " - " once the first one is taken.
        let pattern = compile("%t - %c - %m");
        let m = LineMatcher::new(&pattern)
            .match_line("pool - 1 - a.B - msg")
            .unwrap()
            .unwrap();
        assert_eq!(m.spans()[0].literal(), "pool");
        assert_eq!(m.spans()[2].literal(), "1");
        assert_eq!(m.spans()[4].literal(), "a.B - msg");
    }

    #[test]
    fn test_adjacent_unbounded_specifiers_split_greedily() {
        // %c claims only non-whitespace characters; %t scans on from there.
        let pattern = compile("%c%t %m");
        assert_eq!(pattern.warnings().len(), 1);
        let matcher = LineMatcher::new(&pattern);

        let m = matcher.match_line("com.example.Foo main hello").unwrap();
        assert!(m.is_none(), "%c took the whole token, leaving nothing for %t");

        let pattern = compile("%.3c%t %m");
        let m = LineMatcher::new(&pattern).match_line("abcmain hello").unwrap().unwrap();
        assert_eq!(m.spans()[0].literal(), "abc");
        assert_eq!(m.spans()[1].literal(), "main");
    }

    #[test]
    fn test_padded_level_before_message() {
        let pattern = compile("%-5p%m");
        let record = LineMatcher::new(&pattern)
            .match_record(&["WARN disk almost full"], 1)
            .unwrap()
            .unwrap();
        assert_eq!(record.event.level(), Some(Level::Warn));
        assert_eq!(record.event.message(), Some("disk almost full"));
    }

    #[test]
    fn test_shared_across_threads() {
        let pattern = compile("%d{ABSOLUTE} [%t] %p - %m");
        let lines: Vec<String> = (0..8)
            .map(|i| format!("12:00:0{},000 [worker-{}] INFO - job {}", i, i, i))
            .collect();

        std::thread::scope(|scope| {
            for (i, line) in lines.iter().enumerate() {
                let pattern = &pattern;
                scope.spawn(move || {
                    let m = LineMatcher::new(pattern).match_line(line).unwrap().unwrap();
                    assert_eq!(m.spans()[2].literal(), format!("worker-{}", i));
                });
            }
        });
    }

    #[test]
    fn test_tab_indented_frame_continues_record() {
        let pattern = compile("%p %m");
        let lines = ["ERROR boom", "\tat com.example.Foo.bar(Foo.java:10)", "INFO next"];
        let record = LineMatcher::new(&pattern).match_record(&lines, 1).unwrap().unwrap();
        assert_eq!(record.consumed, 2);
        assert_eq!(record.event.message(), Some("boom\n\tat com.example.Foo.bar(Foo.java:10)"));
    }

    #[test]
    fn test_open_record_collects_lines() {
        let pattern = compile("%p %m");
        let matcher = LineMatcher::new(&pattern);
        assert!(matcher.open_record("  not a record", 1).is_none());

        let mut record = matcher.open_record("WARN low disk", 7).unwrap();
        record.append("  /var at 98%");
        assert_eq!(record.line_number(), 7);
        assert_eq!(record.line_count(), 2);
        let event = record.complete().unwrap();
        assert_eq!(event.message(), Some("low disk\n  /var at 98%"));
        assert_eq!(event.raw(), Some("WARN low disk\n  /var at 98%"));
    }

    #[test]
    fn test_empty_input() {
        let pattern = compile("%m");
        assert!(LineMatcher::new(&pattern).match_record(&[], 1).unwrap().is_none());
    }
}
