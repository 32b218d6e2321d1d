use std::ops::Range;

use crate::error::{CompileError, DecodeError};
use crate::event::LogEvent;
use crate::level::Level;
use crate::pattern::component::{AddResult, PatternComponent, RenderedValue};
use crate::pattern::date_format::DateFormat;
use crate::pattern::modifier::FormatModifier;

/// The closed set of conversion characters the matcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SpecifierKind {
    /// `%d{format}`: timestamp.
    Date,
    /// `%p`: severity level.
    Level,
    /// `%c{N}`: logger category.
    Category,
    /// `%t`: thread name.
    Thread,
    /// `%m`: message, the rest of the record.
    Message,
    /// `%n`: end of the physical line.
    LineSeparator,
}

impl SpecifierKind {
    pub const ALL: &'static [SpecifierKind] = &[
        SpecifierKind::Date,
        SpecifierKind::Level,
        SpecifierKind::Category,
        SpecifierKind::Thread,
        SpecifierKind::Message,
        SpecifierKind::LineSeparator,
    ];

    pub fn from_conversion_character(c: char) -> Option<SpecifierKind> {
        SpecifierKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.conversion_character() == c)
    }

    pub fn conversion_character(&self) -> char {
        match self {
            SpecifierKind::Date => 'd',
            SpecifierKind::Level => 'p',
            SpecifierKind::Category => 'c',
            SpecifierKind::Thread => 't',
            SpecifierKind::Message => 'm',
            SpecifierKind::LineSeparator => 'n',
        }
    }

    /// Whether a `{...}` argument may follow the conversion character.
    pub fn accepts_argument(&self) -> bool {
        matches!(self, SpecifierKind::Date | SpecifierKind::Category)
    }

    pub fn accepts_modifier(&self) -> bool {
        !matches!(self, SpecifierKind::LineSeparator)
    }

    /// Self-delimiting kinds find their own end regardless of what follows them.
    pub fn is_self_delimiting(&self) -> bool {
        matches!(self, SpecifierKind::Date | SpecifierKind::LineSeparator)
    }

    pub fn validate_modifier(&self, modifier: &FormatModifier) -> Result<(), String> {
        if !self.accepts_modifier() {
            return Err(format!("'%{}' does not take a format modifier", self.conversion_character()));
        }
        if *self == SpecifierKind::Date && modifier.max_width().is_some() {
            return Err("a truncated date cannot be parsed back".to_string());
        }
        Ok(())
    }

    /// Byte length of the longest prefix of `s` made of characters legal for this kind.
    fn content_class_len(&self, s: &str) -> usize {
        let end = match self {
            SpecifierKind::Message => return s.len(),
            SpecifierKind::Level => s.find(|c: char| !c.is_ascii_alphabetic()),
            SpecifierKind::Category | SpecifierKind::Thread => s.find(char::is_whitespace),
            SpecifierKind::Date | SpecifierKind::LineSeparator => Some(0),
        };
        end.unwrap_or(s.len())
    }

    fn allows_empty(&self) -> bool {
        matches!(self, SpecifierKind::Message | SpecifierKind::LineSeparator)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BuildState {
    Open,
    InArgument,
    Closed,
}

/// One `%`-introduced placeholder of a compiled pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConversionSpecifier {
    kind: SpecifierKind,
    modifier: Option<FormatModifier>,
    argument: Option<String>,
    date_format: Option<DateFormat>,
    category_segments: Option<usize>,
    state: BuildState,
    next: Option<usize>,
}

impl ConversionSpecifier {
    /// Create an open specifier. Offsets in errors are relative to the modifier text.
    pub fn new(kind: SpecifierKind, modifier: Option<FormatModifier>) -> Result<Self, CompileError> {
        if let Some(m) = &modifier {
            kind.validate_modifier(m)
                .map_err(|reason| CompileError::InvalidModifier {
                    character: kind.conversion_character(),
                    modifier: m.render(),
                    offset: 0,
                    reason,
                })?;
        }
        Ok(ConversionSpecifier {
            kind,
            modifier,
            argument: None,
            date_format: None,
            category_segments: None,
            state: BuildState::Open,
            next: None,
        })
    }

    pub fn kind(&self) -> SpecifierKind {
        self.kind
    }

    pub fn conversion_character(&self) -> char {
        self.kind.conversion_character()
    }

    pub fn modifier(&self) -> Option<&FormatModifier> {
        self.modifier.as_ref()
    }

    pub fn argument(&self) -> Option<&str> {
        self.argument.as_deref()
    }

    pub fn date_format(&self) -> Option<&DateFormat> {
        self.date_format.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.state == BuildState::Closed
    }

    /// Index of the following component in the owning pattern.
    pub fn next(&self) -> Option<usize> {
        self.next
    }

    pub(crate) fn set_next(&mut self, next: Option<usize>) {
        self.next = next;
    }

    /// Feed the next template character. Offsets in errors are relative to that character.
    pub fn add(&mut self, c: char) -> Result<AddResult, CompileError> {
        match self.state {
            BuildState::Closed => Err(CompileError::ClosedComponent { character: c }),
            BuildState::Open => {
                if c == '{' && self.kind.accepts_argument() {
                    self.state = BuildState::InArgument;
                    self.argument = Some(String::new());
                    Ok(AddResult::Accepted)
                } else {
                    self.close()?;
                    Ok(AddResult::NotAccepted)
                }
            }
            BuildState::InArgument => {
                if c == '}' {
                    self.close()?;
                    Ok(AddResult::AcceptedAndClosed)
                } else {
                    if let Some(argument) = self.argument.as_mut() {
                        argument.push(c);
                    }
                    Ok(AddResult::Accepted)
                }
            }
        }
    }

    /// Close at end of template. Fails if a `{` argument is still open.
    pub fn finish(&mut self) -> Result<(), CompileError> {
        match self.state {
            BuildState::Closed => Ok(()),
            BuildState::Open => self.close(),
            BuildState::InArgument => Err(CompileError::MalformedTemplate {
                offset: 0,
                message: "unmatched '{'".to_string(),
            }),
        }
    }

    fn close(&mut self) -> Result<(), CompileError> {
        self.state = BuildState::Closed;
        let malformed = |message: String| CompileError::MalformedTemplate { offset: 0, message };

        if let Some(argument) = self.argument.as_deref() {
            if argument.is_empty() {
                return Err(malformed(format!(
                    "'%{}' requires an argument between braces",
                    self.conversion_character()
                )));
            }
        }

        match self.kind {
            SpecifierKind::Date => {
                self.date_format = Some(DateFormat::from_argument(self.argument.as_deref()).map_err(malformed)?);
            }
            SpecifierKind::Category => {
                if let Some(argument) = self.argument.as_deref() {
                    let segments = argument
                        .parse::<usize>()
                        .ok()
                        .filter(|n| *n > 0)
                        .ok_or_else(|| malformed(format!("invalid category precision \"{}\"", argument)))?;
                    self.category_segments = Some(segments);
                }
            }
            _ => {}
        }
        Ok(())
    }

    /// Template form: `%`, modifier, conversion character, optional `{argument}`.
    pub fn pattern_literal(&self) -> String {
        let mut s = String::from("%");
        if let Some(m) = &self.modifier {
            s.push_str(&m.render());
        }
        s.push(self.conversion_character());
        if let Some(argument) = &self.argument {
            s.push('{');
            s.push_str(argument);
            s.push('}');
        }
        s
    }

    /// Find where this specifier's span ends when it starts at byte offset `from`.
    ///
    /// Self-delimiting kinds scan their own content. Otherwise a following literal is
    /// searched for (first occurrence wins), the end of the line bounds the last
    /// component, and a following specifier leaves the content class to decide.
    /// Anchored spans must still fit the content class.
    /// Returns `None` when the line cannot conform at this point.
    pub fn locate_span(&self, line: &str, from: usize, next: Option<&PatternComponent>) -> Option<Range<usize>> {
        let rest = line.get(from..)?;
        let len = match self.kind {
            SpecifierKind::LineSeparator => {
                if !rest.is_empty() {
                    return None;
                }
                0
            }
            SpecifierKind::Date => self.date_span_len(rest)?,
            _ => match next {
                Some(PatternComponent::Literal(literal)) => {
                    let padded = self.min_width_len(rest)?;
                    let len = padded + rest[padded..].find(literal.text())?;
                    self.check_content_class(&rest[..len])?
                }
                None => self.check_content_class(rest)?,
                Some(PatternComponent::Specifier(_)) => self.bounded_span_len(rest),
            },
        };

        if len == 0 && !self.kind.allows_empty() {
            return None;
        }
        Some(from..from + len)
    }

    /// Length of `span` if, once padding is trimmed, it holds a legal value for this kind.
    fn check_content_class(&self, span: &str) -> Option<usize> {
        let body = match &self.modifier {
            Some(m) => m.trim_padding(span),
            None => span,
        };
        if body.is_empty() && !self.kind.allows_empty() {
            return None;
        }
        (self.kind.content_class_len(body) == body.len()).then_some(span.len())
    }

    /// Byte length of the first `min_width` characters, which a padded span always covers.
    /// `None` if the line is shorter than that.
    fn min_width_len(&self, rest: &str) -> Option<usize> {
        let Some(min) = self.modifier.and_then(|m| m.min_width()) else {
            return Some(0);
        };
        match rest.char_indices().nth(min) {
            Some((idx, _)) => Some(idx),
            None if rest.chars().count() == min => Some(rest.len()),
            None => None,
        }
    }

    fn date_span_len(&self, rest: &str) -> Option<usize> {
        let format = self.date_format.as_ref()?;
        let start = self.leading_padding_len(rest);
        let (_, consumed) = format.scan(&rest[start..])?;
        Some(self.with_trailing_padding(rest, start + consumed))
    }

    /// Content-class span, capped by the precision and widened by any padding.
    fn bounded_span_len(&self, rest: &str) -> usize {
        let start = self.leading_padding_len(rest);
        let body = &rest[start..];
        let mut len = self.kind.content_class_len(body);
        if let Some(max) = self.modifier.and_then(|m| m.max_width()) {
            if let Some((idx, _)) = body[..len].char_indices().nth(max) {
                len = idx;
            }
        }
        self.with_trailing_padding(rest, start + len)
    }

    fn leading_padding_len(&self, rest: &str) -> usize {
        match self.modifier {
            Some(m) if m.min_width().is_some() && !m.is_left_justified() => {
                rest.len() - rest.trim_start_matches(' ').len()
            }
            _ => 0,
        }
    }

    fn with_trailing_padding(&self, rest: &str, mut end: usize) -> usize {
        if let Some(m) = self.modifier.filter(|m| m.is_left_justified()) {
            if let Some(min) = m.min_width() {
                let mut width = rest[..end].chars().count();
                while width < min && rest[end..].starts_with(' ') {
                    end += 1;
                    width += 1;
                }
            }
        }
        end
    }

    /// Convert span text into a typed value. Padding is stripped and precision applied first.
    pub fn decode(&self, text: &str) -> Result<RenderedValue, DecodeError> {
        let text = match &self.modifier {
            Some(m) => m.truncate(m.trim_padding(text)),
            None => text,
        };

        let value = match self.kind {
            SpecifierKind::Date => match &self.date_format {
                Some(format) => RenderedValue::Timestamp(format.parse(text)?),
                None => RenderedValue::None,
            },
            SpecifierKind::Level => RenderedValue::Level(
                Level::from_literal(text).ok_or_else(|| DecodeError::UnknownLevel(text.to_string()))?,
            ),
            SpecifierKind::Category => RenderedValue::Text(self.keep_category_segments(text).to_string()),
            SpecifierKind::Thread | SpecifierKind::Message => RenderedValue::Text(text.to_string()),
            SpecifierKind::LineSeparator => RenderedValue::None,
        };
        Ok(value)
    }

    fn keep_category_segments<'a>(&self, category: &'a str) -> &'a str {
        let Some(n) = self.category_segments else {
            return category;
        };
        match category.rmatch_indices('.').nth(n - 1) {
            Some((idx, _)) => &category[idx + 1..],
            None => category,
        }
    }

    /// Write a decoded value into its field of `event`. `RenderedValue::None` is a no-op.
    pub fn inject(&self, event: &mut LogEvent, value: RenderedValue) {
        match (self.kind, value) {
            (SpecifierKind::Date, RenderedValue::Timestamp(t)) => event.set_timestamp(t),
            (SpecifierKind::Level, RenderedValue::Level(level)) => event.set_level(level),
            (SpecifierKind::Category, RenderedValue::Text(s)) => event.set_category(s),
            (SpecifierKind::Thread, RenderedValue::Text(s)) => event.set_thread_name(s),
            (SpecifierKind::Message, RenderedValue::Text(s)) => event.set_message(s),
            _ => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pattern::component::{Literal, RenderedLogEvent};

    fn closed(kind: SpecifierKind, modifier: Option<&str>) -> ConversionSpecifier {
        let modifier = modifier.map(|m| FormatModifier::parse(m).unwrap());
        let mut s = ConversionSpecifier::new(kind, modifier).unwrap();
        s.finish().unwrap();
        s
    }

    fn with_argument(kind: SpecifierKind, argument: &str) -> ConversionSpecifier {
        let mut s = ConversionSpecifier::new(kind, None).unwrap();
        assert_eq!(s.add('{').unwrap(), AddResult::Accepted);
        for c in argument.chars() {
            assert_eq!(s.add(c).unwrap(), AddResult::Accepted);
        }
        assert_eq!(s.add('}').unwrap(), AddResult::AcceptedAndClosed);
        s
    }

    fn literal(text: &str) -> PatternComponent {
        PatternComponent::Literal(Literal::new(text))
    }

    fn render(
        specifier: &ConversionSpecifier,
        line: &str,
        from: usize,
        next: Option<&PatternComponent>,
    ) -> Result<Option<RenderedLogEvent>, DecodeError> {
        let Some(span) = specifier.locate_span(line, from, next) else {
            return Ok(None);
        };
        let text = &line[span.clone()];
        let value = specifier.decode(text)?;
        Ok(Some(RenderedLogEvent::new(text, span.start, span.end, value)))
    }

    #[test]
    fn test_conversion_characters() {
        for kind in SpecifierKind::ALL {
            assert_eq!(
                SpecifierKind::from_conversion_character(kind.conversion_character()),
                Some(*kind)
            );
        }
        assert_eq!(SpecifierKind::from_conversion_character('q'), None);
    }

    #[test]
    fn test_add_after_not_accepted_fails_for_every_kind() {
        for kind in SpecifierKind::ALL {
            let mut s = ConversionSpecifier::new(*kind, None).unwrap();
            assert_eq!(s.add(' ').unwrap(), AddResult::NotAccepted);
            assert!(s.is_closed());
            let err = s.add(' ').unwrap_err();
            assert_eq!(err, CompileError::ClosedComponent { character: ' ' });
            assert!(err
                .to_string()
                .contains("attempt to add more characters to a closed conversion pattern component"));
        }
    }

    #[test]
    fn test_add_after_accepted_and_closed_fails() {
        for kind in SpecifierKind::ALL.iter().filter(|k| k.accepts_argument()) {
            let argument = if *kind == SpecifierKind::Date { "ISO8601" } else { "2" };
            let mut s = with_argument(*kind, argument);
            assert!(matches!(s.add('x'), Err(CompileError::ClosedComponent { character: 'x' })));
        }
    }

    #[test]
    fn test_brace_not_accepted_without_argument_support() {
        let mut s = ConversionSpecifier::new(SpecifierKind::Thread, None).unwrap();
        assert_eq!(s.add('{').unwrap(), AddResult::NotAccepted);
    }

    #[test]
    fn test_finish_with_open_argument() {
        let mut s = ConversionSpecifier::new(SpecifierKind::Date, None).unwrap();
        s.add('{').unwrap();
        s.add('H').unwrap();
        assert!(matches!(s.finish(), Err(CompileError::MalformedTemplate { .. })));
    }

    #[test]
    fn test_empty_argument_rejected() {
        let mut s = ConversionSpecifier::new(SpecifierKind::Date, None).unwrap();
        s.add('{').unwrap();
        assert!(matches!(s.add('}'), Err(CompileError::MalformedTemplate { .. })));
    }

    #[test]
    fn test_invalid_category_precision() {
        let mut s = ConversionSpecifier::new(SpecifierKind::Category, None).unwrap();
        s.add('{').unwrap();
        s.add('x').unwrap();
        assert!(matches!(s.add('}'), Err(CompileError::MalformedTemplate { .. })));
    }

    #[test]
    fn test_modifier_validation() {
        let m = FormatModifier::parse("5").unwrap();
        assert!(matches!(
            ConversionSpecifier::new(SpecifierKind::LineSeparator, Some(m)),
            Err(CompileError::InvalidModifier { character: 'n', .. })
        ));
        let m = FormatModifier::parse(".5").unwrap();
        let err = ConversionSpecifier::new(SpecifierKind::Date, Some(m)).unwrap_err();
        assert!(err.to_string().ends_with("\".5\": a truncated date cannot be parsed back"), "{}", err);
        assert!(ConversionSpecifier::new(SpecifierKind::Category, Some(m)).is_ok());
    }

    #[test]
    fn test_pattern_literal() {
        assert_eq!(closed(SpecifierKind::Message, None).pattern_literal(), "%m");
        assert_eq!(closed(SpecifierKind::Message, Some("-5")).pattern_literal(), "%-5m");
        assert_eq!(with_argument(SpecifierKind::Date, "ABSOLUTE").pattern_literal(), "%d{ABSOLUTE}");
        assert_eq!(with_argument(SpecifierKind::Category, "2").pattern_literal(), "%c{2}");
    }

    #[test]
    fn test_message_takes_whole_line() {
        let line = "this is some message";
        let event = render(&closed(SpecifierKind::Message, None), line, 0, None).unwrap().unwrap();
        assert_eq!(event.start(), 0);
        assert_eq!(event.end(), 20);
        assert_eq!(event.literal(), "this is some message");
        assert_eq!(event.value(), &RenderedValue::Text("this is some message".to_string()));
    }

    #[test]
    fn test_category_anchored_by_literal() {
        let c = closed(SpecifierKind::Category, None);
        let next = literal("] ");
        let span = c.locate_span("[com.example.Foo] main", 1, Some(&next)).unwrap();
        assert_eq!(span, 1..16);
    }

    #[test]
    fn test_anchor_not_found() {
        let c = closed(SpecifierKind::Category, None);
        let next = literal(" - ");
        assert_eq!(c.locate_span("com.example.Foo main", 0, Some(&next)), None);
    }

    #[test]
    fn test_thread_whitespace_bounded_before_specifier() {
        let t = closed(SpecifierKind::Thread, None);
        let next = PatternComponent::Specifier(closed(SpecifierKind::Message, None));
        assert_eq!(t.locate_span("main started", 0, Some(&next)), Some(0..4));
    }

    #[test]
    fn test_level_padding_is_stripped() {
        let p = closed(SpecifierKind::Level, Some("-5"));
        let next = literal(" [");
        let event = render(&p, "INFO  [x]", 0, Some(&next)).unwrap().unwrap();
        assert_eq!(event.literal(), "INFO ");
        assert_eq!(event.value(), &RenderedValue::Level(Level::Info));
    }

    #[test]
    fn test_level_padding_without_anchor() {
        let p = closed(SpecifierKind::Level, Some("-5"));
        let next = PatternComponent::Specifier(closed(SpecifierKind::Message, None));
        assert_eq!(p.locate_span("WARN message", 0, Some(&next)), Some(0..5));
        let p = closed(SpecifierKind::Level, Some("5"));
        assert_eq!(p.locate_span(" WARN message", 0, Some(&next)), Some(0..5));
    }

    #[test]
    fn test_padded_span_skips_anchor_inside_padding() {
        let p = closed(SpecifierKind::Level, Some("-5"));
        let next = literal(" ");
        assert_eq!(p.locate_span("INFO  com.example.App", 0, Some(&next)), Some(0..5));
        assert_eq!(p.locate_span("ERROR com.example.App", 0, Some(&next)), Some(0..5));
        assert_eq!(p.locate_span("INFO", 0, Some(&next)), None);
    }

    #[test]
    fn test_anchored_span_must_fit_content_class() {
        let p = closed(SpecifierKind::Level, None);
        let next = literal(" ");
        assert_eq!(p.locate_span("\tat com.example.Foo.bar(Foo.java:10)", 0, Some(&next)), None);
        assert_eq!(p.locate_span("ERROR boom", 0, Some(&next)), Some(0..5));
        let next = literal(" - ");
        assert_eq!(p.locate_span("12:00 x - y", 0, Some(&next)), None);

        let t = closed(SpecifierKind::Thread, None);
        let next = literal(" ");
        assert_eq!(t.locate_span("\tat com.Foo", 0, Some(&next)), None);
        assert_eq!(t.locate_span("main thread", 0, None), None);
        assert_eq!(t.locate_span("main", 0, None), Some(0..4));

        let c = closed(SpecifierKind::Category, Some("-8"));
        assert_eq!(c.locate_span("a.B      - x", 0, Some(&literal(" - "))), Some(0..8));
        assert_eq!(c.locate_span("         - x", 0, Some(&literal(" - "))), None);
    }

    #[test]
    fn test_unknown_level_fails_decoding() {
        let p = closed(SpecifierKind::Level, None);
        let err = render(&p, "LOUD", 0, None).unwrap_err();
        assert_eq!(err, DecodeError::UnknownLevel("LOUD".to_string()));
    }

    #[test]
    fn test_precision_caps_unanchored_span() {
        let c = closed(SpecifierKind::Category, Some(".4"));
        let next = PatternComponent::Specifier(closed(SpecifierKind::Thread, None));
        assert_eq!(c.locate_span("abcdefgh", 0, Some(&next)), Some(0..4));
    }

    #[test]
    fn test_precision_truncates_anchored_value() {
        let c = closed(SpecifierKind::Category, Some(".10"));
        let next = literal(" ");
        let event = render(&c, "com.example.deeply.nested.Foo rest", 0, Some(&next))
            .unwrap()
            .unwrap();
        assert_eq!(event.literal(), "com.example.deeply.nested.Foo");
        assert_eq!(event.value(), &RenderedValue::Text("nested.Foo".to_string()));
    }

    #[test]
    fn test_category_segments() {
        let c = with_argument(SpecifierKind::Category, "2");
        assert_eq!(
            c.decode("com.example.Foo").unwrap(),
            RenderedValue::Text("example.Foo".to_string())
        );
        assert_eq!(c.decode("Foo").unwrap(), RenderedValue::Text("Foo".to_string()));
    }

    #[test]
    fn test_date_is_self_delimiting() {
        let d = closed(SpecifierKind::Date, None);
        let next = literal(" ");
        let span = d.locate_span("2017-10-30 12:34:56,789 INFO x", 0, Some(&next)).unwrap();
        assert_eq!(span, 0..23);
    }

    #[test]
    fn test_line_separator_requires_end_of_line() {
        let n = closed(SpecifierKind::LineSeparator, None);
        assert_eq!(n.locate_span("abc", 3, None), Some(3..3));
        assert_eq!(n.locate_span("abc", 1, None), None);
    }

    #[test]
    fn test_empty_span_rejected_for_bounded_kinds() {
        let c = closed(SpecifierKind::Category, None);
        let next = literal(" ");
        assert_eq!(c.locate_span(" x", 0, Some(&next)), None);
        let m = closed(SpecifierKind::Message, None);
        assert_eq!(m.locate_span("x", 1, None), Some(1..1));
    }

    #[test]
    fn test_inject() {
        let mut event = LogEvent::new(1);
        closed(SpecifierKind::Thread, None).inject(&mut event, RenderedValue::Text("main".to_string()));
        closed(SpecifierKind::Level, None).inject(&mut event, RenderedValue::Level(Level::Error));
        closed(SpecifierKind::Category, None).inject(&mut event, RenderedValue::None);
        assert_eq!(event.thread_name(), Some("main"));
        assert_eq!(event.level(), Some(Level::Error));
        assert_eq!(event.category(), None);
    }
}
