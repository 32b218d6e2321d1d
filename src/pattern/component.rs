use chrono::NaiveDateTime;

use crate::level::Level;
use crate::pattern::specifier::ConversionSpecifier;

/// Result of feeding one template character to an open component.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AddResult {
    /// Character consumed, component still open.
    Accepted,
    /// Character consumed, component closed.
    AcceptedAndClosed,
    /// Character does not belong to the component, which is now closed.
    NotAccepted,
}

/// Fixed text that must appear verbatim in the log line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Literal {
    text: String,
}

impl Literal {
    pub fn new(text: impl Into<String>) -> Self {
        Literal { text: text.into() }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    /// Template form, with `%` escaped back to `%%`.
    pub fn pattern_literal(&self) -> String {
        self.text.replace('%', "%%")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PatternComponent {
    Literal(Literal),
    Specifier(ConversionSpecifier),
}

impl PatternComponent {
    pub fn pattern_literal(&self) -> String {
        match self {
            PatternComponent::Literal(literal) => literal.pattern_literal(),
            PatternComponent::Specifier(specifier) => specifier.pattern_literal(),
        }
    }

    pub fn as_literal(&self) -> Option<&Literal> {
        match self {
            PatternComponent::Literal(literal) => Some(literal),
            PatternComponent::Specifier(_) => None,
        }
    }

    pub fn as_specifier(&self) -> Option<&ConversionSpecifier> {
        match self {
            PatternComponent::Specifier(specifier) => Some(specifier),
            PatternComponent::Literal(_) => None,
        }
    }
}

/// Decoded value of a matched span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderedValue {
    /// Literal text and the zero-width line separator carry no value.
    None,
    Text(String),
    Level(Level),
    Timestamp(NaiveDateTime),
}

/// The portion of a log line attributed to one pattern component.
/// `start` and `end` are byte offsets, `end` exclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedLogEvent {
    literal: String,
    start: usize,
    end: usize,
    value: RenderedValue,
}

impl RenderedLogEvent {
    pub fn new(literal: impl Into<String>, start: usize, end: usize, value: RenderedValue) -> Self {
        RenderedLogEvent {
            literal: literal.into(),
            start,
            end,
            value,
        }
    }

    /// The exact text of the span, padding included.
    pub fn literal(&self) -> &str {
        &self.literal
    }

    pub fn start(&self) -> usize {
        self.start
    }

    pub fn end(&self) -> usize {
        self.end
    }

    pub fn value(&self) -> &RenderedValue {
        &self.value
    }

    pub fn into_value(self) -> RenderedValue {
        self.value
    }
}
