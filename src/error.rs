/// Template syntax errors. Any of these aborts compilation; no partial pattern is returned.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CompileError {
    #[error("unknown conversion character '{character}' at offset {offset}")]
    UnknownConversionCharacter { character: char, offset: usize },

    #[error("malformed format modifier \"{modifier}\" at offset {offset}")]
    MalformedModifier { modifier: String, offset: usize },

    #[error("malformed template at offset {offset}: {message}")]
    MalformedTemplate { offset: usize, message: String },

    #[error("conversion character '{character}' at offset {offset} does not accept format modifier \"{modifier}\": {reason}")]
    InvalidModifier {
        character: char,
        modifier: String,
        offset: usize,
        reason: String,
    },

    #[error("attempt to add more characters to a closed conversion pattern component: '{character}'")]
    ClosedComponent { character: char },
}

impl CompileError {
    /// Rebase an error produced against a sub-slice onto the full template.
    pub(crate) fn shifted(self, base: usize) -> Self {
        match self {
            CompileError::UnknownConversionCharacter { character, offset } => {
                CompileError::UnknownConversionCharacter {
                    character,
                    offset: offset + base,
                }
            }
            CompileError::MalformedModifier { modifier, offset } => {
                CompileError::MalformedModifier {
                    modifier,
                    offset: offset + base,
                }
            }
            CompileError::MalformedTemplate { offset, message } => {
                CompileError::MalformedTemplate {
                    offset: offset + base,
                    message,
                }
            }
            CompileError::InvalidModifier {
                character,
                modifier,
                offset,
                reason,
            } => CompileError::InvalidModifier {
                character,
                modifier,
                offset: offset + base,
                reason,
            },
            other => other,
        }
    }

    pub fn offset(&self) -> Option<usize> {
        match self {
            CompileError::UnknownConversionCharacter { offset, .. }
            | CompileError::MalformedModifier { offset, .. }
            | CompileError::MalformedTemplate { offset, .. }
            | CompileError::InvalidModifier { offset, .. } => Some(*offset),
            CompileError::ClosedComponent { .. } => None,
        }
    }
}

/// A span matched structurally but its content is not a legal value for the field.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    #[error("unknown log level \"{0}\"")]
    UnknownLevel(String),

    #[error("invalid date \"{text}\" for format \"{format}\"")]
    InvalidDate { text: String, format: String },
}

/// Decode failure for a whole record. The raw text is always captured.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("line {line_number}: {source}")]
pub struct RecordError {
    pub line_number: usize,
    /// Physical lines making up the record.
    pub line_count: usize,
    pub raw: String,
    #[source]
    pub source: DecodeError,
}

/// Outcome of feeding a physical line that did not produce a usable record.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    #[error("line {line_number} does not match the conversion pattern")]
    NoMatch { line_number: usize, line: String },

    #[error(transparent)]
    Decode(#[from] RecordError),

    #[error("line {line_number} too long: {length} > {max_length}")]
    LineTooLong {
        line_number: usize,
        length: usize,
        max_length: usize,
    },
}

impl ParseError {
    pub fn line_number(&self) -> usize {
        match self {
            ParseError::NoMatch { line_number, .. } | ParseError::LineTooLong { line_number, .. } => {
                *line_number
            }
            ParseError::Decode(e) => e.line_number,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ProcessingError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Output error: {0}")]
    OutputError(String),

    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Parse error: {0}")]
    ParseError(#[from] ParseError),
}
