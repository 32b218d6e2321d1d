//! Conversion-pattern compilation and line matching.
//!
//! A template such as `%d [%t] %-5p %c - %m%n` compiles into an ordered chain of
//! literals and conversion specifiers. The chain is then replayed against log lines:
//! literals anchor the spans, specifiers decode what lies between them.

pub mod compiler;
pub mod component;
pub mod date_format;
pub mod matcher;
pub mod modifier;
pub mod specifier;

pub use compiler::{CompileWarning, ConversionPattern, PatternCompiler};
pub use component::{AddResult, Literal, PatternComponent, RenderedLogEvent, RenderedValue};
pub use date_format::DateFormat;
pub use matcher::{LineMatch, LineMatcher, OpenRecord, RecordMatch};
pub use modifier::FormatModifier;
pub use specifier::{ConversionSpecifier, SpecifierKind};
