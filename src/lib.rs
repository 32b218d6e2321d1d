// src/lib.rs
pub mod colors;
pub mod config;
pub mod error;
pub mod event;
pub mod formatters;
pub mod level;
pub mod output_format;
pub mod parser;
pub mod pattern;
pub mod processor;

pub use error::*;

pub use config::{ErrorStrategy, ParserConfig};
pub use event::LogEvent;
pub use level::Level;
pub use output_format::{OutputFormat, OutputFormatter};
pub use parser::{parse_events, EventParser};
pub use pattern::{CompileWarning, ConversionPattern, LineMatcher, PatternCompiler};
pub use processor::{LogProcessor, ProcessingStats};
