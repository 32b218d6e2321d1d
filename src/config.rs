/// Configuration for record assembly and processing
#[derive(Debug, Clone)]
pub struct ParserConfig {
    pub error_strategy: ErrorStrategy,
    pub max_line_length: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        ParserConfig {
            error_strategy: ErrorStrategy::Skip,
            max_line_length: 1048576, // 1MB
        }
    }
}

/// What to do with lines and records that cannot be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorStrategy {
    /// Report the problem and continue with the next line
    Skip,
    /// Stop processing on first error
    FailFast,
}
