use is_terminal::IsTerminal;

use crate::level::Level;

/// ANSI color codes for logfmt output formatting
#[derive(Debug, Clone)]
pub struct ColorScheme {
    pub key: &'static str,         // Cyan for field names
    pub equals: &'static str,      // White for = separator
    pub string: &'static str,      // Green for quoted strings
    pub number: &'static str,      // Yellow for line numbers
    pub timestamp: &'static str,   // Blue for timestamps
    pub level_error: &'static str, // Red for error/fatal levels
    pub level_warn: &'static str,  // Yellow for warn levels
    pub level_info: &'static str,  // White for info levels
    pub level_debug: &'static str, // Gray for debug/trace levels
    pub reset: &'static str,       // Reset to default color
}

impl ColorScheme {
    pub fn new(use_colors: bool) -> Self {
        if use_colors {
            Self {
                key: "\x1b[36m",
                equals: "\x1b[37m",
                string: "\x1b[32m",
                number: "\x1b[33m",
                timestamp: "\x1b[34m",
                level_error: "\x1b[31m",
                level_warn: "\x1b[33m",
                level_info: "\x1b[37m",
                level_debug: "\x1b[90m",
                reset: "\x1b[0m",
            }
        } else {
            Self {
                key: "",
                equals: "",
                string: "",
                number: "",
                timestamp: "",
                level_error: "",
                level_warn: "",
                level_info: "",
                level_debug: "",
                reset: "",
            }
        }
    }

    pub fn is_enabled(&self) -> bool {
        !self.reset.is_empty()
    }

    pub fn level(&self, level: Level) -> &'static str {
        match level {
            Level::Fatal | Level::Error => self.level_error,
            Level::Warn => self.level_warn,
            Level::Info => self.level_info,
            Level::Debug | Level::Trace => self.level_debug,
        }
    }
}

/// Colors are used when stdout is a terminal and `NO_COLOR` is unset.
pub fn should_use_colors() -> bool {
    std::env::var_os("NO_COLOR").is_none() && std::io::stdout().is_terminal()
}
