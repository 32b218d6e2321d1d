use std::fmt;

use crate::error::CompileError;

/// Width, precision and justification qualifier between `%` and the conversion
/// character, e.g. `-5` in `%-5p` or `.20` in `%.20c`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FormatModifier {
    min_width: Option<usize>,
    max_width: Option<usize>,
    left_justify: bool,
}

impl FormatModifier {
    pub fn new(min_width: Option<usize>, max_width: Option<usize>, left_justify: bool) -> Self {
        FormatModifier {
            min_width,
            max_width,
            left_justify,
        }
    }

    /// Parse `[-][min][.max]`. Offsets in the returned error are relative to `text`.
    ///
    /// Widths must be positive and written without leading zeros, so that
    /// [`render`](Self::render) reproduces the input exactly.
    pub fn parse(text: &str) -> Result<Self, CompileError> {
        let malformed = || CompileError::MalformedModifier {
            modifier: text.to_string(),
            offset: 0,
        };

        let (left_justify, rest) = match text.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, text),
        };

        let min_end = rest
            .find(|c: char| !c.is_ascii_digit())
            .unwrap_or(rest.len());
        let min_width = parse_width(&rest[..min_end]).map_err(|_| malformed())?;
        let rest = &rest[min_end..];

        let max_width = match rest.strip_prefix('.') {
            Some(digits) => {
                if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
                    return Err(malformed());
                }
                parse_width(digits).map_err(|_| malformed())?
            }
            None if rest.is_empty() => None,
            None => return Err(malformed()),
        };

        if min_width.is_none() && max_width.is_none() {
            return Err(malformed());
        }

        Ok(FormatModifier {
            min_width,
            max_width,
            left_justify,
        })
    }

    pub fn min_width(&self) -> Option<usize> {
        self.min_width
    }

    pub fn max_width(&self) -> Option<usize> {
        self.max_width
    }

    pub fn is_left_justified(&self) -> bool {
        self.left_justify
    }

    pub fn render(&self) -> String {
        let mut s = String::new();
        if self.left_justify {
            s.push('-');
        }
        if let Some(min) = self.min_width {
            s.push_str(&min.to_string());
        }
        if let Some(max) = self.max_width {
            s.push('.');
            s.push_str(&max.to_string());
        }
        s
    }

    /// Strip the padding a min width may have added, on the side opposite the justification.
    pub fn trim_padding<'a>(&self, s: &'a str) -> &'a str {
        if self.min_width.is_none() {
            return s;
        }
        if self.left_justify {
            s.trim_end_matches(' ')
        } else {
            s.trim_start_matches(' ')
        }
    }

    /// Keep the rightmost `max_width` characters, the way the layout truncates.
    pub fn truncate<'a>(&self, s: &'a str) -> &'a str {
        let Some(max) = self.max_width else {
            return s;
        };
        let count = s.chars().count();
        if count <= max {
            return s;
        }
        match s.char_indices().nth(count - max) {
            Some((idx, _)) => &s[idx..],
            None => s,
        }
    }
}

impl fmt::Display for FormatModifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn parse_width(digits: &str) -> Result<Option<usize>, ()> {
    if digits.is_empty() {
        return Ok(None);
    }
    if digits.starts_with('0') {
        return Err(());
    }
    digits.parse::<usize>().map(Some).map_err(|_| ())
}
