use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, NaiveTime};
use once_cell::sync::Lazy;
use regex::Regex;

use crate::error::DecodeError;

// One token per match: quoted text, a run of a pattern letter, or any single character.
static DATE_TOKEN_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"'[^']*'|y+|M+|d+|H+|h+|m+|s+|S+|E+|a+|Z+|[A-Za-z]|.")
        .expect("date token regex should be valid")
});

pub const ISO8601: &str = "yyyy-MM-dd HH:mm:ss,SSS";
pub const ABSOLUTE: &str = "HH:mm:ss,SSS";
pub const DATE: &str = "dd MMM yyyy HH:mm:ss,SSS";
pub const COMPACT: &str = "yyyyMMddHHmmssSSS";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DateKind {
    DateTime,
    DateOnly,
    TimeOnly,
}

/// A date layout, given either by name (`ISO8601`, `ABSOLUTE`, `DATE`, `COMPACT`)
/// or as SimpleDateFormat text, translated to a chrono format string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DateFormat {
    source: String,
    strftime: String,
    kind: DateKind,
    has_offset: bool,
}

impl DateFormat {
    /// Build from the `{...}` argument of `%d`; `None` means the default ISO8601 layout.
    pub fn from_argument(argument: Option<&str>) -> Result<Self, String> {
        let source = argument.unwrap_or("ISO8601");
        let pattern = match source {
            "ISO8601" => ISO8601,
            "ABSOLUTE" => ABSOLUTE,
            "DATE" => DATE,
            "COMPACT" => COMPACT,
            custom => custom,
        };
        let mut format = Self::from_simple_date_format(pattern)?;
        format.source = source.to_string();
        Ok(format)
    }

    pub fn from_simple_date_format(pattern: &str) -> Result<Self, String> {
        if pattern.is_empty() {
            return Err("empty date format".to_string());
        }

        let mut strftime = String::new();
        let (mut has_year, mut has_month_or_day, mut has_time, mut has_offset) =
            (false, false, false, false);
        let (mut has_clock_hour, mut has_am_pm) = (false, false);

        for token in DATE_TOKEN_REGEX.find_iter(pattern) {
            let token = token.as_str();
            if let Some(quoted) = token.strip_prefix('\'') {
                let quoted = quoted.strip_suffix('\'').unwrap_or(quoted);
                if quoted.is_empty() {
                    strftime.push('\'');
                } else {
                    push_literal(&mut strftime, quoted);
                }
                continue;
            }

            let mut chars = token.chars();
            let Some(letter) = chars.next() else { continue };
            let len = token.chars().count();
            let item = match letter {
                'y' => {
                    has_year = true;
                    if len == 2 { "%y" } else { "%Y" }
                }
                'M' => {
                    has_month_or_day = true;
                    match len {
                        1 | 2 => "%m",
                        3 => "%b",
                        _ => "%B",
                    }
                }
                'd' => {
                    has_month_or_day = true;
                    "%d"
                }
                'E' => {
                    if len <= 3 { "%a" } else { "%A" }
                }
                'H' => {
                    has_time = true;
                    "%H"
                }
                'h' => {
                    has_time = true;
                    has_clock_hour = true;
                    "%I"
                }
                'm' => {
                    has_time = true;
                    "%M"
                }
                's' => {
                    has_time = true;
                    "%S"
                }
                'S' => {
                    has_time = true;
                    match len {
                        3 => "%3f",
                        6 => "%6f",
                        9 => "%9f",
                        _ => return Err(format!("unsupported fraction width \"{}\"", token)),
                    }
                }
                'a' => {
                    has_am_pm = true;
                    "%p"
                }
                'Z' => {
                    has_offset = true;
                    "%z"
                }
                c if c.is_ascii_alphabetic() => {
                    return Err(format!("unsupported date pattern letter '{}'", c));
                }
                _ => {
                    push_literal(&mut strftime, token);
                    continue;
                }
            };
            strftime.push_str(item);
        }

        let kind = match (has_year, has_month_or_day, has_time) {
            (true, _, true) => DateKind::DateTime,
            (true, _, false) => DateKind::DateOnly,
            (false, false, true) => DateKind::TimeOnly,
            (false, true, _) => {
                return Err(format!("date format \"{}\" has no year", pattern));
            }
            (false, false, false) => {
                return Err(format!("date format \"{}\" has no date or time fields", pattern));
            }
        };

        if has_offset && kind != DateKind::DateTime {
            return Err(format!("date format \"{}\" has a zone offset but no full date and time", pattern));
        }
        if has_clock_hour && !has_am_pm {
            return Err(format!("date format \"{}\" uses 'h' without an 'a' marker", pattern));
        }

        Ok(DateFormat {
            source: pattern.to_string(),
            strftime,
            kind,
            has_offset,
        })
    }

    /// The argument as written in the template.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn strftime(&self) -> &str {
        &self.strftime
    }

    /// Read a date at the start of `s`, returning the value and the number of bytes it occupies.
    /// Time-only layouts are placed on 1970-01-01; zoned layouts are converted to UTC.
    pub fn scan(&self, s: &str) -> Option<(NaiveDateTime, usize)> {
        let (value, remainder) = if self.has_offset {
            DateTime::<FixedOffset>::parse_and_remainder(s, &self.strftime)
                .ok()
                .map(|(dt, rest)| (dt.naive_utc(), rest))?
        } else {
            match self.kind {
                DateKind::DateTime => NaiveDateTime::parse_and_remainder(s, &self.strftime).ok()?,
                DateKind::DateOnly => NaiveDate::parse_and_remainder(s, &self.strftime)
                    .ok()
                    .map(|(d, rest)| (d.and_time(NaiveTime::MIN), rest))?,
                DateKind::TimeOnly => {
                    let (time, rest) = NaiveTime::parse_and_remainder(s, &self.strftime).ok()?;
                    (NaiveDate::from_ymd_opt(1970, 1, 1)?.and_time(time), rest)
                }
            }
        };
        Some((value, s.len() - remainder.len()))
    }

    /// Decode text that must consist of exactly one date.
    pub fn parse(&self, text: &str) -> Result<NaiveDateTime, DecodeError> {
        match self.scan(text) {
            Some((value, consumed)) if consumed == text.len() => Ok(value),
            _ => Err(DecodeError::InvalidDate {
                text: text.to_string(),
                format: self.source.clone(),
            }),
        }
    }
}

fn push_literal(out: &mut String, text: &str) {
    for c in text.chars() {
        if c == '%' {
            out.push_str("%%");
        } else {
            out.push(c);
        }
    }
}
