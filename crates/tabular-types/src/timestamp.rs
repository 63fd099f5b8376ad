//! Timestamp parse patterns.
//!
//! Reader options spell timestamp formats the way Spark does, with
//! `SimpleDateFormat`-style letters (`yyyy-MM-dd HH:mm:ss`). They are
//! translated once into a chrono format string.

use chrono::{DateTime, NaiveDate, NaiveDateTime};

use crate::error::{Result, TypesError};

/// Formats tried, in order, when no `timestampFormat` is given
const DEFAULT_FORMATS: [&str; 2] = ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"];

/// A translated timestamp pattern
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampFormat {
    pattern: String,
    chrono: String,
    has_time: bool,
    has_offset: bool,
}

impl TimestampFormat {
    /// Translate a `SimpleDateFormat`-style pattern
    ///
    /// Text inside single quotes is literal (`''` is a quote). Any other ASCII
    /// letter must be a supported pattern letter.
    pub fn parse(pattern: &str) -> Result<Self> {
        let invalid = |reason: String| TypesError::InvalidTimestampFormat {
            pattern: pattern.to_string(),
            reason,
        };

        let mut chrono = String::with_capacity(pattern.len() * 2);
        let mut has_time = false;
        let mut has_offset = false;
        let mut has_half_day_hour = false;
        let mut has_am_pm = false;
        let mut chars = pattern.chars().peekable();

        while let Some(c) = chars.next() {
            if c == '\'' {
                if chars.peek() == Some(&'\'') {
                    chars.next();
                    chrono.push('\'');
                    continue;
                }
                let mut closed = false;
                while let Some(literal) = chars.next() {
                    if literal == '\'' {
                        if chars.peek() == Some(&'\'') {
                            chars.next();
                            chrono.push('\'');
                            continue;
                        }
                        closed = true;
                        break;
                    }
                    push_literal(&mut chrono, literal);
                }
                if !closed {
                    return Err(invalid("unterminated quoted literal".to_string()));
                }
                continue;
            }

            if !c.is_ascii_alphabetic() {
                push_literal(&mut chrono, c);
                continue;
            }

            let mut run = 1;
            while chars.peek() == Some(&c) {
                chars.next();
                run += 1;
            }

            let spec = match (c, run) {
                ('y', 2) => "%y",
                ('y', _) => "%Y",
                ('M', 1 | 2) => "%m",
                ('M', 3) => "%b",
                ('M', _) => "%B",
                ('d', 1 | 2) => "%d",
                ('D', 1..=3) => "%j",
                ('E', 1..=3) => "%a",
                ('E', _) => "%A",
                ('a', 1) => "%p",
                ('H', 1 | 2) => "%H",
                ('h', 1 | 2) => "%I",
                ('m', 1 | 2) => "%M",
                ('s', 1 | 2) => "%S",
                ('S', 3) => "%3f",
                ('S', 6) => "%6f",
                ('S', 9) => "%9f",
                ('Z', 1..=3) | ('X' | 'x', 1 | 2) => "%z",
                ('X' | 'x', 3) => "%:z",
                _ => {
                    return Err(invalid(format!(
                        "unsupported pattern letter '{}'",
                        c.to_string().repeat(run)
                    )));
                }
            };
            if matches!(c, 'H' | 'h' | 'm' | 's' | 'S' | 'a') {
                has_time = true;
            }
            if matches!(c, 'Z' | 'X' | 'x') {
                has_offset = true;
            }
            has_half_day_hour |= c == 'h';
            has_am_pm |= c == 'a';
            chrono.push_str(spec);
        }

        // chrono cannot resolve a 1-12 hour without its AM/PM marker
        if has_half_day_hour && !has_am_pm {
            return Err(invalid(
                "'h' (hour 1-12) needs an 'a' (AM/PM) field; use 'H' for a 24-hour clock"
                    .to_string(),
            ));
        }

        Ok(Self {
            pattern: pattern.to_string(),
            chrono,
            has_time,
            has_offset,
        })
    }

    /// The pattern as given
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The equivalent chrono format string
    pub fn chrono_format(&self) -> &str {
        &self.chrono
    }

    /// Parse a value; offsets are normalised to UTC, date-only patterns give midnight
    pub fn parse_value(&self, raw: &str) -> Option<NaiveDateTime> {
        if self.has_offset {
            DateTime::parse_from_str(raw, &self.chrono)
                .ok()
                .map(|dt| dt.naive_utc())
        } else if self.has_time {
            NaiveDateTime::parse_from_str(raw, &self.chrono).ok()
        } else {
            NaiveDate::parse_from_str(raw, &self.chrono)
                .ok()
                .and_then(|date| date.and_hms_opt(0, 0, 0))
        }
    }
}

/// Parse an ISO-8601 style timestamp (space or `T` separator, optional
/// fraction, or full RFC 3339)
pub fn parse_default_timestamp(raw: &str) -> Option<NaiveDateTime> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt.naive_utc());
    }
    DEFAULT_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
}

fn push_literal(out: &mut String, c: char) {
    if c == '%' {
        out.push_str("%%");
    } else {
        out.push(c);
    }
}
