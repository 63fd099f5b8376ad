//! Reader options.
//!
//! Options are free-form key/value pairs, matched case-insensitively.
//! Recognised keys are validated when a read starts; anything else is kept
//! and ignored.

use std::collections::BTreeMap;
use std::io::Read;

use tabular_types::{Schema, TimestampFormat};
use tracing::debug;

use crate::error::{ReadError, Result};

pub const DELIMITER: &str = "delimiter";
/// Alias of `delimiter`
pub const SEP: &str = "sep";
pub const HEADER: &str = "header";
pub const TIMESTAMP_FORMAT: &str = "timestampformat";
pub const INFER_SCHEMA: &str = "inferschema";
pub const QUOTE: &str = "quote";
pub const NULL_VALUE: &str = "nullvalue";
pub const MODE: &str = "mode";

const RECOGNIZED: [&str; 8] = [
    DELIMITER,
    SEP,
    HEADER,
    TIMESTAMP_FORMAT,
    INFER_SCHEMA,
    QUOTE,
    NULL_VALUE,
    MODE,
];

/// What to do with records that do not fit the schema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ParseMode {
    /// Pad missing fields and non-conforming values with nulls
    #[default]
    Permissive,
    /// Skip the record
    DropMalformed,
    /// Fail the read with `MalformedRecord`
    FailFast,
}

/// Key/value options for a read, plus an optional declared schema
///
/// ```ignore
/// let options = ReadOptions::new()
///     .option("delimiter", "\t")
///     .option("header", true);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ReadOptions {
    options: BTreeMap<String, String>,
    schema: Option<Schema>,
}

impl ReadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build options from `(key, value)` pairs
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: ToString,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |options, (k, v)| options.option(k, v))
    }

    /// Set an option; later values for the same key win
    pub fn option(mut self, key: impl AsRef<str>, value: impl ToString) -> Self {
        self.options
            .insert(key.as_ref().to_ascii_lowercase(), value.to_string());
        self
    }

    /// Declare the schema instead of inferring it
    pub fn schema(mut self, schema: Schema) -> Self {
        self.schema = Some(schema);
        self
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.options
            .get(&key.to_ascii_lowercase())
            .map(String::as_str)
    }

    pub fn declared_schema(&self) -> Option<&Schema> {
        self.schema.as_ref()
    }

    /// Validate recognised keys and fill in defaults
    pub fn resolve(&self) -> Result<ResolvedOptions> {
        let mut resolved = ResolvedOptions {
            schema: self.schema.clone(),
            ..ResolvedOptions::default()
        };

        if let Some(value) = self.get(DELIMITER).or_else(|| self.get(SEP)) {
            resolved.delimiter = parse_char(DELIMITER, value)?;
        }
        if let Some(value) = self.get(QUOTE) {
            resolved.quote = parse_char(QUOTE, value)?;
        }
        if resolved.delimiter == resolved.quote {
            return Err(invalid(
                DELIMITER,
                &(resolved.delimiter as char).to_string(),
                "delimiter and quote must differ",
            ));
        }
        if let Some(value) = self.get(HEADER) {
            resolved.header = parse_bool(HEADER, value)?;
        }
        if let Some(value) = self.get(INFER_SCHEMA) {
            resolved.infer_schema = parse_bool(INFER_SCHEMA, value)?;
        }
        if let Some(value) = self.get(TIMESTAMP_FORMAT) {
            resolved.timestamp_format = Some(TimestampFormat::parse(value)?);
        }
        if let Some(value) = self.get(NULL_VALUE) {
            resolved.null_value = value.to_string();
        }
        if let Some(value) = self.get(MODE) {
            resolved.mode = match value.to_ascii_uppercase().as_str() {
                "PERMISSIVE" => ParseMode::Permissive,
                "DROPMALFORMED" => ParseMode::DropMalformed,
                "FAILFAST" => ParseMode::FailFast,
                _ => {
                    return Err(invalid(
                        MODE,
                        value,
                        "expected PERMISSIVE, DROPMALFORMED or FAILFAST",
                    ))
                }
            };
        }

        for key in self
            .options
            .keys()
            .filter(|key| !RECOGNIZED.contains(&key.as_str()))
        {
            debug!("Ignoring unrecognized read option '{key}'");
        }

        Ok(resolved)
    }
}

/// Options after validation, with defaults applied
#[derive(Debug, Clone)]
pub struct ResolvedOptions {
    pub delimiter: u8,
    pub quote: u8,
    pub header: bool,
    pub infer_schema: bool,
    pub timestamp_format: Option<TimestampFormat>,
    /// Raw value read as null (empty fields by default)
    pub null_value: String,
    pub mode: ParseMode,
    pub schema: Option<Schema>,
}

impl Default for ResolvedOptions {
    fn default() -> Self {
        Self {
            delimiter: b',',
            quote: b'"',
            header: false,
            infer_schema: false,
            timestamp_format: None,
            null_value: String::new(),
            mode: ParseMode::Permissive,
            schema: None,
        }
    }
}

impl ResolvedOptions {
    /// A CSV reader configured for these options
    ///
    /// Records may have any length; the row builder reconciles them with the
    /// schema.
    pub(crate) fn csv_reader<R: Read>(&self, reader: R) -> csv::Reader<R> {
        csv::ReaderBuilder::new()
            .delimiter(self.delimiter)
            .quote(self.quote)
            .has_headers(self.header)
            .flexible(true)
            .from_reader(reader)
    }

    pub(crate) fn is_null(&self, raw: &str) -> bool {
        raw == self.null_value
    }
}

fn parse_char(key: &str, value: &str) -> Result<u8> {
    // Notebooks commonly spell tab as the two characters `\t`
    if value == "\\t" {
        return Ok(b'\t');
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) if c.is_ascii() && c != '\n' && c != '\r' => Ok(c as u8),
        (Some(c), None) if c.is_ascii() => Err(invalid(key, value, "must not be a line break")),
        (Some(_), None) => Err(invalid(
            key,
            value,
            "csv delimiters must be one byte, so only ASCII characters are supported",
        )),
        _ => Err(invalid(key, value, "must be a single character")),
    }
}

fn parse_bool(key: &str, value: &str) -> Result<bool> {
    if value.eq_ignore_ascii_case("true") {
        Ok(true)
    } else if value.eq_ignore_ascii_case("false") {
        Ok(false)
    } else {
        Err(invalid(key, value, "expected true or false"))
    }
}

fn invalid(key: &str, value: &str, reason: &str) -> ReadError {
    ReadError::InvalidOption {
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabular_types::{ColumnType, Field};

    #[test]
    fn test_defaults() {
        let resolved = ReadOptions::new().resolve().unwrap();
        assert_eq!(resolved.delimiter, b',');
        assert_eq!(resolved.quote, b'"');
        assert!(!resolved.header);
        assert!(!resolved.infer_schema);
        assert!(resolved.timestamp_format.is_none());
        assert_eq!(resolved.null_value, "");
        assert_eq!(resolved.mode, ParseMode::Permissive);
        assert!(resolved.schema.is_none());
    }

    #[test]
    fn test_explicit_options_override_defaults() {
        let resolved = ReadOptions::new()
            .option("delimiter", "\t")
            .option("header", true)
            .option("timestampFormat", "MM/dd/yyyy hh:mm:ss a")
            .option("inferSchema", "TRUE")
            .option("nullValue", "NA")
            .option("mode", "failFast")
            .resolve()
            .unwrap();
        assert_eq!(resolved.delimiter, b'\t');
        assert!(resolved.header);
        assert!(resolved.infer_schema);
        assert_eq!(
            resolved.timestamp_format.unwrap().pattern(),
            "MM/dd/yyyy hh:mm:ss a"
        );
        assert_eq!(resolved.null_value, "NA");
        assert_eq!(resolved.mode, ParseMode::FailFast);
    }

    #[test]
    fn test_keys_are_case_insensitive_and_last_wins() {
        let options = ReadOptions::from_pairs([("HEADER", "false"), ("header", "true")]);
        assert_eq!(options.get("Header"), Some("true"));
        assert!(options.resolve().unwrap().header);
    }

    #[test]
    fn test_escaped_tab_and_sep_alias() {
        let resolved = ReadOptions::new().option("sep", "\\t").resolve().unwrap();
        assert_eq!(resolved.delimiter, b'\t');
    }

    #[test]
    fn test_unrecognized_keys_are_ignored() {
        let options = ReadOptions::new()
            .option("samplingRatio", "0.1")
            .option("multiLine", "maybe");
        assert!(options.resolve().is_ok());
        assert_eq!(options.get("samplingratio"), Some("0.1"));
    }

    #[test]
    fn test_invalid_recognized_values() {
        for (key, value) in [
            ("delimiter", "ab"),
            ("delimiter", ""),
            ("delimiter", "§"),
            ("delimiter", "\""),
            ("header", "yes"),
            ("inferSchema", "1"),
            ("mode", "LENIENT"),
        ] {
            let err = ReadOptions::new().option(key, value).resolve().unwrap_err();
            assert!(
                matches!(err, ReadError::InvalidOption { .. }),
                "expected {key}={value} to be rejected, got {err:?}"
            );
        }
    }

    #[test]
    fn test_non_ascii_delimiter_reason() {
        match ReadOptions::new().option("delimiter", "§").resolve() {
            Err(ReadError::InvalidOption { reason, .. }) => {
                assert!(reason.contains("one byte"), "{reason}")
            }
            other => panic!("expected InvalidOption, got {other:?}"),
        }
    }

    #[test]
    fn test_invalid_timestamp_format() {
        let err = ReadOptions::new()
            .option("timestampFormat", "yyyy-MM-dd G")
            .resolve()
            .unwrap_err();
        assert!(matches!(err, ReadError::Types(_)));
    }

    #[test]
    fn test_declared_schema_is_carried() {
        let schema = Schema::new(vec![Field::new("ts", ColumnType::Timestamp)]);
        let options = ReadOptions::new().schema(schema.clone());
        assert_eq!(options.declared_schema(), Some(&schema));
        assert_eq!(options.resolve().unwrap().schema, Some(schema));
    }
}
