//! Schema inference and value coercion.
//!
//! Inference looks at every non-null value of a column and keeps the
//! narrowest type that fits all of them:
//!
//! - `Integer` widens to `Double`
//! - any other disagreement widens to `String`
//! - null values are compatible with every type; an all-null column is `String`

use crate::timestamp::{parse_default_timestamp, TimestampFormat};
use crate::types::{ColumnType, Value};

/// Narrowest type a single non-null value fits
pub fn infer_value_type(raw: &str, timestamp_format: Option<&TimestampFormat>) -> ColumnType {
    if raw.parse::<i64>().is_ok() {
        return ColumnType::Integer;
    }
    if parse_double(raw).is_some() {
        return ColumnType::Double;
    }
    if parse_bool(raw).is_some() {
        return ColumnType::Boolean;
    }
    if parse_timestamp(raw, timestamp_format).is_some() {
        return ColumnType::Timestamp;
    }
    ColumnType::String
}

/// Least common type of two column types
pub fn merge_types(a: ColumnType, b: ColumnType) -> ColumnType {
    match (a, b) {
        (a, b) if a == b => a,
        (ColumnType::Integer, ColumnType::Double) | (ColumnType::Double, ColumnType::Integer) => {
            ColumnType::Double
        }
        _ => ColumnType::String,
    }
}

/// Convert a raw value to `column_type`, or `None` if it does not conform
///
/// Callers handle nulls before coercing.
pub fn coerce(
    raw: &str,
    column_type: ColumnType,
    timestamp_format: Option<&TimestampFormat>,
) -> Option<Value> {
    match column_type {
        ColumnType::String => Some(Value::String(raw.to_string())),
        ColumnType::Integer => raw.parse::<i64>().ok().map(Value::Integer),
        ColumnType::Double => raw.parse::<f64>().ok().map(Value::Double),
        ColumnType::Boolean => parse_bool(raw).map(Value::Boolean),
        ColumnType::Timestamp => parse_timestamp(raw, timestamp_format).map(Value::Timestamp),
    }
}

/// Running per-column inference state for one scan
#[derive(Debug, Clone, Default)]
pub struct ColumnInference {
    types: Vec<Option<ColumnType>>,
}

impl ColumnInference {
    pub fn new(columns: usize) -> Self {
        Self {
            types: vec![None; columns],
        }
    }

    /// Fold one non-null value of column `index` into the running type
    ///
    /// Indexes beyond the column count are ignored.
    pub fn observe(&mut self, index: usize, raw: &str, timestamp_format: Option<&TimestampFormat>) {
        let Some(slot) = self.types.get_mut(index) else {
            return;
        };
        if *slot == Some(ColumnType::String) {
            return;
        }
        let observed = infer_value_type(raw, timestamp_format);
        *slot = Some(match *slot {
            Some(current) => merge_types(current, observed),
            None => observed,
        });
    }

    /// Final column types; columns that only held nulls are `String`
    pub fn finish(self) -> Vec<ColumnType> {
        self.types
            .into_iter()
            .map(|t| t.unwrap_or(ColumnType::String))
            .collect()
    }
}

fn parse_double(raw: &str) -> Option<f64> {
    // Rust accepts "inf"/"nan"; only numerals count during inference
    let numeric = raw.bytes().any(|b| b.is_ascii_digit())
        && !raw
            .bytes()
            .any(|b| b.is_ascii_alphabetic() && b != b'e' && b != b'E');
    if numeric {
        raw.parse::<f64>().ok()
    } else {
        None
    }
}

fn parse_bool(raw: &str) -> Option<bool> {
    if raw.eq_ignore_ascii_case("true") {
        Some(true)
    } else if raw.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}

fn parse_timestamp(
    raw: &str,
    timestamp_format: Option<&TimestampFormat>,
) -> Option<chrono::NaiveDateTime> {
    match timestamp_format {
        Some(format) => format.parse_value(raw),
        None => parse_default_timestamp(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_infer_value_type() {
        assert_eq!(infer_value_type("42", None), ColumnType::Integer);
        assert_eq!(infer_value_type("-7", None), ColumnType::Integer);
        assert_eq!(infer_value_type("3.15", None), ColumnType::Double);
        assert_eq!(infer_value_type("1e3", None), ColumnType::Double);
        assert_eq!(infer_value_type("TRUE", None), ColumnType::Boolean);
        assert_eq!(
            infer_value_type("2015-03-16T00:09:55", None),
            ColumnType::Timestamp
        );
        assert_eq!(infer_value_type("inf", None), ColumnType::String);
        assert_eq!(infer_value_type("mobile", None), ColumnType::String);
    }

    #[test]
    fn test_infer_timestamp_uses_format() {
        let format = TimestampFormat::parse("MM/dd/yyyy hh:mm:ss a").unwrap();
        assert_eq!(
            infer_value_type("01/10/2018 11:52:00 PM", Some(&format)),
            ColumnType::Timestamp
        );
        // ISO values no longer match once a format is set
        assert_eq!(
            infer_value_type("2018-01-10T23:52:00", Some(&format)),
            ColumnType::String
        );
    }

    #[test]
    fn test_merge_types() {
        use ColumnType::*;
        assert_eq!(merge_types(Integer, Integer), Integer);
        assert_eq!(merge_types(Integer, Double), Double);
        assert_eq!(merge_types(Double, Integer), Double);
        assert_eq!(merge_types(Integer, Boolean), String);
        assert_eq!(merge_types(Timestamp, Integer), String);
        assert_eq!(merge_types(Timestamp, Timestamp), Timestamp);
    }

    #[test]
    fn test_column_inference() {
        let mut inference = ColumnInference::new(4);
        for (a, b, c) in [("1", "x", "true"), ("2.5", "y", "false"), ("3", "z", "true")] {
            inference.observe(0, a, None);
            inference.observe(1, b, None);
            inference.observe(2, c, None);
        }
        // out of range and the never-observed column 3
        inference.observe(9, "1", None);

        assert_eq!(
            inference.finish(),
            vec![
                ColumnType::Double,
                ColumnType::String,
                ColumnType::Boolean,
                ColumnType::String
            ]
        );
    }

    #[test]
    fn test_coerce() {
        assert_eq!(
            coerce("42", ColumnType::Integer, None),
            Some(Value::Integer(42))
        );
        assert_eq!(coerce("4.2", ColumnType::Integer, None), None);
        assert_eq!(
            coerce("42", ColumnType::Double, None),
            Some(Value::Double(42.0))
        );
        assert_eq!(
            coerce("False", ColumnType::Boolean, None),
            Some(Value::Boolean(false))
        );
        assert_eq!(coerce("yes", ColumnType::Boolean, None), None);
        assert_eq!(
            coerce("42", ColumnType::String, None),
            Some(Value::String("42".to_string()))
        );
    }

    #[test]
    fn test_coerce_timestamp_mismatch_is_none() {
        let format = TimestampFormat::parse("yyyy-MM-dd HH:mm:ss").unwrap();
        assert!(coerce("2018-01-10 23:52:00", ColumnType::Timestamp, Some(&format)).is_some());
        assert_eq!(coerce("not a date", ColumnType::Timestamp, Some(&format)), None);
    }
}
