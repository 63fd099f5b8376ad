//! Read results and the row iterator.

use std::collections::VecDeque;
use std::io::Read;

use csv::ByteRecord;
use tabular_types::{coerce, Schema, Value};
use tracing::{debug, warn};

use crate::error::{ReadError, Result};
use crate::options::{ParseMode, ResolvedOptions};

/// One file being read, already past its header record when `header=true`
pub(crate) struct OpenedSource {
    pub name: String,
    pub reader: csv::Reader<Box<dyn Read + Send>>,
}

/// One row, with a value per schema column
#[derive(Debug, Clone, PartialEq)]
pub struct Row(Vec<Value>);

impl Row {
    pub fn values(&self) -> &[Value] {
        &self.0
    }

    pub fn get(&self, index: usize) -> Option<&Value> {
        self.0.get(index)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_values(self) -> Vec<Value> {
        self.0
    }
}

/// Named columns plus the rows of every file that was read
///
/// Rows are parsed lazily. Iterating S3-backed results blocks on network
/// reads, so do it off the async runtime (`tokio::task::spawn_blocking`).
pub struct TabularResult {
    schema: Schema,
    options: ResolvedOptions,
    sources: VecDeque<OpenedSource>,
}

impl TabularResult {
    pub(crate) fn new(
        schema: Schema,
        options: ResolvedOptions,
        sources: VecDeque<OpenedSource>,
    ) -> Self {
        Self {
            schema,
            options,
            sources,
        }
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// Column names in order
    pub fn columns(&self) -> Vec<&str> {
        self.schema.names()
    }

    /// Consume the result into its rows
    pub fn rows(self) -> Rows {
        Rows {
            schema: self.schema,
            options: self.options,
            pending: self.sources,
            current: None,
            record: ByteRecord::new(),
            done: false,
        }
    }

    /// Consume the result, counting rows
    pub fn count(self) -> Result<u64> {
        self.rows().try_fold(0u64, |count, row| row.map(|_| count + 1))
    }

    /// Consume the result, collecting at most `limit` rows (all when `None`)
    pub fn collect_rows(self, limit: Option<usize>) -> Result<Vec<Row>> {
        self.rows()
            .take(limit.unwrap_or(usize::MAX))
            .collect()
    }
}

impl std::fmt::Debug for TabularResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TabularResult")
            .field("schema", &self.schema)
            .field(
                "sources",
                &self.sources.iter().map(|s| &s.name).collect::<Vec<_>>(),
            )
            .finish()
    }
}

/// Iterator over the rows of a [`TabularResult`]
///
/// Stops after the first error.
pub struct Rows {
    schema: Schema,
    options: ResolvedOptions,
    pending: VecDeque<OpenedSource>,
    current: Option<OpenedSource>,
    record: ByteRecord,
    done: bool,
}

impl Iterator for Rows {
    type Item = Result<Row>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        loop {
            if self.current.is_none() {
                match self.pending.pop_front() {
                    Some(source) => {
                        debug!("Reading rows from {}", source.name);
                        self.current = Some(source);
                    }
                    None => {
                        self.done = true;
                        return None;
                    }
                }
            }
            let source = self.current.as_mut()?;

            match source.reader.read_byte_record(&mut self.record) {
                Ok(true) => {}
                Ok(false) => {
                    self.current = None;
                    continue;
                }
                Err(e) => {
                    self.done = true;
                    return Some(Err(ReadError::Csv(e)));
                }
            }

            let (row, malformed) = build_row(&self.record, &self.schema, &self.options);
            let Some(reason) = malformed else {
                return Some(Ok(row));
            };
            let line = self.record.position().map_or(0, |p| p.line());
            match self.options.mode {
                ParseMode::Permissive => return Some(Ok(row)),
                ParseMode::DropMalformed => {
                    warn!("Dropping malformed record in {} at line {line}: {reason}", source.name);
                    continue;
                }
                ParseMode::FailFast => {
                    self.done = true;
                    return Some(Err(ReadError::MalformedRecord {
                        source_name: source.name.clone(),
                        line,
                        reason,
                    }));
                }
            }
        }
    }
}

/// Reconcile a record with the schema
///
/// Short records are padded with nulls, extra fields dropped and values that
/// do not coerce become null. The second element says why the record did not
/// fit, if it did not.
fn build_row(
    record: &ByteRecord,
    schema: &Schema,
    options: &ResolvedOptions,
) -> (Row, Option<String>) {
    let mut malformed = (record.len() != schema.len()).then(|| {
        format!(
            "expected {} fields, found {}",
            schema.len(),
            record.len()
        )
    });

    let values = schema
        .fields
        .iter()
        .enumerate()
        .map(|(index, field)| {
            let Some(bytes) = record.get(index) else {
                return Value::Null;
            };
            let raw = String::from_utf8_lossy(bytes);
            if options.is_null(&raw) {
                return Value::Null;
            }
            let timestamp_format = options
                .timestamp_format
                .as_ref()
                .filter(|_| field.column_type.is_temporal());
            coerce(&raw, field.column_type, timestamp_format).unwrap_or_else(
                || {
                    malformed.get_or_insert_with(|| {
                        format!(
                            "'{raw}' is not a valid {} for column '{}'",
                            field.column_type, field.name
                        )
                    });
                    Value::Null
                },
            )
        })
        .collect();

    (Row(values), malformed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabular_types::{ColumnType, Field, TimestampFormat};

    fn record(fields: &[&str]) -> ByteRecord {
        ByteRecord::from(fields.to_vec())
    }

    fn schema() -> Schema {
        Schema::new(vec![
            Field::new("id", ColumnType::Integer),
            Field::new("name", ColumnType::String),
            Field::new("at", ColumnType::Timestamp),
        ])
    }

    fn result_from(data: &'static str, options: ResolvedOptions) -> TabularResult {
        let reader: Box<dyn Read + Send> = Box::new(data.as_bytes());
        let source = OpenedSource {
            name: "memory".to_string(),
            reader: options.csv_reader(reader),
        };
        TabularResult::new(schema(), options, VecDeque::from([source]))
    }

    #[test]
    fn test_build_row_conforming() {
        let (row, malformed) = build_row(
            &record(&["1", "a", "2018-01-10 23:52:00"]),
            &schema(),
            &ResolvedOptions::default(),
        );
        assert!(malformed.is_none());
        assert_eq!(row.get(0), Some(&Value::Integer(1)));
        assert_eq!(row.get(1), Some(&Value::String("a".to_string())));
        assert!(row.get(2).unwrap().as_timestamp().is_some());
    }

    #[test]
    fn test_build_row_pads_and_truncates() {
        let options = ResolvedOptions::default();
        let (short, reason) = build_row(&record(&["1"]), &schema(), &options);
        assert_eq!(short.values(), &[Value::Integer(1), Value::Null, Value::Null]);
        assert_eq!(reason.unwrap(), "expected 3 fields, found 1");

        let (long, reason) = build_row(&record(&["1", "a", "", "extra"]), &schema(), &options);
        assert_eq!(long.len(), 3);
        assert!(reason.is_some());
    }

    #[test]
    fn test_build_row_nulls_and_mismatches() {
        let options = ResolvedOptions {
            null_value: "NA".to_string(),
            timestamp_format: Some(TimestampFormat::parse("MM/dd/yyyy").unwrap()),
            ..ResolvedOptions::default()
        };
        let (row, reason) = build_row(&record(&["NA", "", "2018-01-10"]), &schema(), &options);
        assert_eq!(row.get(0), Some(&Value::Null));
        // only the configured null value is null
        assert_eq!(row.get(1), Some(&Value::String(String::new())));
        assert_eq!(row.get(2), Some(&Value::Null));
        assert!(reason.unwrap().contains("column 'at'"));
    }

    #[test]
    fn test_modes() {
        let data = "1,a,2018-01-10 23:52:00\nx,b,2018-01-10 23:52:00\n3,c,2018-01-10 23:52:00\n";

        let permissive = result_from(data, ResolvedOptions::default());
        let rows = permissive.collect_rows(None).unwrap();
        assert_eq!(rows.len(), 3);
        assert_eq!(rows[1].get(0), Some(&Value::Null));

        let dropping = result_from(
            data,
            ResolvedOptions {
                mode: ParseMode::DropMalformed,
                ..ResolvedOptions::default()
            },
        );
        assert_eq!(dropping.count().unwrap(), 2);

        let failing = result_from(
            data,
            ResolvedOptions {
                mode: ParseMode::FailFast,
                ..ResolvedOptions::default()
            },
        );
        let mut rows = failing.rows();
        assert!(rows.next().unwrap().is_ok());
        match rows.next() {
            Some(Err(ReadError::MalformedRecord {
                source_name, line, ..
            })) => {
                assert_eq!(source_name, "memory");
                assert_eq!(line, 2);
            }
            other => panic!("expected MalformedRecord, got {other:?}"),
        }
        assert!(rows.next().is_none());
    }

    #[test]
    fn test_collect_rows_limit() {
        let data = "1,a,\n2,b,\n3,c,\n";
        let result = result_from(data, ResolvedOptions::default());
        assert_eq!(result.columns(), vec!["id", "name", "at"]);
        assert_eq!(result.collect_rows(Some(2)).unwrap().len(), 2);
    }
}
