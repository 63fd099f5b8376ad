//! Resolving a read path and building its result.

use std::collections::{HashMap, VecDeque};

use mount_ingest_file::{ResolvedSource, DEFAULT_BUFFER_SIZE};
use mount_ingest_mount::MountManager;
use tabular_types::{ColumnInference, Field, Schema};
use tracing::{debug, info};

use crate::error::{ReadError, Result};
use crate::options::{ReadOptions, ResolvedOptions};
use crate::result::{OpenedSource, TabularResult};

/// Reads delimited text files through a mount table
#[derive(Debug, Clone, Copy)]
pub struct TabularReader<'a> {
    mounts: &'a MountManager,
    buffer_size: usize,
}

impl TabularReader<'static> {
    /// A reader over the process-wide mount table
    pub fn new() -> Self {
        Self::with_mounts(MountManager::global())
    }
}

impl Default for TabularReader<'static> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> TabularReader<'a> {
    pub fn with_mounts(mounts: &'a MountManager) -> Self {
        Self {
            mounts,
            buffer_size: DEFAULT_BUFFER_SIZE,
        }
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    /// Read `path` (a file, a directory of files, or a remote URI)
    ///
    /// Options are validated first. With `inferSchema=true` every file is
    /// scanned once to type the columns and then reopened for the rows.
    pub async fn read(&self, path: &str, options: &ReadOptions) -> Result<TabularResult> {
        let options = options.resolve()?;
        let source = self.mounts.locate(path)?;

        let files = source.resolve().await.map_err(ReadError::Source)?;
        if files.is_empty() {
            return Err(ReadError::source_not_found(path));
        }
        info!(
            "Reading {} file(s) from {}",
            files.len(),
            source.display_name()
        );

        let opened = self.open_all(&files, &options).await?;

        let (schema, opened) = match (&options.schema, options.infer_schema) {
            (Some(schema), _) => {
                debug!("Using declared schema with {} column(s)", schema.len());
                (schema.clone(), opened)
            }
            (None, false) => {
                let scan_options = options.clone();
                tokio::task::spawn_blocking(move || {
                    let mut opened = opened;
                    let names = column_names(&mut opened, &scan_options)?;
                    Ok::<_, ReadError>((Schema::strings(names), opened))
                })
                .await??
            }
            (None, true) => {
                let scan_options = options.clone();
                let schema =
                    tokio::task::spawn_blocking(move || infer_schema(opened, &scan_options))
                        .await??;
                // the scan consumed the readers
                (schema, self.open_all(&files, &options).await?)
            }
        };

        debug!("Columns: {:?}", schema.names());
        Ok(TabularResult::new(schema, options, opened))
    }

    async fn open_all(
        &self,
        files: &[ResolvedSource],
        options: &ResolvedOptions,
    ) -> Result<VecDeque<OpenedSource>> {
        let mut opened = VecDeque::with_capacity(files.len());
        for file in files {
            let reader = file
                .open(self.buffer_size)
                .await
                .map_err(ReadError::Source)?;
            opened.push_back(OpenedSource {
                name: file.display_name(),
                reader: options.csv_reader(reader),
            });
        }
        Ok(opened)
    }
}

/// Column names from the first non-empty file
///
/// The header record when `header=true`, otherwise `_c0`, `_c1`, … sized by
/// the first record. With `header=false` the peeked record is still yielded
/// as a row.
fn column_names(sources: &mut VecDeque<OpenedSource>, options: &ResolvedOptions) -> Result<Vec<String>> {
    for source in sources.iter_mut() {
        let first = source.reader.byte_headers()?;
        if first.is_empty() {
            debug!("Skipping empty file {} while naming columns", source.name);
            continue;
        }
        if !options.header {
            return Ok((0..first.len()).map(|i| format!("_c{i}")).collect());
        }
        let tokens: Vec<String> = first
            .iter()
            .enumerate()
            .map(|(i, token)| {
                if token.is_empty() {
                    format!("_c{i}")
                } else {
                    String::from_utf8_lossy(token).into_owned()
                }
            })
            .collect();
        return Ok(deduplicate(tokens));
    }
    Ok(Vec::new())
}

/// Repeated names get their position appended (`a`, `a` becomes `a0`, `a1`)
fn deduplicate(names: Vec<String>) -> Vec<String> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    for name in &names {
        *counts.entry(name.as_str()).or_default() += 1;
    }
    let repeated: Vec<bool> = names.iter().map(|n| counts[n.as_str()] > 1).collect();
    names
        .into_iter()
        .zip(repeated)
        .enumerate()
        .map(|(i, (name, repeated))| if repeated { format!("{name}{i}") } else { name })
        .collect()
}

/// Scan every record of every file and type each column
fn infer_schema(mut sources: VecDeque<OpenedSource>, options: &ResolvedOptions) -> Result<Schema> {
    let names = column_names(&mut sources, options)?;
    let timestamp_format = options.timestamp_format.as_ref();
    let mut inference = ColumnInference::new(names.len());
    let mut record = csv::ByteRecord::new();
    let mut scanned = 0u64;

    for source in sources.iter_mut() {
        while source.reader.read_byte_record(&mut record)? {
            for (index, bytes) in record.iter().enumerate() {
                let raw = String::from_utf8_lossy(bytes);
                if !options.is_null(&raw) {
                    inference.observe(index, &raw, timestamp_format);
                }
            }
            scanned += 1;
        }
    }

    let schema = Schema::new(
        names
            .into_iter()
            .zip(inference.finish())
            .map(|(name, column_type)| Field::new(name, column_type))
            .collect(),
    );
    info!(
        "Inferred {} column(s) from {scanned} record(s)",
        schema.len()
    );
    Ok(schema)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Read;
    use tabular_types::ColumnType;

    fn sources(files: &[&'static str], options: &ResolvedOptions) -> VecDeque<OpenedSource> {
        files
            .iter()
            .enumerate()
            .map(|(i, data)| {
                let reader: Box<dyn Read + Send> = Box::new(data.as_bytes());
                OpenedSource {
                    name: format!("file{i}"),
                    reader: options.csv_reader(reader),
                }
            })
            .collect()
    }

    #[test]
    fn test_positional_names_keep_first_record() {
        let options = ResolvedOptions::default();
        let mut opened = sources(&["a,b,c\n1,2,3\n"], &options);
        let names = column_names(&mut opened, &options).unwrap();
        assert_eq!(names, vec!["_c0", "_c1", "_c2"]);

        let result = TabularResult::new(Schema::strings(names), options, opened);
        assert_eq!(result.count().unwrap(), 2);
    }

    #[test]
    fn test_header_names_skip_empty_files() {
        let options = ResolvedOptions {
            header: true,
            ..ResolvedOptions::default()
        };
        let mut opened = sources(&["", "site,,site\nx,y,z\n"], &options);
        assert_eq!(
            column_names(&mut opened, &options).unwrap(),
            vec!["site0", "_c1", "site2"]
        );
    }

    #[test]
    fn test_header_tokens_are_kept_verbatim() {
        let options = ResolvedOptions {
            header: true,
            ..ResolvedOptions::default()
        };
        let mut opened = sources(&[" id , name\n1,a\n"], &options);
        assert_eq!(
            column_names(&mut opened, &options).unwrap(),
            vec![" id ", " name"]
        );
    }

    #[test]
    fn test_no_records_gives_no_columns() {
        let options = ResolvedOptions::default();
        let mut opened = sources(&["", ""], &options);
        assert!(column_names(&mut opened, &options).unwrap().is_empty());
    }

    #[test]
    fn test_infer_schema_across_files() {
        let options = ResolvedOptions {
            header: true,
            ..ResolvedOptions::default()
        };
        let opened = sources(
            &[
                "n,x,flag,when\n1,1,true,2015-03-16T00:09:55\n",
                "n,x,flag,when\n2,2.5,false,\n",
            ],
            &options,
        );
        let schema = infer_schema(opened, &options).unwrap();
        assert_eq!(schema.names(), vec!["n", "x", "flag", "when"]);
        let types: Vec<ColumnType> = schema.fields.iter().map(|f| f.column_type).collect();
        assert_eq!(
            types,
            vec![
                ColumnType::Integer,
                ColumnType::Double,
                ColumnType::Boolean,
                ColumnType::Timestamp
            ]
        );
    }
}
