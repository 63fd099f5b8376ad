//! Delimited text reader for mount-ingest
//!
//! Reads CSV/TSV files addressed by mount path, direct URI or local path and
//! returns named columns plus lazily parsed rows. Options follow Spark's CSV
//! reader: `delimiter` (alias `sep`), `header`, `inferSchema`,
//! `timestampFormat`, `quote`, `nullValue` and `mode`.
//!
//! # Example
//!
//! ```ignore
//! use mount_ingest_tabular::{ReadOptions, TabularReader};
//!
//! let options = ReadOptions::new()
//!     .option("header", true)
//!     .option("delimiter", "\t");
//! let result = TabularReader::new()
//!     .read("/mnt/training/wikipedia/pageviews/pageviews_by_second.tsv", &options)
//!     .await?;
//! println!("{:?}", result.columns());
//! let rows = tokio::task::spawn_blocking(move || result.count()).await??;
//! ```

mod error;
mod options;
mod reader;
mod result;

pub use error::{ReadError, Result};
pub use options::{ParseMode, ReadOptions, ResolvedOptions};
pub use reader::TabularReader;
pub use result::{Row, Rows, TabularResult};

pub use tabular_types::{ColumnType, Field, Schema, Value};
