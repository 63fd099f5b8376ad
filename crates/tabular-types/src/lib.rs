//! Tabular value types for delimited text sources.
//!
//! # Modules
//!
//! - [`types`] - `ColumnType`, `Value`, `Field` and declared `Schema`s
//! - [`infer`] - schema inference lattice and raw value coercion
//! - [`timestamp`] - `SimpleDateFormat`-style timestamp patterns
//!
//! # Example
//!
//! ```ignore
//! use tabular_types::{coerce, ColumnType, TimestampFormat};
//!
//! let format = TimestampFormat::parse("MM/dd/yyyy hh:mm:ss a")?;
//! let value = coerce("01/10/2018 11:52:00 PM", ColumnType::Timestamp, Some(&format));
//! ```

pub mod error;
pub mod infer;
pub mod timestamp;
pub mod types;

pub use error::{Result, TypesError};
pub use infer::{coerce, infer_value_type, merge_types, ColumnInference};
pub use timestamp::{parse_default_timestamp, TimestampFormat};
pub use types::{ColumnType, Field, Schema, Value};
