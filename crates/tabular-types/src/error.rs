//! Error types for tabular type handling.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum TypesError {
    /// A timestamp pattern uses a letter with no chrono equivalent.
    #[error("Invalid timestamp format '{pattern}': {reason}")]
    InvalidTimestampFormat { pattern: String, reason: String },

    /// Error reading a schema file
    #[error("Failed to read schema file: {0}")]
    Io(#[from] std::io::Error),

    /// Error parsing schema YAML
    #[error("Failed to parse schema YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    /// A schema that parses but cannot be used
    #[error("Invalid schema: {0}")]
    InvalidSchema(String),
}

pub type Result<T> = std::result::Result<T, TypesError>;
