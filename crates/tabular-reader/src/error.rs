use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReadError {
    /// The path resolves to no file under any active mount or known location.
    #[error("Source not found: {0}")]
    SourceNotFound(String),

    #[error(transparent)]
    Mount(#[from] mount_ingest_mount::MountError),

    #[error("Invalid value '{value}' for option '{key}': {reason}")]
    InvalidOption {
        key: String,
        value: String,
        reason: String,
    },

    /// Only raised in FAILFAST mode.
    #[error("Malformed record in {source_name} at line {line}: {reason}")]
    MalformedRecord {
        source_name: String,
        line: u64,
        reason: String,
    },

    #[error(transparent)]
    Types(#[from] tabular_types::TypesError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// Opening or listing the underlying files failed.
    #[error("{0:#}")]
    Source(anyhow::Error),

    #[error("Background scan failed: {0}")]
    Task(#[from] tokio::task::JoinError),
}

pub type Result<T> = std::result::Result<T, ReadError>;

impl ReadError {
    /// `SourceNotFound` for a read path, with any embedded secret masked
    pub(crate) fn source_not_found(path: &str) -> Self {
        ReadError::SourceNotFound(mount_ingest_mount::redact(path))
    }
}
