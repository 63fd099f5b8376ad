//! File source abstraction for reading from the local filesystem or S3
//!
//! This crate provides a unified interface for opening, listing and peeking
//! at files that live either on local disk or in an S3 bucket.
//!
//! # Source Types
//!
//! - **Local**: Files or directories on the local filesystem
//! - **S3**: Objects or prefixes in AWS S3 buckets, optionally with static credentials
//!
//! # Directory Detection
//!
//! A source that names a directory (local) or a prefix with no object of the
//! same key (S3) is expanded into the files directly under it. Names starting
//! with `_` or `.` (`_SUCCESS`, `.crc` files and the like) are skipped.
//!
//! # Example
//!
//! ```ignore
//! use mount_ingest_file::{FileSource, DEFAULT_BUFFER_SIZE};
//!
//! let source = FileSource::Local("/data/files/".into());
//! for file in source.resolve().await? {
//!     let reader = file.open(DEFAULT_BUFFER_SIZE).await?;
//!     // Process reader...
//! }
//! ```

mod local;
mod s3;

use anyhow::Result;
use std::path::PathBuf;

pub use local::LocalFileReader;
pub use s3::{S3Client, S3Credentials, S3FileReader};

/// Default buffer size for reading operations (1MB)
pub const DEFAULT_BUFFER_SIZE: usize = 1024 * 1024;

/// Default number of bytes returned by [`FileSource::head`]
pub const DEFAULT_HEAD_BYTES: usize = 65536;

/// Unified source type representing a file location
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileSource {
    /// Local filesystem path (file or directory)
    Local(PathBuf),
    /// S3 location (object or prefix)
    S3 {
        bucket: String,
        key: String,
        credentials: Option<S3Credentials>,
    },
}

impl FileSource {
    /// Check if this source is explicitly a directory/prefix (ends with /)
    pub fn is_directory(&self) -> bool {
        match self {
            FileSource::Local(path) => {
                path.to_string_lossy().ends_with('/')
                    || path.to_string_lossy().ends_with(std::path::MAIN_SEPARATOR)
            }
            FileSource::S3 { key, .. } => key.is_empty() || key.ends_with('/'),
        }
    }

    /// Resolve this source into the concrete files it covers
    ///
    /// A single file resolves to itself. A directory or prefix resolves to its
    /// immediate, non-hidden files in sorted order. A location that does not
    /// exist resolves to an empty list; callers decide whether that is fatal.
    pub async fn resolve(&self) -> Result<Vec<ResolvedSource>> {
        match self {
            FileSource::Local(path) => local::resolve(path).await,
            FileSource::S3 {
                bucket,
                key,
                credentials,
            } => {
                let client = S3Client::new(credentials.clone()).await?;
                if !self.is_directory() && client.object_exists(bucket, key).await? {
                    return Ok(vec![ResolvedSource::S3 {
                        bucket: bucket.clone(),
                        key: key.clone(),
                        credentials: credentials.clone(),
                    }]);
                }
                let prefix = directory_prefix(key);
                let entries = client.list_prefix(bucket, &prefix).await?;
                Ok(entries
                    .into_iter()
                    .filter(|e| !e.is_dir && !is_hidden(&e.name))
                    .map(|e| ResolvedSource::S3 {
                        bucket: bucket.clone(),
                        key: format!("{prefix}{}", e.name),
                        credentials: credentials.clone(),
                    })
                    .collect())
            }
        }
    }

    /// List the entries of a directory or prefix (or the single file named)
    pub async fn list(&self) -> Result<Vec<FileEntry>> {
        match self {
            FileSource::Local(path) => local::list(path).await,
            FileSource::S3 {
                bucket,
                key,
                credentials,
            } => {
                let client = S3Client::new(credentials.clone()).await?;
                if !self.is_directory() {
                    if let Some(size) = client.object_size(bucket, key).await? {
                        let name = key.rsplit('/').next().unwrap_or(key).to_string();
                        return Ok(vec![FileEntry {
                            name,
                            path: self.display_name(),
                            size,
                            is_dir: false,
                        }]);
                    }
                }
                let entries = client.list_prefix(bucket, &directory_prefix(key)).await?;
                if entries.is_empty() {
                    anyhow::bail!("No such file or directory: {}", self.display_name());
                }
                Ok(entries)
            }
        }
    }

    /// Read up to `max_bytes` from the start of the file as (lossy) UTF-8
    pub async fn head(&self, max_bytes: usize) -> Result<String> {
        let bytes = match self {
            FileSource::Local(path) => local::head(path, max_bytes).await?,
            FileSource::S3 {
                bucket,
                key,
                credentials,
            } => {
                let client = S3Client::new(credentials.clone()).await?;
                client.read_range(bucket, key, max_bytes).await?
            }
        };
        if bytes.len() == max_bytes {
            tracing::info!(
                "Truncated {} to the first {} bytes",
                self.display_name(),
                max_bytes
            );
        }
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        match self {
            FileSource::Local(path) => path.display().to_string(),
            FileSource::S3 { bucket, key, .. } => format!("s3://{bucket}/{key}"),
        }
    }
}

/// A resolved single file source ready for reading
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolvedSource {
    /// Local file
    Local(PathBuf),
    /// S3 object
    S3 {
        bucket: String,
        key: String,
        credentials: Option<S3Credentials>,
    },
}

impl ResolvedSource {
    /// Open this source and return a reader
    ///
    /// S3 readers bridge an async body into `std::io::Read`; they must be
    /// consumed outside the async runtime's worker threads.
    pub async fn open(&self, buffer_size: usize) -> Result<Box<dyn std::io::Read + Send>> {
        match self {
            ResolvedSource::Local(path) => LocalFileReader::open(path.clone(), buffer_size).await,
            ResolvedSource::S3 {
                bucket,
                key,
                credentials,
            } => S3FileReader::open(bucket, key, credentials.clone(), buffer_size).await,
        }
    }

    /// Get a display name for logging
    pub fn display_name(&self) -> String {
        match self {
            ResolvedSource::Local(path) => path.display().to_string(),
            ResolvedSource::S3 { bucket, key, .. } => format!("s3://{bucket}/{key}"),
        }
    }
}

/// A directory listing entry, as printed by `ls`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Entry name relative to the listed directory (directories end with `/`)
    pub name: String,
    /// Full display path of the entry
    pub path: String,
    /// Size in bytes (0 for directories)
    pub size: u64,
    /// Whether the entry is a directory or common prefix
    pub is_dir: bool,
}

/// Whether a file name is skipped when a directory is expanded
pub fn is_hidden(name: &str) -> bool {
    name.starts_with('_') || name.starts_with('.')
}

fn directory_prefix(key: &str) -> String {
    if key.is_empty() || key.ends_with('/') {
        key.to_string()
    } else {
        format!("{key}/")
    }
}
