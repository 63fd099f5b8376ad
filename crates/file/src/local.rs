//! Local filesystem file reader implementation

use crate::{is_hidden, FileEntry, ResolvedSource};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tokio::io::AsyncReadExt;

/// Reads a local file with configurable buffering
pub struct LocalFileReader;

impl LocalFileReader {
    /// Open a local file and return a buffered, sync-compatible reader
    ///
    /// The file is streamed, not loaded into memory, so large sources can be
    /// iterated lazily.
    pub async fn open(path: PathBuf, buffer_size: usize) -> Result<Box<dyn std::io::Read + Send>> {
        let file = tokio::fs::File::open(&path)
            .await
            .with_context(|| format!("Failed to open file: {}", path.display()))?;
        let reader = std::io::BufReader::with_capacity(buffer_size, file.into_std().await);
        Ok(Box::new(reader))
    }
}

/// Resolve a local path into the files it covers
///
/// Missing paths resolve to an empty list.
pub async fn resolve(path: &Path) -> Result<Vec<ResolvedSource>> {
    let metadata = match tokio::fs::metadata(path).await {
        Ok(metadata) => metadata,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => {
            return Err(e).with_context(|| format!("Failed to stat: {}", path.display()));
        }
    };

    if !metadata.is_dir() {
        return Ok(vec![ResolvedSource::Local(path.to_path_buf())]);
    }

    let results: Vec<ResolvedSource> = list_directory(path)
        .await?
        .into_iter()
        .filter(|e| !e.is_dir && !is_hidden(&e.name))
        .map(|e| ResolvedSource::Local(path.join(e.name)))
        .collect();

    tracing::debug!(
        "Resolved {} files in directory: {}",
        results.len(),
        path.display()
    );

    Ok(results)
}

/// List a local directory, or describe a single local file
pub async fn list(path: &Path) -> Result<Vec<FileEntry>> {
    let metadata = tokio::fs::metadata(path)
        .await
        .with_context(|| format!("No such file or directory: {}", path.display()))?;

    if metadata.is_dir() {
        list_directory(path).await
    } else {
        Ok(vec![FileEntry {
            name: path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            path: path.display().to_string(),
            size: metadata.len(),
            is_dir: false,
        }])
    }
}

/// Read at most `max_bytes` from the start of a local file
pub async fn head(path: &Path, max_bytes: usize) -> Result<Vec<u8>> {
    let file = tokio::fs::File::open(path)
        .await
        .with_context(|| format!("Failed to open file: {}", path.display()))?;
    let mut buffer = Vec::with_capacity(max_bytes.min(crate::DEFAULT_BUFFER_SIZE));
    file.take(max_bytes as u64)
        .read_to_end(&mut buffer)
        .await
        .with_context(|| format!("Failed to read file: {}", path.display()))?;
    Ok(buffer)
}

/// List all entries in a directory (non-recursive, immediate children only)
async fn list_directory(path: &Path) -> Result<Vec<FileEntry>> {
    let mut results = Vec::new();

    let mut entries = tokio::fs::read_dir(path)
        .await
        .with_context(|| format!("Failed to read directory: {}", path.display()))?;

    while let Some(entry) = entries.next_entry().await? {
        let entry_path = entry.path();
        let metadata = entry
            .metadata()
            .await
            .with_context(|| format!("Failed to get metadata for: {}", entry_path.display()))?;

        let mut name = entry.file_name().to_string_lossy().into_owned();
        if metadata.is_dir() {
            name.push('/');
        }
        results.push(FileEntry {
            name,
            path: entry_path.display().to_string(),
            size: if metadata.is_dir() { 0 } else { metadata.len() },
            is_dir: metadata.is_dir(),
        });
    }

    // Sort for consistent ordering
    results.sort_by(|a, b| a.name.cmp(&b.name));

    Ok(results)
}
