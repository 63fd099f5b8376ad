//! Error types for mount management.

use thiserror::Error;

/// Errors that can occur while mounting or locating sources.
///
/// Mounting an active mount point and unmounting an inactive one are not
/// errors; they are reported through [`crate::MountOutcome`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MountError {
    /// The remote URI could not be parsed. `uri` has its secret masked.
    #[error("Invalid remote URI '{uri}': {reason}")]
    InvalidRemoteUri { uri: String, reason: String },

    /// The mount point is not an absolute, normalised path.
    #[error("Invalid mount point '{mount_point}': {reason}")]
    InvalidMountPoint { mount_point: String, reason: String },
}

pub type Result<T> = std::result::Result<T, MountError>;
