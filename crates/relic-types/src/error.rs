//! Error types for the foundation crate.

use crate::status::WorkspaceFileStatus;

/// Errors from constructing or validating foundation types.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TypeError {
    /// The checksum string is empty or contains non-hex characters.
    #[error("invalid checksum: {0:?}")]
    InvalidChecksum(String),

    /// The workspace path does not exist.
    #[error("path {0:?} does not exist")]
    PathAbsent(String),

    /// The workspace path holds a file type relic cannot track.
    #[error("unsupported file type for path {path:?}: {status}")]
    UnsupportedFileType {
        path: String,
        status: WorkspaceFileStatus,
    },
}

/// Result alias for foundation type operations.
pub type TypeResult<T> = Result<T, TypeError>;
