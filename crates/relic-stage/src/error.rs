//! Error types for stage loading and persistence.

use std::path::PathBuf;

/// Errors from loading or writing stage files.
#[derive(Debug, thiserror::Error)]
pub enum StageError {
    /// The stage file does not exist.
    #[error("stage file {path:?} does not exist")]
    NotFound { path: PathBuf },

    /// The stage file exists but could not be parsed.
    #[error("malformed stage file {path:?}: {reason}")]
    Malformed { path: PathBuf, reason: String },

    /// The stage could not be serialized for writing back.
    #[error("serializing stage for {path:?}: {reason}")]
    Serialize { path: PathBuf, reason: String },

    /// An I/O failure, wrapped with the offending path.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for stage operations.
pub type StageResult<T> = Result<T, StageError>;
