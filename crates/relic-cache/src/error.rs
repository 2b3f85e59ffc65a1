//! Error types for cache operations.

use std::path::PathBuf;

use relic_types::{TypeError, WorkspaceFileStatus};

/// Errors from cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The cache root path was empty.
    #[error("cache directory path must be set")]
    EmptyCacheDir,

    /// The commit source does not exist.
    ///
    /// Kept as its own variant (rather than wrapped I/O) so callers can
    /// distinguish "nothing to commit" from genuine I/O failure.
    #[error("source file {path:?} does not exist")]
    SourceNotFound { path: PathBuf },

    /// The commit source is not a regular file.
    #[error("file {path:?} is not a regular file")]
    NotARegularFile { path: PathBuf },

    /// The commit source is not a directory.
    #[error("path {path:?} is not a directory")]
    NotADirectory { path: PathBuf },

    /// The checksum cannot address an object in a sharded cache.
    #[error("invalid checksum: {0:?}")]
    InvalidChecksum(String),

    /// Checkout was asked to restore an artifact that was never committed.
    #[error("artifact {path:?} has no checksum")]
    MissingChecksum { path: String },

    /// Checkout found no object at the checksum's cache path.
    #[error("no cache object {checksum} for artifact {path:?}")]
    MissingCacheObject { checksum: String, path: String },

    /// A workspace path holds a file type the cache cannot handle.
    #[error("unsupported file type at {path:?}: {status}")]
    UnsupportedFileType {
        path: PathBuf,
        status: WorkspaceFileStatus,
    },

    /// A directory manifest could not be encoded or decoded.
    #[error("directory manifest for {path:?}: {reason}")]
    Manifest { path: String, reason: String },

    /// Another process holds the advisory lock.
    #[error("another relic process holds the lock at {path:?}")]
    LockHeld { path: PathBuf },

    /// An I/O failure, wrapped with the operation and offending path.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    /// A foundation type rejected its input.
    #[error(transparent)]
    Type(#[from] TypeError),
}

impl CacheError {
    /// Wrap an I/O error with a context string naming the failing path.
    pub(crate) fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }
}

/// Result alias for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;
