//! Error types for index operations.

use relic_cache::CacheError;
use relic_stage::StageError;

/// Errors from index operations.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
    /// The dependency graph loops back through a stage still being
    /// traversed. The payload names the stage that closed the cycle.
    #[error("dependency cycle detected at stage {0:?}")]
    DependencyCycle(String),

    /// A stage file failed to load.
    #[error(transparent)]
    Stage(#[from] StageError),

    /// A cache operation failed while restoring outputs.
    #[error(transparent)]
    Cache(#[from] CacheError),

    /// An I/O failure, wrapped with the offending path.
    #[error("{context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },
}

/// Result alias for index operations.
pub type IndexResult<T> = Result<T, IndexError>;
