use std::path::PathBuf;
use thiserror::Error;

/// Storage-specific error types for the offline login cache.
///
/// Load failures never reach callers (the cache starts empty instead); these
/// errors come from persisting after a mutation.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the store failed
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Store contents could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StorageError {
    /// Wrap an I/O error with the path it occurred on.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Specialized result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
