//! Error types for the cache store
//!
//! Provides unified error handling using thiserror.

use std::path::PathBuf;

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the cache store.
#[derive(Error, Debug)]
pub enum CacheError {
    /// Backing file is missing, empty or cannot be read
    #[error("Cannot load cache file {path}: {source}")]
    Unreadable {
        /// The backing file path
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// Backing file failed to parse or verify; it has been deleted
    #[error("Corrupt cache file {path}, cache file deleted: {reason}")]
    CorruptFile {
        /// The backing file path
        path: PathBuf,
        /// Description of the problem
        reason: String,
    },

    /// Key cannot be stored
    #[error("Invalid key: {0}")]
    InvalidKey(String),

    /// Writing the table to disk failed
    #[error("Cannot save cache to {path}: {source}")]
    PersistFailure {
        /// The path that was being written
        path: PathBuf,
        /// The underlying I/O error
        source: std::io::Error,
    },

    /// A record payload could not be encoded or decoded
    #[error("Invalid payload for key {key}: {reason}")]
    Payload {
        /// The cache key the payload belongs to
        key: String,
        /// Description of the failure
        reason: String,
    },
}

impl CacheError {
    /// Returns true for errors after which the in-memory table is ahead of disk.
    pub fn is_persist_failure(&self) -> bool {
        matches!(self, CacheError::PersistFailure { .. })
    }
}

// == Result Type Alias ==
/// Convenience Result type for the cache store.
pub type Result<T> = std::result::Result<T, CacheError>;
