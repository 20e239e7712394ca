//! Error types for record store operations.

use std::io;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// The backing medium cannot be reached.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// The store file is corrupted.
    #[error("store corrupted: {0}")]
    Corrupted(String),

    /// Another process holds the store lock.
    #[error("store locked: another process has exclusive access")]
    Locked,
}

impl StorageError {
    /// Creates an unavailable error.
    pub fn unavailable(message: impl Into<String>) -> Self {
        Self::Unavailable(message.into())
    }

    /// Creates a corruption error.
    pub fn corrupted(message: impl Into<String>) -> Self {
        Self::Corrupted(message.into())
    }

    /// Returns true if retrying the same operation later may succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, StorageError::Io(_) | StorageError::Unavailable(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_errors() {
        assert!(StorageError::unavailable("disk offline").is_transient());
        assert!(StorageError::Io(io::Error::other("boom")).is_transient());
        assert!(!StorageError::corrupted("torn tail").is_transient());
        assert!(!StorageError::Locked.is_transient());
    }

    #[test]
    fn error_display() {
        let err = StorageError::unavailable("disk offline");
        assert_eq!(err.to_string(), "store unavailable: disk offline");
    }
}
