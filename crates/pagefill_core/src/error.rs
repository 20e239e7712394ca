//! Error types for the paging engine.

use pagefill_storage::{Key, StorageError};
use thiserror::Error;

/// Result type for paging operations.
pub type PagingResult<T> = Result<T, PagingError>;

/// Errors that can occur while loading pages or backfilling the store.
#[derive(Debug, Error)]
pub enum PagingError {
    /// The backing store could not be reached.
    #[error("store unavailable: {0}")]
    StoreUnavailable(#[from] StorageError),

    /// A window fetch failed.
    #[error("fetch failed: {message}")]
    FetchFailed {
        /// Error message.
        message: String,
        /// Whether re-issuing the same load can succeed.
        retryable: bool,
    },

    /// A requested range has negative or non-monotonic bounds.
    #[error("invalid range [{start}, {end})")]
    InvalidRange {
        /// Inclusive start.
        start: Key,
        /// Exclusive end.
        end: Key,
    },

    /// The paging configuration cannot drive loading.
    #[error("invalid config: {message}")]
    InvalidConfig {
        /// Description of the problem.
        message: String,
    },
}

impl PagingError {
    /// Creates a retryable fetch error.
    pub fn fetch_retryable(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
            retryable: true,
        }
    }

    /// Creates a non-retryable fetch error.
    pub fn fetch_fatal(message: impl Into<String>) -> Self {
        Self::FetchFailed {
            message: message.into(),
            retryable: false,
        }
    }

    /// Creates an invalid config error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Returns true if re-issuing the failed load can succeed.
    pub fn is_retryable(&self) -> bool {
        match self {
            PagingError::StoreUnavailable(err) => err.is_transient(),
            PagingError::FetchFailed { retryable, .. } => *retryable,
            PagingError::InvalidRange { .. } | PagingError::InvalidConfig { .. } => false,
        }
    }
}
