//! Store error types
//!
//! Defines all errors that can occur in the catalog and measurement store.

use thiserror::Error;

/// Errors that can occur in the measurement store
#[derive(Error, Debug)]
pub enum StoreError {
    /// A lookup that must resolve to exactly one row matched none
    #[error("Not found: {0}")]
    NotFound(String),

    /// A lookup that must resolve to exactly one row matched several
    #[error("Ambiguous lookup: measurement '{msr}' matches {count} series")]
    AmbiguousLookup { msr: String, count: usize },

    /// Caller supplied an unusable argument (empty series list, bad date bound, ...)
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// A series holds more than one record for a timestamp and the
    /// duplicate policy forbids it
    #[error("Duplicate timestamp {date} in series {series_id}")]
    DuplicateTimestamp { series_id: String, date: String },

    /// SQLite reported an error
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored data could not be decoded
    #[error("Corrupt data: {0}")]
    Corruption(String),

    /// Lock acquisition failed
    #[error("Lock error: {0}")]
    Lock(String),
}

impl StoreError {
    /// True for connectivity/IO class failures, which are fatal to the
    /// operation and are never retried internally.
    pub fn is_storage_failure(&self) -> bool {
        matches!(
            self,
            StoreError::Sqlite(_) | StoreError::Io(_) | StoreError::Corruption(_) | StoreError::Lock(_)
        )
    }
}

/// Result type alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;
