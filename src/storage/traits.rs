//! Storage traits and error types
//!
//! This module defines the trait interface for record store backends and
//! associated error types.

use crate::record::Record;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read store {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Malformed row in store {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("Failed to write store {path}: {source}")]
    Write {
        path: String,
        source: std::io::Error,
    },
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// How a batch of records is written to the backing store
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PersistMode {
    /// Add the given records after the existing rows; the caller guarantees
    /// they are not already stored
    Append,

    /// Replace the whole store with the given ordered records
    Overwrite,
}

/// Trait for record store backends
///
/// The store is read once at startup and written by a single controller, so
/// implementations need no internal locking.
pub trait RecordStore {
    /// Loads every stored record, ordered by ascending ID
    ///
    /// A store that does not exist yet loads as empty. Any other read failure
    /// is an error.
    fn load(&self) -> StorageResult<Vec<Record>>;

    /// Writes records according to `mode`
    fn persist(&mut self, records: &[Record], mode: PersistMode) -> StorageResult<()>;
}
