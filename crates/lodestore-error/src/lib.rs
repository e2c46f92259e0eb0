//! Error taxonomy for LodeStore operations.
//!
//! Structured variants carry enough context to report the failure
//! without re-deriving it: the offending transaction id, key, file
//! path, or segment name. Validation errors are returned before any
//! lock or log activity, so observing one implies no side effects.

use std::path::PathBuf;

use lodestore_types::{Key, TxnId};
use thiserror::Error;

/// Primary error type for store operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// An API call named a transaction that is not currently running
    /// (never begun, already committed, or already aborted).
    #[error("transaction {tid} is not currently running")]
    TransactionNotRunning { tid: TxnId },

    /// A lookup or delete named a key that is absent from the store.
    #[error("key '{key}' does not exist")]
    KeyNotFound { key: Key },

    /// `set` was called without a value.
    #[error("set requires a value")]
    InvalidValue,

    /// Filesystem failure while enumerating, reading, or writing log
    /// segments.
    #[error("I/O error on '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A segment file's name or contents violate the log invariants.
    #[error("corrupt log segment '{name}': {reason}")]
    CorruptLog { name: String, reason: String },
}

impl StoreError {
    /// Create an I/O error for `path`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a corrupt-log error for segment `name`.
    pub fn corrupt(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CorruptLog {
            name: name.into(),
            reason: reason.into(),
        }
    }

    /// Create a key-not-found error.
    pub fn key_not_found(key: impl Into<Key>) -> Self {
        Self::KeyNotFound { key: key.into() }
    }

    /// Whether this error indicates on-disk log corruption.
    ///
    /// Corruption is fatal during startup: the log manager refuses to
    /// construct over a log it cannot trust.
    #[must_use]
    pub const fn is_corruption(&self) -> bool {
        matches!(self, Self::CorruptLog { .. })
    }
}

/// Result type alias using [`StoreError`].
pub type Result<T> = std::result::Result<T, StoreError>;
