//! Error types reported by a host engine.

use thiserror::Error;

/// Result type for engine operations.
pub type EngineResult<T> = Result<T, EngineError>;

/// Errors that a host engine can report.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    /// A connection was requested at a version below the stored one.
    #[error("version conflict: requested {requested}, database is at {current}")]
    VersionConflict {
        /// The version the open call asked for.
        requested: u64,
        /// The version currently stored for the database.
        current: u64,
    },

    /// A store was addressed that does not exist in the current schema.
    #[error("store missing: {name}")]
    StoreMissing {
        /// Name of the store.
        name: String,
    },

    /// A store was created that already exists.
    #[error("store already exists: {name}")]
    StoreExists {
        /// Name of the store.
        name: String,
    },

    /// An insert targeted a key that is already present in the store.
    #[error("key already exists: {key}")]
    KeyExists {
        /// Display form of the conflicting key.
        key: String,
    },

    /// A write request was issued inside a read-only transaction.
    #[error("write request in read-only transaction on store {store}")]
    ReadOnlyTransaction {
        /// Name of the store.
        store: String,
    },

    /// The transaction terminated by abort instead of commit.
    #[error("transaction aborted: {reason}")]
    TransactionAborted {
        /// Reason for the abort.
        reason: String,
    },

    /// The connection was closed (or superseded by a reopen).
    #[error("connection closed")]
    ConnectionClosed,
}

impl EngineError {
    /// Creates a version conflict error.
    pub fn version_conflict(requested: u64, current: u64) -> Self {
        Self::VersionConflict { requested, current }
    }

    /// Creates a store missing error.
    pub fn store_missing(name: impl Into<String>) -> Self {
        Self::StoreMissing { name: name.into() }
    }

    /// Creates a store exists error.
    pub fn store_exists(name: impl Into<String>) -> Self {
        Self::StoreExists { name: name.into() }
    }

    /// Creates a key exists error.
    pub fn key_exists(key: impl Into<String>) -> Self {
        Self::KeyExists { key: key.into() }
    }

    /// Creates a transaction aborted error.
    pub fn transaction_aborted(reason: impl Into<String>) -> Self {
        Self::TransactionAborted {
            reason: reason.into(),
        }
    }
}
