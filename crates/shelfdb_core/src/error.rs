//! Error types for the ShelfDB convenience layer.

use shelfdb_engine::EngineError;
use thiserror::Error;

/// Result type for database operations.
pub type DbResult<T> = Result<T, DbError>;

/// Errors surfaced by a [`crate::Database`] handle.
#[derive(Debug, Error)]
pub enum DbError {
    /// An operation targeted a store absent from the current schema.
    #[error("store not found: {name}")]
    StoreNotFound {
        /// Name of the store.
        name: String,
    },

    /// The engine reported a failure during open or transaction execution.
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),

    /// The engine reported a failure while opening at a new version or
    /// running the upgrade mutator.
    #[error("upgrade failed: {source}")]
    Upgrade {
        /// The underlying engine failure.
        #[source]
        source: EngineError,
    },

    /// A record's key could not be derived from the store's key path.
    #[error("invalid key: {message}")]
    InvalidKey {
        /// Description of the problem.
        message: String,
    },

    /// A record failed to encode or decode at the engine boundary.
    #[error("codec error: {message}")]
    Codec {
        /// Description of the failure.
        message: String,
    },

    /// The database handle holds no live connection.
    #[error("database handle is closed")]
    Closed,
}

impl DbError {
    /// Creates a store not found error.
    pub fn store_not_found(name: impl Into<String>) -> Self {
        Self::StoreNotFound { name: name.into() }
    }

    /// Creates an upgrade error.
    pub fn upgrade(source: EngineError) -> Self {
        Self::Upgrade { source }
    }

    /// Creates an invalid key error.
    pub fn invalid_key(message: impl Into<String>) -> Self {
        Self::InvalidKey {
            message: message.into(),
        }
    }

    /// Creates a codec error.
    pub fn codec(message: impl Into<String>) -> Self {
        Self::Codec {
            message: message.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = DbError::store_not_found("items");
        assert_eq!(err.to_string(), "store not found: items");

        let err = DbError::upgrade(EngineError::store_exists("items"));
        assert_eq!(err.to_string(), "upgrade failed: store already exists: items");

        assert_eq!(DbError::Closed.to_string(), "database handle is closed");
    }

    #[test]
    fn engine_errors_convert() {
        let err: DbError = EngineError::ConnectionClosed.into();
        assert!(matches!(err, DbError::Engine(EngineError::ConnectionClosed)));
    }
}
