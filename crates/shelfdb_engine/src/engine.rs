//! The host engine contract.
//!
//! Engines are **opaque byte stores with ordered keys**. They provide
//! versioned database connections, single-store transactions, and bounded
//! forward cursors. ShelfDB owns all payload interpretation - engines do not
//! understand records, key paths, or codecs.
//!
//! # Invariants
//!
//! - A database's version only ever increases; schema changes (store
//!   creation/deletion) happen exclusively inside a version upgrade.
//! - A transaction is scoped to exactly one store and one access mode and
//!   terminates exactly once, by commit or abort.
//! - Within one transaction, requests apply in submission order; commit
//!   succeeds only if every request succeeded.
//!
//! # Implementors
//!
//! - [`crate::MemoryEngine`] - in-memory engine for tests and ephemeral
//!   databases.

use crate::error::EngineResult;
use crate::key::{Key, KeyRange};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Access mode of a transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read requests only.
    ReadOnly,
    /// Read and write requests.
    ReadWrite,
}

/// Configuration for creating a store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    /// Path of the field holding a record's primary key.
    ///
    /// Dotted paths descend into nested objects. Fixed for the store's
    /// lifetime.
    pub key_path: String,
}

impl Default for StoreOptions {
    fn default() -> Self {
        Self {
            key_path: "id".to_string(),
        }
    }
}

impl StoreOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the primary-key path.
    #[must_use]
    pub fn key_path(mut self, path: impl Into<String>) -> Self {
        self.key_path = path.into();
        self
    }
}

/// Mutable schema handle passed to an upgrade callback.
///
/// Only valid for the duration of the upgrade transition. Edits are atomic
/// with the version bump: if the callback fails, neither the version nor the
/// store set changes.
pub trait SchemaEditor {
    /// Returns the store names as of the current edit state.
    fn store_names(&self) -> Vec<String>;

    /// Creates a store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::StoreExists`] if a store with this name
    /// already exists.
    fn create_store(&mut self, name: &str, options: StoreOptions) -> EngineResult<()>;

    /// Deletes a store and all its records.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::StoreMissing`] if no such store exists.
    fn delete_store(&mut self, name: &str) -> EngineResult<()>;
}

/// An upgrade callback, invoked synchronously with a mutable schema handle
/// while the engine transitions a database to a higher version.
pub type UpgradeFn<'a> = &'a mut (dyn FnMut(&mut dyn SchemaEditor) -> EngineResult<()> + Send);

/// A host key-value engine.
#[async_trait]
pub trait Engine: Send + Sync {
    /// Opens a connection to the named database.
    ///
    /// `version` of `None` opens at the stored version (or 1 for a fresh
    /// database). When the requested version exceeds the stored one, the
    /// engine runs `upgrade` against a [`SchemaEditor`] before the
    /// connection is ready.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::VersionConflict`] when `version` is
    /// below the stored version, or the upgrade callback's error when the
    /// transition fails.
    async fn open(
        &self,
        name: &str,
        version: Option<u64>,
        upgrade: Option<UpgradeFn<'_>>,
    ) -> EngineResult<Arc<dyn Connection>>;
}

/// A live connection to one database at one version.
#[async_trait]
pub trait Connection: Send + Sync {
    /// The database name.
    fn name(&self) -> &str;

    /// The schema version this connection was opened at.
    fn version(&self) -> u64;

    /// Names of the stores in the schema.
    fn store_names(&self) -> Vec<String>;

    /// Options of the named store, or `None` if it does not exist.
    fn store_options(&self, store: &str) -> Option<StoreOptions>;

    /// Opens a transaction on one store.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::ConnectionClosed`] after [`close`] and
    /// [`crate::EngineError::StoreMissing`] for an unknown store.
    ///
    /// [`close`]: Connection::close
    async fn transaction(&self, store: &str, mode: AccessMode) -> EngineResult<Box<dyn StoreTxn>>;

    /// Closes the connection. Subsequent transactions fail.
    fn close(&self);
}

/// A transaction scoped to one store and one access mode.
///
/// Values are opaque bytes. The handle must not be retained past the
/// terminal [`commit`]/[`abort`] call.
///
/// [`commit`]: StoreTxn::commit
/// [`abort`]: StoreTxn::abort
#[async_trait]
pub trait StoreTxn: Send {
    /// Reads the value stored under `key`.
    async fn get(&mut self, key: &Key) -> EngineResult<Option<Vec<u8>>>;

    /// Reads every value in the store, in key order.
    async fn get_all(&mut self) -> EngineResult<Vec<Vec<u8>>>;

    /// Counts the records in the store.
    async fn count(&mut self) -> EngineResult<u64>;

    /// Inserts a new record.
    ///
    /// # Errors
    ///
    /// Returns [`crate::EngineError::KeyExists`] when the key is already
    /// present; the transaction can then only abort.
    async fn insert(&mut self, key: Key, value: Vec<u8>) -> EngineResult<()>;

    /// Inserts or overwrites a record.
    async fn upsert(&mut self, key: Key, value: Vec<u8>) -> EngineResult<()>;

    /// Deletes the record under `key`. Deleting an absent key is a no-op.
    async fn delete(&mut self, key: &Key) -> EngineResult<()>;

    /// Opens a forward cursor over `range`, positioned on the first record
    /// in range. Returns `None` when the range holds no records.
    async fn open_cursor(&mut self, range: KeyRange) -> EngineResult<Option<Box<dyn Cursor>>>;

    /// Commits the transaction, applying every request atomically.
    async fn commit(self: Box<Self>) -> EngineResult<()>;

    /// Aborts the transaction, discarding every request.
    async fn abort(self: Box<Self>) -> EngineResult<()>;
}

/// An ordered forward iterator over a bounded key range.
#[async_trait]
pub trait Cursor: Send {
    /// The key at the current position.
    fn key(&self) -> &Key;

    /// The value at the current position.
    fn value(&self) -> &[u8];

    /// Moves one record forward. Returns `false` when exhausted.
    async fn advance(&mut self) -> EngineResult<bool>;

    /// Moves forward to the first record with key >= `key`.
    ///
    /// Returns `false` when no such record remains in range. Seeking
    /// backwards is not supported; a target at or before the current
    /// position behaves like [`advance`].
    ///
    /// [`advance`]: Cursor::advance
    async fn seek(&mut self, key: &Key) -> EngineResult<bool>;
}
