//! Database facade.

use crate::codec::{self, Record};
use crate::connection::ConnectionManager;
use crate::error::{DbError, DbResult};
use crate::executor::{self, TxnOptions};
use crate::hook::HookCell;
use crate::records;
use crate::retrieval::ScanPlan;
use shelfdb_engine::{AccessMode, Engine, Key, SchemaEditor, StoreOptions, UpgradeFn};
use std::sync::Arc;
use tracing::debug;

/// A handle to one named database on a host engine.
///
/// `Database` is the primary entry point for interacting with ShelfDB.
/// It provides:
/// - Connection lifecycle (open, reopen, version upgrades)
/// - Store management
/// - Record CRUD, including batched retrieval over one cursor scan
/// - A per-handle error transform hook
///
/// # Opening a Database
///
/// Use [`Database::open`] to open a database by name; the handle comes back
/// already connected at the database's current (or initial) version:
///
/// ```rust,ignore
/// use shelfdb_core::Database;
/// use shelfdb_engine::MemoryEngine;
/// use std::sync::Arc;
///
/// let db = Database::open(Arc::new(MemoryEngine::new()), "app").await?;
/// db.add("items", vec![serde_json::json!({"id": 1, "v": "a"})]).await?;
/// let item = db.get("items", 1).await?;
/// ```
///
/// The handle exclusively owns its connection: every reopen closes the
/// previous connection before the engine is asked for a new one, and
/// dropping the handle closes it.
pub struct Database {
    conn: ConnectionManager,
    hooks: HookCell,
}

impl Database {
    /// Opens the named database at its current (or initial) version.
    pub async fn open(engine: Arc<dyn Engine>, name: impl Into<String>) -> DbResult<Self> {
        let db = Self {
            conn: ConnectionManager::new(engine, name.into()),
            hooks: HookCell::default(),
        };
        db.conn.open(None, None).await?;
        Ok(db)
    }

    /// Reopens the connection, optionally at a specific version with an
    /// upgrade callback.
    ///
    /// # Errors
    ///
    /// Rejects with the hook-transformed error when the engine refuses the
    /// open (for example a [`shelfdb_engine::EngineError::VersionConflict`])
    /// or the upgrade callback fails.
    pub async fn reopen(
        &self,
        version: Option<u64>,
        upgrade: Option<UpgradeFn<'_>>,
    ) -> DbResult<()> {
        self.conn
            .open(version, upgrade)
            .await
            .map_err(|e| self.hooks.transform(e))
    }

    /// The database name.
    #[must_use]
    pub fn name(&self) -> &str {
        self.conn.name()
    }

    /// The schema version of the live connection.
    pub fn version(&self) -> DbResult<u64> {
        self.conn.version()
    }

    /// Returns true while the handle holds a live connection.
    #[must_use]
    pub fn is_open(&self) -> bool {
        self.conn.is_open()
    }

    /// Closes the connection. Subsequent operations reject with
    /// [`DbError::Closed`] until the handle is reopened.
    pub fn close(&self) {
        self.conn.close();
    }

    // ========================================================================
    // Error transform hook
    // ========================================================================

    /// Registers the error transform hook for this handle.
    ///
    /// Every engine-reported rejection routes through the hook before it is
    /// surfaced: returning `Some(e)` replaces the rejection value with `e`,
    /// returning `None` keeps the original. Guard rejections
    /// ([`DbError::StoreNotFound`], [`DbError::Closed`]) are raised directly
    /// and bypass the hook.
    pub fn set_error_hook<F>(&self, hook: F)
    where
        F: Fn(&DbError) -> Option<DbError> + Send + Sync + 'static,
    {
        self.hooks.set(Box::new(hook));
    }

    /// Removes the error transform hook.
    pub fn clear_error_hook(&self) {
        self.hooks.clear();
    }

    // ========================================================================
    // Store management
    // ========================================================================

    /// Names of the stores in the current schema.
    #[must_use]
    pub fn stores(&self) -> Vec<String> {
        self.conn.store_names()
    }

    /// Returns true if the named store exists.
    #[must_use]
    pub fn has_store(&self, name: &str) -> bool {
        self.conn.store_names().iter().any(|s| s == name)
    }

    /// Creates a store with default options (key path `"id"`).
    ///
    /// A no-op when the store already exists. Otherwise the schema change
    /// runs as a version upgrade: the connection is reopened at
    /// `current_version + 1` with a mutator that creates the store. Two
    /// callers racing on the same missing store can both observe it absent
    /// and trigger back-to-back upgrades; the loser's create then fails with
    /// [`shelfdb_engine::EngineError::StoreExists`].
    pub async fn add_store(&self, name: &str) -> DbResult<()> {
        self.add_store_with(name, StoreOptions::default()).await
    }

    /// Creates a store with the given options. See [`add_store`].
    ///
    /// [`add_store`]: Database::add_store
    pub async fn add_store_with(&self, name: &str, options: StoreOptions) -> DbResult<()> {
        if self.has_store(name) {
            return Ok(());
        }
        debug!(store = name, "creating store via upgrade");
        let store = name.to_string();
        let mut mutator =
            move |schema: &mut dyn SchemaEditor| schema.create_store(&store, options.clone());
        self.conn
            .upgrade(&mut mutator)
            .await
            .map_err(|e| self.hooks.transform(e))
    }

    /// Deletes a store and all its records via a version upgrade.
    ///
    /// A no-op when the store does not exist.
    pub async fn delete_store(&self, name: &str) -> DbResult<()> {
        if !self.has_store(name) {
            return Ok(());
        }
        debug!(store = name, "deleting store via upgrade");
        let store = name.to_string();
        let mut mutator = move |schema: &mut dyn SchemaEditor| schema.delete_store(&store);
        self.conn
            .upgrade(&mut mutator)
            .await
            .map_err(|e| self.hooks.transform(e))
    }

    /// The named store's options, or [`DbError::StoreNotFound`].
    fn require_store(&self, name: &str) -> DbResult<StoreOptions> {
        self.conn
            .connection()?
            .store_options(name)
            .ok_or_else(|| DbError::store_not_found(name))
    }

    // ========================================================================
    // Record mutation
    // ========================================================================

    /// Inserts records, auto-creating the store if missing.
    ///
    /// One insert request per record inside a single read-write transaction;
    /// a key conflict aborts the whole batch. Resolves with the records
    /// passed in.
    pub async fn add(&self, name: &str, records: Vec<Record>) -> DbResult<Vec<Record>> {
        if !self.has_store(name) {
            self.add_store(name).await?;
        }
        let options = self.require_store(name)?;
        let batch = records::encode_batch(&records, &options.key_path)?;
        let conn = self.conn.connection()?;
        executor::transact(
            conn.as_ref(),
            &self.hooks,
            TxnOptions {
                name,
                mode: AccessMode::ReadWrite,
                result: records,
            },
            move |txn, _| {
                Box::pin(async move {
                    for (key, bytes) in batch {
                        txn.insert(key, bytes).await?;
                    }
                    Ok(())
                })
            },
        )
        .await
    }

    /// Inserts or overwrites records in an existing store.
    ///
    /// # Errors
    ///
    /// Rejects with [`DbError::StoreNotFound`] when the store is absent.
    pub async fn put(&self, name: &str, records: Vec<Record>) -> DbResult<Vec<Record>> {
        let options = self.require_store(name)?;
        let batch = records::encode_batch(&records, &options.key_path)?;
        let conn = self.conn.connection()?;
        executor::transact(
            conn.as_ref(),
            &self.hooks,
            TxnOptions {
                name,
                mode: AccessMode::ReadWrite,
                result: records,
            },
            move |txn, _| {
                Box::pin(async move {
                    for (key, bytes) in batch {
                        txn.upsert(key, bytes).await?;
                    }
                    Ok(())
                })
            },
        )
        .await
    }

    /// Deletes the records under `keys`. Resolves with the keys passed in.
    ///
    /// Dropping a whole store is [`delete_store`].
    ///
    /// # Errors
    ///
    /// Rejects with [`DbError::StoreNotFound`] when the store is absent.
    ///
    /// [`delete_store`]: Database::delete_store
    pub async fn delete(&self, name: &str, keys: Vec<Key>) -> DbResult<Vec<Key>> {
        self.require_store(name)?;
        let requests = keys.clone();
        let conn = self.conn.connection()?;
        executor::transact(
            conn.as_ref(),
            &self.hooks,
            TxnOptions {
                name,
                mode: AccessMode::ReadWrite,
                result: keys,
            },
            move |txn, _| {
                Box::pin(async move {
                    for key in &requests {
                        txn.delete(key).await?;
                    }
                    Ok(())
                })
            },
        )
        .await
    }

    // ========================================================================
    // Retrieval
    // ========================================================================

    /// Reads the record under `key`, or `None` when absent.
    ///
    /// # Errors
    ///
    /// Rejects with [`DbError::StoreNotFound`] when the store is absent.
    pub async fn get(&self, name: &str, key: impl Into<Key>) -> DbResult<Option<Record>> {
        self.require_store(name)?;
        let key = key.into();
        let conn = self.conn.connection()?;
        executor::transact(
            conn.as_ref(),
            &self.hooks,
            TxnOptions {
                name,
                mode: AccessMode::ReadOnly,
                result: None,
            },
            move |txn, out| {
                Box::pin(async move {
                    if let Some(bytes) = txn.get(&key).await? {
                        *out = Some(codec::decode_record(&bytes)?);
                    }
                    Ok(())
                })
            },
        )
        .await
    }

    /// Reads many keys in one bounded cursor scan.
    ///
    /// The result has one slot per requested key, in request order: the
    /// record when the key is present, `None` when it is not. Whatever the
    /// request order, the store is scanned once, forward, between the
    /// smallest and largest requested key.
    ///
    /// # Errors
    ///
    /// Rejects with [`DbError::StoreNotFound`] when the store is absent.
    pub async fn get_many(&self, name: &str, keys: Vec<Key>) -> DbResult<Vec<Option<Record>>> {
        self.require_store(name)?;
        let plan = ScanPlan::new(&keys);
        let conn = self.conn.connection()?;
        executor::transact(
            conn.as_ref(),
            &self.hooks,
            TxnOptions {
                name,
                mode: AccessMode::ReadOnly,
                result: vec![None; keys.len()],
            },
            move |txn, out| Box::pin(async move { plan.run(txn, out).await }),
        )
        .await
    }

    /// Reads every record in the store, in the engine's key order.
    ///
    /// # Errors
    ///
    /// Rejects with [`DbError::StoreNotFound`] when the store is absent.
    pub async fn get_all(&self, name: &str) -> DbResult<Vec<Record>> {
        self.require_store(name)?;
        let conn = self.conn.connection()?;
        executor::transact(
            conn.as_ref(),
            &self.hooks,
            TxnOptions {
                name,
                mode: AccessMode::ReadOnly,
                result: Vec::new(),
            },
            move |txn, out| {
                Box::pin(async move {
                    for bytes in txn.get_all().await? {
                        out.push(codec::decode_record(&bytes)?);
                    }
                    Ok(())
                })
            },
        )
        .await
    }

    /// Counts the records in the store.
    ///
    /// # Errors
    ///
    /// Rejects with [`DbError::StoreNotFound`] when the store is absent.
    pub async fn count(&self, name: &str) -> DbResult<u64> {
        self.require_store(name)?;
        let conn = self.conn.connection()?;
        executor::transact(
            conn.as_ref(),
            &self.hooks,
            TxnOptions {
                name,
                mode: AccessMode::ReadOnly,
                result: 0u64,
            },
            move |txn, out| {
                Box::pin(async move {
                    *out = txn.count().await?;
                    Ok(())
                })
            },
        )
        .await
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("name", &self.name())
            .field("is_open", &self.is_open())
            .field("stores", &self.stores())
            .finish_non_exhaustive()
    }
}

impl Drop for Database {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use shelfdb_engine::{EngineError, MemoryEngine};

    async fn create_db() -> Database {
        Database::open(Arc::new(MemoryEngine::new()), "testdb")
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn open_fresh_database() {
        let db = create_db().await;
        assert!(db.is_open());
        assert_eq!(db.name(), "testdb");
        assert_eq!(db.version().unwrap(), 1);
        assert!(db.stores().is_empty());
    }

    #[tokio::test]
    async fn add_store_is_idempotent() {
        let db = create_db().await;

        db.add_store("items").await.unwrap();
        let version = db.version().unwrap();
        db.add_store("items").await.unwrap();

        assert_eq!(db.stores(), vec!["items".to_string()]);
        // The second call must not have upgraded again.
        assert_eq!(db.version().unwrap(), version);
    }

    #[tokio::test]
    async fn each_schema_change_bumps_the_version() {
        let db = create_db().await;
        assert_eq!(db.version().unwrap(), 1);

        db.add_store("a").await.unwrap();
        assert_eq!(db.version().unwrap(), 2);

        db.add_store("b").await.unwrap();
        assert_eq!(db.version().unwrap(), 3);

        db.delete_store("a").await.unwrap();
        assert_eq!(db.version().unwrap(), 4);
        assert_eq!(db.stores(), vec!["b".to_string()]);
    }

    #[tokio::test]
    async fn delete_absent_store_is_noop() {
        let db = create_db().await;
        db.delete_store("nothing").await.unwrap();
        assert_eq!(db.version().unwrap(), 1);
    }

    #[tokio::test]
    async fn add_auto_creates_store_and_echoes_records() {
        let db = create_db().await;
        let records = vec![json!({"id": 1, "v": "a"}), json!({"id": 2, "v": "b"})];

        let echoed = db.add("items", records.clone()).await.unwrap();

        assert_eq!(echoed, records);
        assert!(db.has_store("items"));
        assert_eq!(db.count("items").await.unwrap(), 2);
    }

    #[tokio::test]
    async fn add_then_get_roundtrips() {
        let db = create_db().await;
        let record = json!({"id": 5, "name": "widget", "tags": ["x"]});

        db.add("items", vec![record.clone()]).await.unwrap();

        assert_eq!(db.get("items", 5).await.unwrap(), Some(record));
        assert_eq!(db.get("items", 6).await.unwrap(), None);
    }

    #[tokio::test]
    async fn add_existing_key_rejects_whole_batch() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1, "v": "a"})]).await.unwrap();

        let result = db
            .add("items", vec![json!({"id": 2, "v": "b"}), json!({"id": 1, "v": "dup"})])
            .await;
        assert!(matches!(
            result,
            Err(DbError::Engine(EngineError::KeyExists { .. }))
        ));

        // The batch aborted as a whole.
        assert_eq!(db.get("items", 2).await.unwrap(), None);
        assert_eq!(db.count("items").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn put_requires_existing_store() {
        let db = create_db().await;
        let result = db.put("missing", vec![json!({"id": 1})]).await;
        assert!(matches!(result, Err(DbError::StoreNotFound { name }) if name == "missing"));
    }

    #[tokio::test]
    async fn put_overwrites() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1, "v": "a"})]).await.unwrap();

        db.put("items", vec![json!({"id": 1, "v": "updated"})])
            .await
            .unwrap();

        assert_eq!(
            db.get("items", 1).await.unwrap(),
            Some(json!({"id": 1, "v": "updated"}))
        );
        assert_eq!(db.count("items").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_requires_existing_store() {
        let db = create_db().await;
        let result = db.delete("missing", vec![Key::Int(1)]).await;
        assert!(matches!(result, Err(DbError::StoreNotFound { .. })));
    }

    #[tokio::test]
    async fn delete_then_get_returns_none() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1, "v": "a"}), json!({"id": 2, "v": "b"})])
            .await
            .unwrap();

        let echoed = db.delete("items", vec![Key::Int(1)]).await.unwrap();
        assert_eq!(echoed, vec![Key::Int(1)]);

        assert_eq!(db.get("items", 1).await.unwrap(), None);
        assert_eq!(db.get("items", 2).await.unwrap(), Some(json!({"id": 2, "v": "b"})));
    }

    #[tokio::test]
    async fn deleted_store_rejects_retrieval() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1})]).await.unwrap();

        db.delete_store("items").await.unwrap();

        assert!(!db.has_store("items"));
        let result = db.get("items", 1).await;
        assert!(matches!(result, Err(DbError::StoreNotFound { .. })));
    }

    #[tokio::test]
    async fn get_many_mirrors_request_order() {
        let db = create_db().await;
        db.add(
            "items",
            vec![
                json!({"id": 3, "v": "c"}),
                json!({"id": 1, "v": "a"}),
                json!({"id": 5, "v": "e"}),
            ],
        )
        .await
        .unwrap();

        let results = db
            .get_many("items", vec![Key::Int(5), Key::Int(1), Key::Int(3)])
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![
                Some(json!({"id": 5, "v": "e"})),
                Some(json!({"id": 1, "v": "a"})),
                Some(json!({"id": 3, "v": "c"})),
            ]
        );
    }

    #[tokio::test]
    async fn get_many_leaves_absent_keys_unset() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1, "v": "a"}), json!({"id": 3, "v": "c"})])
            .await
            .unwrap();

        let results = db
            .get_many("items", vec![Key::Int(1), Key::Int(2), Key::Int(3)])
            .await
            .unwrap();

        assert_eq!(results.len(), 3);
        assert_eq!(results[0], Some(json!({"id": 1, "v": "a"})));
        assert_eq!(results[1], None);
        assert_eq!(results[2], Some(json!({"id": 3, "v": "c"})));
    }

    #[tokio::test]
    async fn get_many_with_sparse_store() {
        let db = create_db().await;
        // Stored keys 2, 4, 6: the scan starts inside the bounds on a key
        // nobody requested.
        db.add(
            "items",
            vec![json!({"id": 2}), json!({"id": 4}), json!({"id": 6})],
        )
        .await
        .unwrap();

        let results = db
            .get_many("items", vec![Key::Int(6), Key::Int(1), Key::Int(4)])
            .await
            .unwrap();

        assert_eq!(results, vec![Some(json!({"id": 6})), None, Some(json!({"id": 4}))]);
    }

    #[tokio::test]
    async fn get_many_empty_request() {
        let db = create_db().await;
        db.add_store("items").await.unwrap();
        let results = db.get_many("items", Vec::new()).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn get_many_with_text_keys() {
        let db = create_db().await;
        db.add_store_with("pages", StoreOptions::new().key_path("slug"))
            .await
            .unwrap();
        db.put(
            "pages",
            vec![json!({"slug": "intro"}), json!({"slug": "about"})],
        )
        .await
        .unwrap();

        let results = db
            .get_many(
                "pages",
                vec![Key::from("intro"), Key::from("missing"), Key::from("about")],
            )
            .await
            .unwrap();

        assert_eq!(
            results,
            vec![Some(json!({"slug": "intro"})), None, Some(json!({"slug": "about"}))]
        );
    }

    #[tokio::test]
    async fn get_all_returns_key_order() {
        let db = create_db().await;
        db.add(
            "items",
            vec![json!({"id": 3}), json!({"id": 1}), json!({"id": 2})],
        )
        .await
        .unwrap();

        let all = db.get_all("items").await.unwrap();
        assert_eq!(all, vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);
    }

    #[tokio::test]
    async fn count_tracks_mutations() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1}), json!({"id": 2})]).await.unwrap();
        assert_eq!(db.count("items").await.unwrap(), 2);

        db.delete("items", vec![Key::Int(1)]).await.unwrap();
        assert_eq!(db.count("items").await.unwrap(), 1);
    }

    #[tokio::test]
    async fn custom_key_path() {
        let db = create_db().await;
        db.add_store_with("users", StoreOptions::new().key_path("profile.email"))
            .await
            .unwrap();

        let record = json!({"profile": {"email": "a@example.com"}, "age": 30});
        db.put("users", vec![record.clone()]).await.unwrap();

        assert_eq!(db.get("users", "a@example.com").await.unwrap(), Some(record));
    }

    #[tokio::test]
    async fn record_without_key_is_rejected_before_any_write() {
        let db = create_db().await;
        db.add_store("items").await.unwrap();

        let result = db
            .add("items", vec![json!({"id": 1}), json!({"name": "keyless"})])
            .await;
        assert!(matches!(result, Err(DbError::InvalidKey { .. })));
        assert_eq!(db.count("items").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn error_hook_replaces_transaction_errors() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1})]).await.unwrap();
        db.set_error_hook(|_| Some(DbError::store_not_found("sentinel")));

        let result = db.add("items", vec![json!({"id": 1})]).await;
        assert!(matches!(result, Err(DbError::StoreNotFound { name }) if name == "sentinel"));
    }

    #[tokio::test]
    async fn error_hook_does_not_apply_to_store_guards() {
        let db = create_db().await;
        db.set_error_hook(|_| Some(DbError::Closed));

        let result = db.get("missing", 1).await;
        assert!(matches!(result, Err(DbError::StoreNotFound { name }) if name == "missing"));
    }

    #[tokio::test]
    async fn cleared_error_hook_restores_originals() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1})]).await.unwrap();
        db.set_error_hook(|_| Some(DbError::Closed));
        db.clear_error_hook();

        let result = db.add("items", vec![json!({"id": 1})]).await;
        assert!(matches!(
            result,
            Err(DbError::Engine(EngineError::KeyExists { .. }))
        ));
    }

    #[tokio::test]
    async fn close_then_operate_rejects() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1})]).await.unwrap();
        db.close();

        assert!(!db.is_open());
        let result = db.get("items", 1).await;
        assert!(matches!(result, Err(DbError::Closed)));
        assert!(matches!(db.version(), Err(DbError::Closed)));
    }

    #[tokio::test]
    async fn reopen_after_close() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1, "v": "a"})]).await.unwrap();
        db.close();

        db.reopen(None, None).await.unwrap();
        assert_eq!(db.get("items", 1).await.unwrap(), Some(json!({"id": 1, "v": "a"})));
    }

    #[tokio::test]
    async fn reopen_at_lower_version_rejects_through_hook() {
        let db = create_db().await;
        db.add_store("a").await.unwrap();
        db.add_store("b").await.unwrap();
        assert_eq!(db.version().unwrap(), 3);

        db.set_error_hook(|_| Some(DbError::store_not_found("sentinel")));
        let result = db.reopen(Some(1), None).await;
        assert!(matches!(result, Err(DbError::StoreNotFound { name }) if name == "sentinel"));
    }

    #[tokio::test]
    async fn data_survives_schema_upgrades() {
        let db = create_db().await;
        db.add("items", vec![json!({"id": 1, "v": "a"})]).await.unwrap();

        db.add_store("other").await.unwrap();

        assert_eq!(db.get("items", 1).await.unwrap(), Some(json!({"id": 1, "v": "a"})));
    }

    #[tokio::test]
    async fn debug_output_names_the_database() {
        let db = create_db().await;
        let rendered = format!("{db:?}");
        assert!(rendered.contains("testdb"));
    }
}
