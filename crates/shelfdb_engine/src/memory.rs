//! In-memory engine for testing.

use crate::engine::{AccessMode, Connection, Cursor, Engine, SchemaEditor, StoreOptions, StoreTxn, UpgradeFn};
use crate::error::{EngineError, EngineResult};
use crate::key::{Key, KeyRange};
use async_trait::async_trait;
use parking_lot::{Mutex, RwLock};
use std::collections::{BTreeMap, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// An in-memory host engine.
///
/// This engine keeps all databases in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral databases that don't need persistence
///
/// Databases live as long as the engine value; dropping the engine drops
/// every database it holds.
///
/// # Thread Safety
///
/// The engine is thread-safe and can be shared across tasks.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    databases: Mutex<HashMap<String, Arc<RwLock<DbState>>>>,
}

#[derive(Debug, Default)]
struct DbState {
    version: u64,
    stores: BTreeMap<String, StoreState>,
}

#[derive(Debug, Clone, Default)]
struct StoreState {
    options: StoreOptions,
    records: BTreeMap<Key, Vec<u8>>,
}

impl MemoryEngine {
    /// Creates a new engine holding no databases.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the stored version of the named database (0 if never opened).
    ///
    /// Useful for asserting upgrade behavior in tests.
    #[must_use]
    pub fn stored_version(&self, name: &str) -> u64 {
        self.databases
            .lock()
            .get(name)
            .map(|db| db.read().version)
            .unwrap_or(0)
    }

    fn database(&self, name: &str) -> Arc<RwLock<DbState>> {
        Arc::clone(
            self.databases
                .lock()
                .entry(name.to_string())
                .or_insert_with(|| Arc::new(RwLock::new(DbState::default()))),
        )
    }
}

#[async_trait]
impl Engine for MemoryEngine {
    async fn open(
        &self,
        name: &str,
        version: Option<u64>,
        upgrade: Option<UpgradeFn<'_>>,
    ) -> EngineResult<Arc<dyn Connection>> {
        let db = self.database(name);
        let mut state = db.write();

        let requested = version.unwrap_or_else(|| state.version.max(1));
        if requested < state.version {
            return Err(EngineError::version_conflict(requested, state.version));
        }

        if requested > state.version {
            // Edits land on a working copy so a failed callback leaves the
            // schema and version untouched.
            let mut editor = MemorySchemaEditor {
                stores: state.stores.clone(),
            };
            if let Some(callback) = upgrade {
                callback(&mut editor)?;
            }
            state.stores = editor.stores;
            state.version = requested;
        }

        drop(state);

        Ok(Arc::new(MemoryConnection {
            name: name.to_string(),
            version: requested,
            db,
            open: AtomicBool::new(true),
        }))
    }
}

struct MemorySchemaEditor {
    stores: BTreeMap<String, StoreState>,
}

impl SchemaEditor for MemorySchemaEditor {
    fn store_names(&self) -> Vec<String> {
        self.stores.keys().cloned().collect()
    }

    fn create_store(&mut self, name: &str, options: StoreOptions) -> EngineResult<()> {
        if self.stores.contains_key(name) {
            return Err(EngineError::store_exists(name));
        }
        self.stores.insert(
            name.to_string(),
            StoreState {
                options,
                records: BTreeMap::new(),
            },
        );
        Ok(())
    }

    fn delete_store(&mut self, name: &str) -> EngineResult<()> {
        self.stores
            .remove(name)
            .map(|_| ())
            .ok_or_else(|| EngineError::store_missing(name))
    }
}

struct MemoryConnection {
    name: String,
    version: u64,
    db: Arc<RwLock<DbState>>,
    open: AtomicBool,
}

#[async_trait]
impl Connection for MemoryConnection {
    fn name(&self) -> &str {
        &self.name
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn store_names(&self) -> Vec<String> {
        if !self.open.load(Ordering::SeqCst) {
            return Vec::new();
        }
        self.db.read().stores.keys().cloned().collect()
    }

    fn store_options(&self, store: &str) -> Option<StoreOptions> {
        if !self.open.load(Ordering::SeqCst) {
            return None;
        }
        self.db.read().stores.get(store).map(|s| s.options.clone())
    }

    async fn transaction(&self, store: &str, mode: AccessMode) -> EngineResult<Box<dyn StoreTxn>> {
        if !self.open.load(Ordering::SeqCst) {
            return Err(EngineError::ConnectionClosed);
        }
        let state = self.db.read();
        let view = state
            .stores
            .get(store)
            .ok_or_else(|| EngineError::store_missing(store))?
            .records
            .clone();
        drop(state);

        Ok(Box::new(MemoryTxn {
            db: Arc::clone(&self.db),
            store: store.to_string(),
            mode,
            view,
            ops: Vec::new(),
            failed: None,
        }))
    }

    fn close(&self) {
        self.open.store(false, Ordering::SeqCst);
    }
}

enum TxnOp {
    Insert(Key, Vec<u8>),
    Upsert(Key, Vec<u8>),
    Delete(Key),
}

/// A buffered transaction: requests mutate a private view of the store and
/// are replayed atomically at commit.
struct MemoryTxn {
    db: Arc<RwLock<DbState>>,
    store: String,
    mode: AccessMode,
    view: BTreeMap<Key, Vec<u8>>,
    ops: Vec<TxnOp>,
    failed: Option<EngineError>,
}

impl MemoryTxn {
    fn ensure_usable(&self) -> EngineResult<()> {
        match &self.failed {
            Some(err) => Err(EngineError::transaction_aborted(err.to_string())),
            None => Ok(()),
        }
    }

    fn ensure_writable(&self) -> EngineResult<()> {
        self.ensure_usable()?;
        if self.mode == AccessMode::ReadOnly {
            return Err(EngineError::ReadOnlyTransaction {
                store: self.store.clone(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl StoreTxn for MemoryTxn {
    async fn get(&mut self, key: &Key) -> EngineResult<Option<Vec<u8>>> {
        self.ensure_usable()?;
        Ok(self.view.get(key).cloned())
    }

    async fn get_all(&mut self) -> EngineResult<Vec<Vec<u8>>> {
        self.ensure_usable()?;
        Ok(self.view.values().cloned().collect())
    }

    async fn count(&mut self) -> EngineResult<u64> {
        self.ensure_usable()?;
        Ok(self.view.len() as u64)
    }

    async fn insert(&mut self, key: Key, value: Vec<u8>) -> EngineResult<()> {
        self.ensure_writable()?;
        if self.view.contains_key(&key) {
            let err = EngineError::key_exists(key.to_string());
            self.failed = Some(err.clone());
            return Err(err);
        }
        self.view.insert(key.clone(), value.clone());
        self.ops.push(TxnOp::Insert(key, value));
        Ok(())
    }

    async fn upsert(&mut self, key: Key, value: Vec<u8>) -> EngineResult<()> {
        self.ensure_writable()?;
        self.view.insert(key.clone(), value.clone());
        self.ops.push(TxnOp::Upsert(key, value));
        Ok(())
    }

    async fn delete(&mut self, key: &Key) -> EngineResult<()> {
        self.ensure_writable()?;
        self.view.remove(key);
        self.ops.push(TxnOp::Delete(key.clone()));
        Ok(())
    }

    async fn open_cursor(&mut self, range: KeyRange) -> EngineResult<Option<Box<dyn Cursor>>> {
        self.ensure_usable()?;
        let entries: Vec<(Key, Vec<u8>)> = self
            .view
            .iter()
            .filter(|(k, _)| range.contains(k))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        if entries.is_empty() {
            return Ok(None);
        }
        Ok(Some(Box::new(MemoryCursor { entries, pos: 0 })))
    }

    async fn commit(self: Box<Self>) -> EngineResult<()> {
        if let Some(err) = self.failed {
            return Err(EngineError::transaction_aborted(err.to_string()));
        }
        if self.ops.is_empty() {
            return Ok(());
        }

        let mut state = self.db.write();
        let store = state
            .stores
            .get_mut(&self.store)
            .ok_or_else(|| EngineError::store_missing(&self.store))?;

        // Replay onto a working copy; swap in only if every request still
        // applies against the current contents.
        let mut records = store.records.clone();
        for op in self.ops {
            match op {
                TxnOp::Insert(key, value) => {
                    if records.contains_key(&key) {
                        return Err(EngineError::transaction_aborted(
                            EngineError::key_exists(key.to_string()).to_string(),
                        ));
                    }
                    records.insert(key, value);
                }
                TxnOp::Upsert(key, value) => {
                    records.insert(key, value);
                }
                TxnOp::Delete(key) => {
                    records.remove(&key);
                }
            }
        }
        store.records = records;
        Ok(())
    }

    async fn abort(self: Box<Self>) -> EngineResult<()> {
        Ok(())
    }
}

/// A cursor over a range snapshot taken when it was opened.
///
/// The position is valid from creation until a traversal call returns
/// `false`; `key`/`value` must not be called after that.
struct MemoryCursor {
    entries: Vec<(Key, Vec<u8>)>,
    pos: usize,
}

#[async_trait]
impl Cursor for MemoryCursor {
    fn key(&self) -> &Key {
        &self.entries[self.pos].0
    }

    fn value(&self) -> &[u8] {
        &self.entries[self.pos].1
    }

    async fn advance(&mut self) -> EngineResult<bool> {
        if self.pos < self.entries.len() {
            self.pos += 1;
        }
        Ok(self.pos < self.entries.len())
    }

    async fn seek(&mut self, key: &Key) -> EngineResult<bool> {
        self.pos += 1;
        while self.pos < self.entries.len() && self.entries[self.pos].0 < *key {
            self.pos += 1;
        }
        Ok(self.pos < self.entries.len())
    }
}
