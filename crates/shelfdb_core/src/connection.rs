//! Connection lifecycle management.

use crate::error::{DbError, DbResult};
use parking_lot::RwLock;
use shelfdb_engine::{Connection, Engine, SchemaEditor, UpgradeFn};
use std::sync::Arc;
use tracing::debug;

/// Owns the zero-or-one live engine connection for a named database.
///
/// Every reopen closes the prior connection first; no other component may
/// retain a superseded connection. Schema changes go exclusively through
/// [`upgrade`], which keeps versions strictly monotonic by funneling every
/// bump through the single open path.
///
/// [`upgrade`]: ConnectionManager::upgrade
pub(crate) struct ConnectionManager {
    name: String,
    engine: Arc<dyn Engine>,
    conn: RwLock<Option<Arc<dyn Connection>>>,
}

impl ConnectionManager {
    pub(crate) fn new(engine: Arc<dyn Engine>, name: String) -> Self {
        Self {
            name,
            engine,
            conn: RwLock::new(None),
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    /// Opens (or reopens) the connection at `version`.
    ///
    /// Failures while an upgrade callback is in play are classified as
    /// [`DbError::Upgrade`]; plain open failures as [`DbError::Engine`].
    pub(crate) async fn open(
        &self,
        version: Option<u64>,
        upgrade: Option<UpgradeFn<'_>>,
    ) -> DbResult<()> {
        if let Some(prev) = self.conn.write().take() {
            prev.close();
        }

        let upgrading = upgrade.is_some();
        debug!(name = %self.name, ?version, upgrading, "opening connection");

        match self.engine.open(&self.name, version, upgrade).await {
            Ok(conn) => {
                debug!(name = %self.name, version = conn.version(), "connection ready");
                *self.conn.write() = Some(conn);
                Ok(())
            }
            Err(source) if upgrading => Err(DbError::upgrade(source)),
            Err(source) => Err(DbError::Engine(source)),
        }
    }

    /// Reopens at `current_version + 1`, running `mutator` as the upgrade
    /// callback.
    pub(crate) async fn upgrade(
        &self,
        mutator: &mut (dyn FnMut(&mut dyn SchemaEditor) -> shelfdb_engine::EngineResult<()> + Send),
    ) -> DbResult<()> {
        let next = self.version()? + 1;
        self.open(Some(next), Some(mutator)).await
    }

    /// The live connection, cloned out of the slot.
    pub(crate) fn connection(&self) -> DbResult<Arc<dyn Connection>> {
        self.conn.read().clone().ok_or(DbError::Closed)
    }

    pub(crate) fn version(&self) -> DbResult<u64> {
        Ok(self.connection()?.version())
    }

    /// Store names from connection metadata; empty when closed.
    pub(crate) fn store_names(&self) -> Vec<String> {
        match &*self.conn.read() {
            Some(conn) => conn.store_names(),
            None => Vec::new(),
        }
    }

    pub(crate) fn close(&self) {
        if let Some(conn) = self.conn.write().take() {
            debug!(name = %self.name, "closing connection");
            conn.close();
        }
    }

    pub(crate) fn is_open(&self) -> bool {
        self.conn.read().is_some()
    }
}
