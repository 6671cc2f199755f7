//! Transaction execution.

use crate::error::{DbError, DbResult};
use crate::hook::HookCell;
use futures::future::BoxFuture;
use shelfdb_engine::{AccessMode, Connection, StoreTxn};
use tracing::trace;

/// Options for one transaction: the store, the access mode, and the result
/// buffer the transaction resolves with.
pub(crate) struct TxnOptions<'a, T> {
    pub name: &'a str,
    pub mode: AccessMode,
    pub result: T,
}

/// Runs `exec` inside a single transaction on `options.name` and drives the
/// transaction to its terminal outcome.
///
/// `exec` receives the transaction's store handle and the result buffer; the
/// read paths mutate the buffer in place before the terminal outcome fires.
/// Exactly one outcome per transaction: commit resolves with the buffer,
/// abort rejects with the hook-transformed error. A failed request aborts
/// the whole transaction; nothing is retried.
pub(crate) async fn transact<T, F>(
    conn: &dyn Connection,
    hooks: &HookCell,
    options: TxnOptions<'_, T>,
    exec: F,
) -> DbResult<T>
where
    T: Send,
    F: for<'t> FnOnce(&'t mut dyn StoreTxn, &'t mut T) -> BoxFuture<'t, DbResult<()>> + Send,
{
    let mut txn = conn
        .transaction(options.name, options.mode)
        .await
        .map_err(|e| hooks.transform(DbError::Engine(e)))?;
    trace!(store = options.name, mode = ?options.mode, "transaction opened");

    let mut result = options.result;
    match exec(txn.as_mut(), &mut result).await {
        Ok(()) => match txn.commit().await {
            Ok(()) => {
                trace!(store = options.name, "transaction committed");
                Ok(result)
            }
            Err(e) => {
                trace!(store = options.name, error = %e, "commit failed");
                Err(hooks.transform(DbError::Engine(e)))
            }
        },
        Err(e) => {
            trace!(store = options.name, error = %e, "transaction aborted");
            // Abort is best-effort; the routine's error is the outcome.
            let _ = txn.abort().await;
            Err(hooks.transform(e))
        }
    }
}
