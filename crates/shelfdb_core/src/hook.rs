//! Error transform hook.

use crate::error::DbError;
use parking_lot::RwLock;

/// A caller-supplied function that may rewrite an error before it is
/// surfaced.
///
/// Returning `Some(e)` replaces the rejection value with `e`, whatever it
/// is; returning `None` keeps the original.
pub type ErrorHook = dyn Fn(&DbError) -> Option<DbError> + Send + Sync;

/// Holds the (at most one) error hook registered on a handle.
#[derive(Default)]
pub(crate) struct HookCell {
    hook: RwLock<Option<Box<ErrorHook>>>,
}

impl HookCell {
    pub(crate) fn set(&self, hook: Box<ErrorHook>) {
        *self.hook.write() = Some(hook);
    }

    pub(crate) fn clear(&self) {
        *self.hook.write() = None;
    }

    /// Routes an error through the hook, substituting its replacement when
    /// one is returned.
    pub(crate) fn transform(&self, err: DbError) -> DbError {
        match &*self.hook.read() {
            Some(hook) => hook(&err).unwrap_or(err),
            None => err,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use shelfdb_engine::EngineError;

    #[test]
    fn no_hook_keeps_error() {
        let cell = HookCell::default();
        let err = cell.transform(DbError::Closed);
        assert!(matches!(err, DbError::Closed));
    }

    #[test]
    fn hook_returning_none_keeps_error() {
        let cell = HookCell::default();
        cell.set(Box::new(|_| None));
        let err = cell.transform(DbError::Closed);
        assert!(matches!(err, DbError::Closed));
    }

    #[test]
    fn hook_replacement_wins() {
        let cell = HookCell::default();
        cell.set(Box::new(|_| Some(DbError::store_not_found("sentinel"))));
        let err = cell.transform(DbError::Engine(EngineError::ConnectionClosed));
        assert!(matches!(err, DbError::StoreNotFound { name } if name == "sentinel"));
    }

    #[test]
    fn cleared_hook_no_longer_applies() {
        let cell = HookCell::default();
        cell.set(Box::new(|_| Some(DbError::Closed)));
        cell.clear();
        let err = cell.transform(DbError::store_not_found("items"));
        assert!(matches!(err, DbError::StoreNotFound { .. }));
    }
}
