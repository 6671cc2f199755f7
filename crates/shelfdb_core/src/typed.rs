//! Serde-typed store access.

use crate::codec::Record;
use crate::database::Database;
use crate::error::{DbError, DbResult};
use serde::de::DeserializeOwned;
use serde::Serialize;
use shelfdb_engine::Key;
use std::marker::PhantomData;

/// A typed view over one store.
///
/// Values convert through the same record pipeline as the untyped API, so
/// typed and untyped access to the same store interoperate. The type's
/// serialized form must carry the store's key path.
///
/// ```rust,ignore
/// #[derive(Serialize, Deserialize)]
/// struct Todo { id: i64, title: String, done: bool }
///
/// let todos = db.typed::<Todo>("todos");
/// todos.add(vec![Todo { id: 1, title: "write docs".into(), done: false }]).await?;
/// let todo = todos.get(1).await?;
/// ```
pub struct TypedStore<'a, T> {
    db: &'a Database,
    name: String,
    _marker: PhantomData<fn() -> T>,
}

impl Database {
    /// A typed view over the named store.
    #[must_use]
    pub fn typed<T>(&self, name: impl Into<String>) -> TypedStore<'_, T> {
        TypedStore {
            db: self,
            name: name.into(),
            _marker: PhantomData,
        }
    }
}

impl<T> TypedStore<'_, T>
where
    T: Serialize + DeserializeOwned,
{
    /// The store name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Inserts values, auto-creating the store if missing. Resolves with the
    /// values passed in.
    pub async fn add(&self, values: Vec<T>) -> DbResult<Vec<T>> {
        let records = to_records(&values)?;
        self.db.add(&self.name, records).await?;
        Ok(values)
    }

    /// Inserts or overwrites values in an existing store. Resolves with the
    /// values passed in.
    pub async fn put(&self, values: Vec<T>) -> DbResult<Vec<T>> {
        let records = to_records(&values)?;
        self.db.put(&self.name, records).await?;
        Ok(values)
    }

    /// Deletes the records under `keys`. Resolves with the keys passed in.
    pub async fn delete(&self, keys: Vec<Key>) -> DbResult<Vec<Key>> {
        self.db.delete(&self.name, keys).await
    }

    /// Reads the value under `key`, or `None` when absent.
    pub async fn get(&self, key: impl Into<Key>) -> DbResult<Option<T>> {
        self.db.get(&self.name, key).await?.map(from_record).transpose()
    }

    /// Reads many keys in one bounded cursor scan, in request order.
    pub async fn get_many(&self, keys: Vec<Key>) -> DbResult<Vec<Option<T>>> {
        self.db
            .get_many(&self.name, keys)
            .await?
            .into_iter()
            .map(|slot| slot.map(from_record).transpose())
            .collect()
    }

    /// Reads every value in the store, in the engine's key order.
    pub async fn get_all(&self) -> DbResult<Vec<T>> {
        self.db
            .get_all(&self.name)
            .await?
            .into_iter()
            .map(from_record)
            .collect()
    }
}

fn to_records<T: Serialize>(values: &[T]) -> DbResult<Vec<Record>> {
    values
        .iter()
        .map(|v| serde_json::to_value(v).map_err(|e| DbError::codec(format!("serialize: {e}"))))
        .collect()
}

fn from_record<T: DeserializeOwned>(record: Record) -> DbResult<T> {
    serde_json::from_value(record).map_err(|e| DbError::codec(format!("deserialize: {e}")))
}
