//! Record codec and key extraction.
//!
//! Records are structured values at the API surface and CBOR bytes at the
//! engine boundary; engines never interpret payloads.

use crate::error::{DbError, DbResult};
use shelfdb_engine::Key;

/// A record stored under a store.
///
/// Any JSON-shaped value; the primary key is derived from the store's key
/// path, so records written through the mutation API are objects in
/// practice.
pub type Record = serde_json::Value;

/// Encodes a record to CBOR bytes.
pub fn encode_record(record: &Record) -> DbResult<Vec<u8>> {
    let mut bytes = Vec::new();
    ciborium::into_writer(record, &mut bytes)
        .map_err(|e| DbError::codec(format!("encode: {e}")))?;
    Ok(bytes)
}

/// Decodes a record from CBOR bytes.
pub fn decode_record(bytes: &[u8]) -> DbResult<Record> {
    ciborium::from_reader(bytes).map_err(|e| DbError::codec(format!("decode: {e}")))
}

/// Derives a record's primary key from a (dotted) key path.
///
/// The value at the path must be an integer or a string.
pub fn extract_key(record: &Record, key_path: &str) -> DbResult<Key> {
    let mut value = record;
    for segment in key_path.split('.') {
        value = value.get(segment).ok_or_else(|| {
            DbError::invalid_key(format!("record has no value at key path `{key_path}`"))
        })?;
    }
    match value {
        serde_json::Value::Number(n) => n.as_i64().map(Key::Int).ok_or_else(|| {
            DbError::invalid_key(format!("key at `{key_path}` is not an integer: {n}"))
        }),
        serde_json::Value::String(s) => Ok(Key::Text(s.clone())),
        other => Err(DbError::invalid_key(format!(
            "key at `{key_path}` must be an integer or string, got {other}"
        ))),
    }
}
