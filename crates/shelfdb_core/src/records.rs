//! Record mutation helpers.

use crate::codec::{self, Record};
use crate::error::DbResult;
use shelfdb_engine::Key;

/// Normalizes a batch of records into engine-level `(key, payload)` request
/// arguments.
///
/// Key derivation and encoding happen before any transaction opens, so a
/// malformed record rejects the batch without touching the engine.
pub(crate) fn encode_batch(records: &[Record], key_path: &str) -> DbResult<Vec<(Key, Vec<u8>)>> {
    records
        .iter()
        .map(|record| {
            let key = codec::extract_key(record, key_path)?;
            let bytes = codec::encode_record(record)?;
            Ok((key, bytes))
        })
        .collect()
}
