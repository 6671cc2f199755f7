//! Batch retrieval over a sorted cursor scan.
//!
//! Retrieving N keys as N point lookups costs one engine round-trip per key.
//! A [`ScanPlan`] instead walks one forward cursor bounded by the smallest
//! and largest requested key and seeks directly from each requested key to
//! the next, so the scan issues at most one cursor move per requested key
//! while output order still mirrors request order.

use crate::codec::{self, Record};
use crate::error::DbResult;
use shelfdb_engine::{Key, KeyRange, StoreTxn};
use std::collections::HashMap;
use tracing::trace;

/// Scan state for one batch-get: the sorted key sequence, the mapping back
/// to request positions, and the bounding range. Lives only for the duration
/// of one read transaction.
pub(crate) struct ScanPlan {
    /// Requested keys, ascending, deduplicated.
    sorted: Vec<Key>,
    /// Requested key -> original request position (last occurrence wins).
    positions: HashMap<Key, usize>,
}

impl ScanPlan {
    pub(crate) fn new(keys: &[Key]) -> Self {
        let mut positions = HashMap::with_capacity(keys.len());
        for (index, key) in keys.iter().enumerate() {
            positions.insert(key.clone(), index);
        }
        let mut sorted: Vec<Key> = positions.keys().cloned().collect();
        sorted.sort();
        Self { sorted, positions }
    }

    /// The inclusive `[min, max]` bounds of the request, or `None` for an
    /// empty request.
    pub(crate) fn range(&self) -> Option<KeyRange> {
        match (self.sorted.first(), self.sorted.last()) {
            (Some(min), Some(max)) => Some(KeyRange::bounded(min.clone(), max.clone())),
            _ => None,
        }
    }

    /// The first requested key strictly greater than `key`, if any.
    pub(crate) fn next_after(&self, key: &Key) -> Option<&Key> {
        let index = match self.sorted.binary_search(key) {
            Ok(i) => i + 1,
            Err(i) => i,
        };
        self.sorted.get(index)
    }

    pub(crate) fn position(&self, key: &Key) -> Option<usize> {
        self.positions.get(key).copied()
    }

    /// Runs the bounded scan, placing each found record at its key's
    /// original request position in `out`. Positions of keys absent from
    /// the store stay `None`.
    pub(crate) async fn run(
        &self,
        txn: &mut dyn StoreTxn,
        out: &mut [Option<Record>],
    ) -> DbResult<()> {
        let Some(range) = self.range() else {
            return Ok(());
        };
        let Some(mut cursor) = txn.open_cursor(range).await? else {
            return Ok(());
        };

        let mut stops = 0usize;
        loop {
            stops += 1;
            let key = cursor.key().clone();
            if let Some(index) = self.position(&key) {
                out[index] = Some(codec::decode_record(cursor.value())?);
            }
            // Seek straight past every stored key nobody asked for; stop as
            // soon as no further requested key exists.
            let Some(next) = self.next_after(&key) else {
                break;
            };
            if !cursor.seek(next).await? {
                break;
            }
        }
        trace!(requested = self.sorted.len(), stops, "batch scan finished");
        Ok(())
    }
}
