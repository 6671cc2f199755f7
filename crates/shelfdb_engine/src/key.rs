//! Record keys and cursor key ranges.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A primary key for a record within a store.
///
/// Keys form a single totally ordered domain: all integer keys sort before
/// all text keys, and each variant sorts by its natural order. Cursors
/// iterate stores in this order.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Key {
    /// An integer key.
    Int(i64),
    /// A string key.
    Text(String),
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(v) => write!(f, "{v}"),
            Key::Text(v) => write!(f, "{v:?}"),
        }
    }
}

impl From<i64> for Key {
    fn from(v: i64) -> Self {
        Key::Int(v)
    }
}

impl From<&str> for Key {
    fn from(v: &str) -> Self {
        Key::Text(v.to_string())
    }
}

impl From<String> for Key {
    fn from(v: String) -> Self {
        Key::Text(v)
    }
}

/// An inclusive key range bounding a cursor scan.
///
/// `None` on either side means unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyRange {
    /// Inclusive lower bound.
    pub lower: Option<Key>,
    /// Inclusive upper bound.
    pub upper: Option<Key>,
}

impl KeyRange {
    /// A range covering the whole store.
    #[must_use]
    pub fn all() -> Self {
        Self {
            lower: None,
            upper: None,
        }
    }

    /// A range bounded inclusively on both sides.
    #[must_use]
    pub fn bounded(lower: Key, upper: Key) -> Self {
        Self {
            lower: Some(lower),
            upper: Some(upper),
        }
    }

    /// Returns true if `key` falls within the range.
    #[must_use]
    pub fn contains(&self, key: &Key) -> bool {
        if let Some(lower) = &self.lower {
            if key < lower {
                return false;
            }
        }
        if let Some(upper) = &self.upper {
            if key > upper {
                return false;
            }
        }
        true
    }
}
