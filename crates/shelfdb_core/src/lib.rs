//! # ShelfDB Core
//!
//! A future-based convenience layer over a versioned, asynchronous
//! key-value engine.
//!
//! This crate provides:
//! - [`Database`] - a handle owning the single live connection to a named
//!   database, with store management via version upgrades
//! - Record CRUD with one engine request per record inside a single
//!   transaction
//! - Batched retrieval that resolves many keys with one bounded cursor scan
//!   instead of one round-trip per key
//! - A per-handle error transform hook
//! - [`TypedStore`] - serde-typed access over the same pipeline
//!
//! The engine itself is a black box behind the traits in
//! [`shelfdb_engine`]; tests and ephemeral databases use
//! [`MemoryEngine`].

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod codec;
mod connection;
mod database;
mod error;
mod executor;
mod hook;
mod records;
mod retrieval;
mod typed;

pub use codec::Record;
pub use database::Database;
pub use error::{DbError, DbResult};
pub use hook::ErrorHook;
pub use typed::TypedStore;

// The engine contract, re-exported so callers need only one dependency.
pub use shelfdb_engine::{
    AccessMode, Connection, Cursor, Engine, EngineError, EngineResult, Key, KeyRange,
    MemoryEngine, SchemaEditor, StoreOptions, StoreTxn, UpgradeFn,
};
