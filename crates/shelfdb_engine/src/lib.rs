//! # ShelfDB Engine
//!
//! Engine contract for ShelfDB.
//!
//! This crate provides:
//! - The traits a host key-value engine implements ([`Engine`],
//!   [`Connection`], [`SchemaEditor`], [`StoreTxn`], [`Cursor`])
//! - The key domain shared with engines ([`Key`], [`KeyRange`])
//! - [`MemoryEngine`], an in-memory reference engine for tests

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod engine;
mod error;
mod key;
mod memory;

pub use engine::{
    AccessMode, Connection, Cursor, Engine, SchemaEditor, StoreOptions, StoreTxn, UpgradeFn,
};
pub use error::{EngineError, EngineResult};
pub use key::{Key, KeyRange};
pub use memory::MemoryEngine;
