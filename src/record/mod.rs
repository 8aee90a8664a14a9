//! Key record module: persisted wrapped copies of the master key.
//!
//! This module provides:
//! - `KeyRecord` and `KeyRecordPatch` types (`key_record`)
//! - The `KeyRecordStore` adapter trait and its file-backed implementation (`store`)
//! - An in-process implementation for embedding and tests (`memory`)

pub mod key_record;
pub mod memory;
pub mod store;

pub use key_record::{KeyRecord, KeyRecordPatch};
pub use memory::MemoryKeyRecordStore;
pub use store::{validate_domain_name, FileKeyRecordStore, KeyRecordStore};
