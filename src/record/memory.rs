//! In-process key record store.
//!
//! Useful when the surrounding application keeps the record in its own
//! document store and only hands the core a snapshot, and in tests.

use std::sync::{Mutex, MutexGuard};

use super::key_record::{KeyRecord, KeyRecordPatch};
use super::store::{validate_domain_name, KeyRecordStore};
use crate::errors::{CompVaultError, Result};

/// A `KeyRecordStore` backed by a mutex-guarded `Option<KeyRecord>`.
#[derive(Debug)]
pub struct MemoryKeyRecordStore {
    domain: String,
    record: Mutex<Option<KeyRecord>>,
}

impl MemoryKeyRecordStore {
    /// An empty (not set up) store for `domain`.
    pub fn new(domain: &str) -> Result<Self> {
        validate_domain_name(domain)?;
        Ok(Self {
            domain: domain.to_string(),
            record: Mutex::new(None),
        })
    }

    /// A store pre-loaded with an existing record.
    pub fn with_record(domain: &str, record: KeyRecord) -> Result<Self> {
        let store = Self::new(domain)?;
        *store.slot()? = Some(record);
        Ok(store)
    }

    fn slot(&self) -> Result<MutexGuard<'_, Option<KeyRecord>>> {
        self.record
            .lock()
            .map_err(|_| CompVaultError::Store("key record lock poisoned".into()))
    }
}

impl KeyRecordStore for MemoryKeyRecordStore {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn get(&self) -> Result<Option<KeyRecord>> {
        Ok(self.slot()?.clone())
    }

    fn put(&self, record: &KeyRecord) -> Result<()> {
        *self.slot()? = Some(record.clone());
        Ok(())
    }

    fn patch(&self, patch: KeyRecordPatch) -> Result<KeyRecord> {
        let mut slot = self.slot()?;
        let record = slot.as_mut().ok_or(CompVaultError::NotSetup)?;
        record.apply(patch);
        Ok(record.clone())
    }
}
