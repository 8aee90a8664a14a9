//! Key record store adapter.
//!
//! `KeyRecordStore` is the narrow seam between the key-wrapping services
//! and whatever document store actually holds the record.  Every
//! implementation is bound to exactly one protection domain at
//! construction time and only ever reads or writes that domain's record:
//! there is no listing and no way to name another domain through it.
//!
//! Implementations enforce no caller authorization.  They are the
//! privileged access path used during setup (before any user permissions
//! exist) and during unlock (before the caller has proven the password);
//! gating who may reach them is the job of the layer above.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use tracing::debug;

use super::key_record::{KeyRecord, KeyRecordPatch};
use crate::errors::{CompVaultError, Result};

/// File suffix for a domain's key record document.
const RECORD_SUFFIX: &str = ".keyrecord.json";

/// Read/write access to the single key record of one protection domain.
///
/// `put` and `patch` must each apply atomically: a concurrent reader sees
/// either the old record or the new one, never a mix.
pub trait KeyRecordStore: Send + Sync {
    /// The protection domain this store is bound to.
    fn domain(&self) -> &str;

    /// Fetch the record, or `None` if the domain has not been provisioned.
    fn get(&self) -> Result<Option<KeyRecord>>;

    /// Write the whole record, replacing any existing one.
    fn put(&self, record: &KeyRecord) -> Result<()>;

    /// Overwrite selected fields of the existing record and return the
    /// result. Fails with `NotSetup` if there is no record.
    fn patch(&self, patch: KeyRecordPatch) -> Result<KeyRecord>;
}

// ---------------------------------------------------------------------------
// FileKeyRecordStore
// ---------------------------------------------------------------------------

/// Stores the record as one JSON document at `<dir>/<domain>.keyrecord.json`.
///
/// Writes go to a uniquely named owner-only temp file in the same directory
/// and are renamed over the target, so readers never observe a half-written
/// document.  Within one
/// process a mutex serialises writers so the read-modify-write in `patch`
/// cannot interleave; across processes the last rename wins.
#[derive(Debug)]
pub struct FileKeyRecordStore {
    domain: String,
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileKeyRecordStore {
    /// Open the privileged store for `domain` under `dir`.
    ///
    /// The directory is created lazily on first write.
    pub fn privileged(dir: &Path, domain: &str) -> Result<Self> {
        validate_domain_name(domain)?;
        Ok(Self {
            domain: domain.to_string(),
            path: dir.join(format!("{domain}{RECORD_SUFFIX}")),
            write_lock: Mutex::new(()),
        })
    }

    /// Path of the record document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read(&self) -> Result<Option<KeyRecord>> {
        let data = match fs::read(&self.path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(CompVaultError::Store(format!("read key record: {e}"))),
        };

        let record: KeyRecord = serde_json::from_slice(&data)
            .map_err(|e| CompVaultError::Store(format!("parse key record: {e}")))?;
        Ok(Some(record))
    }

    fn write(&self, record: &KeyRecord) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(record)
            .map_err(|e| CompVaultError::Serialization(format!("key record: {e}")))?;

        let parent = self.path.parent().unwrap_or(Path::new("."));
        if !parent.exists() {
            fs::create_dir_all(parent)
                .map_err(|e| CompVaultError::Store(format!("create store directory: {e}")))?;
        }

        // Uniquely named temp file next to the target, created 0600 on unix,
        // so the rename stays on one filesystem and separate store instances
        // never share a temp path.
        let mut tmp = tempfile::Builder::new()
            .prefix(&format!(".{}{RECORD_SUFFIX}.", self.domain))
            .suffix(".tmp")
            .tempfile_in(parent)
            .map_err(|e| CompVaultError::Store(format!("create temp key record: {e}")))?;

        tmp.write_all(&bytes)
            .and_then(|()| tmp.as_file().sync_all())
            .map_err(|e| CompVaultError::Store(format!("write key record: {e}")))?;

        tmp.persist(&self.path)
            .map_err(|e| CompVaultError::Store(format!("replace key record: {}", e.error)))?;

        Ok(())
    }
}

impl KeyRecordStore for FileKeyRecordStore {
    fn domain(&self) -> &str {
        &self.domain
    }

    fn get(&self) -> Result<Option<KeyRecord>> {
        let record = self.read()?;
        debug!(domain = %self.domain, found = record.is_some(), "key record read");
        Ok(record)
    }

    fn put(&self, record: &KeyRecord) -> Result<()> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CompVaultError::Store("key record lock poisoned".into()))?;
        self.write(record)?;
        debug!(domain = %self.domain, "key record written");
        Ok(())
    }

    fn patch(&self, patch: KeyRecordPatch) -> Result<KeyRecord> {
        let _guard = self
            .write_lock
            .lock()
            .map_err(|_| CompVaultError::Store("key record lock poisoned".into()))?;

        let mut record = self.read()?.ok_or(CompVaultError::NotSetup)?;
        record.apply(patch);
        self.write(&record)?;
        debug!(domain = %self.domain, "key record patched");
        Ok(record)
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

/// Validate that a protection domain name is safe to use as a record id.
///
/// Allowed: lowercase letters, digits, hyphens. Must not be empty or
/// start/end with a hyphen. Max length 64 characters.
pub fn validate_domain_name(name: &str) -> Result<()> {
    if name.is_empty() {
        return Err(CompVaultError::Configuration(
            "domain name cannot be empty".into(),
        ));
    }

    if name.len() > 64 {
        return Err(CompVaultError::Configuration(
            "domain name cannot exceed 64 characters".into(),
        ));
    }

    if !name
        .chars()
        .all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '-')
    {
        return Err(CompVaultError::Configuration(format!(
            "domain name '{name}' is invalid; only lowercase letters, digits, and hyphens are allowed"
        )));
    }

    if name.starts_with('-') || name.ends_with('-') {
        return Err(CompVaultError::Configuration(format!(
            "domain name '{name}' cannot start or end with a hyphen"
        )));
    }

    Ok(())
}
