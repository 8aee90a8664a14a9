//! SQLite audit log stored at `<store_dir>/audit.db`.

use std::path::{Path, PathBuf};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use rusqlite::Connection;

use super::{describe_outcome, AuditSink};
use crate::errors::{CompVaultError, Result};

/// A single audit log entry.
#[derive(Debug, Clone)]
pub struct AuditEntry {
    pub id: i64,
    pub timestamp: DateTime<Utc>,
    pub operation: String,
    pub domain: String,
    pub outcome: String,
    pub detail: Option<String>,
}

/// SQLite-backed audit log.
pub struct AuditLog {
    conn: Mutex<Connection>,
}

impl AuditLog {
    /// Open (or create) the audit database at `<store_dir>/audit.db`,
    /// creating the store directory if needed.
    ///
    /// Returns `None` if the database can't be opened. Callers treat this
    /// as "audit logging unavailable" and continue normally.
    pub fn open(store_dir: &Path) -> Option<Self> {
        std::fs::create_dir_all(store_dir).ok()?;
        let db_path = Self::db_path(store_dir);
        let conn = Connection::open(&db_path).ok()?;

        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            let _ = std::fs::set_permissions(&db_path, perms);
        }

        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS audit_log (
                id        INTEGER PRIMARY KEY AUTOINCREMENT,
                timestamp TEXT NOT NULL,
                operation TEXT NOT NULL,
                domain    TEXT NOT NULL,
                outcome   TEXT NOT NULL,
                detail    TEXT
            );",
        )
        .ok()?;

        Some(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Record an operation. Fire-and-forget: errors are silently ignored.
    pub fn log(&self, operation: &str, domain: &str, outcome: &str, detail: Option<&str>) {
        let Ok(conn) = self.conn.lock() else {
            return;
        };
        let now = Utc::now().to_rfc3339();
        let _ = conn.execute(
            "INSERT INTO audit_log (timestamp, operation, domain, outcome, detail)
             VALUES (?1, ?2, ?3, ?4, ?5)",
            rusqlite::params![now, operation, domain, outcome, detail],
        );
    }

    /// Most recent entries first, at most `limit` of them.
    pub fn recent(&self, limit: usize) -> Result<Vec<AuditEntry>> {
        let limit_i64 = i64::try_from(limit).unwrap_or(i64::MAX);
        let conn = self
            .conn
            .lock()
            .map_err(|_| CompVaultError::AuditError("audit lock poisoned".into()))?;

        let mut stmt = conn
            .prepare(
                "SELECT id, timestamp, operation, domain, outcome, detail
                 FROM audit_log
                 ORDER BY id DESC
                 LIMIT ?1",
            )
            .map_err(|e| CompVaultError::AuditError(format!("query prepare: {e}")))?;

        let rows = stmt
            .query_map([limit_i64], |row| {
                let ts_str: String = row.get(1)?;
                let timestamp = DateTime::parse_from_rfc3339(&ts_str)
                    .map_or_else(|_| Utc::now(), |dt| dt.with_timezone(&Utc));

                Ok(AuditEntry {
                    id: row.get(0)?,
                    timestamp,
                    operation: row.get(2)?,
                    domain: row.get(3)?,
                    outcome: row.get(4)?,
                    detail: row.get(5)?,
                })
            })
            .map_err(|e| CompVaultError::AuditError(format!("query exec: {e}")))?;

        let mut entries = Vec::new();
        for row in rows {
            entries.push(row.map_err(|e| CompVaultError::AuditError(format!("row parse: {e}")))?);
        }

        Ok(entries)
    }

    /// Return the path to the audit database.
    pub fn db_path(store_dir: &Path) -> PathBuf {
        store_dir.join("audit.db")
    }
}

impl AuditSink for AuditLog {
    fn record(&self, operation: &str, domain: &str, outcome: &Result<()>) {
        let (status, detail) = describe_outcome(outcome);
        self.log(operation, domain, status, detail.as_deref());
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn open_creates_database() {
        let dir = TempDir::new().unwrap();
        assert!(AuditLog::open(dir.path()).is_some());
        assert!(dir.path().join("audit.db").exists());
    }

    #[test]
    fn log_and_read_back_newest_first() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();

        audit.log("setup", "compensation", "ok", None);
        audit.log("unlock", "compensation", "failed", Some("Authentication"));
        audit.log("recover", "compensation", "ok", None);

        let entries = audit.recent(10).unwrap();
        assert_eq!(entries.len(), 3);
        assert_eq!(entries[0].operation, "recover");
        assert_eq!(entries[1].outcome, "failed");
        assert_eq!(entries[1].detail.as_deref(), Some("Authentication"));
        assert_eq!(entries[2].operation, "setup");
    }

    #[test]
    fn recent_respects_limit() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();
        for _ in 0..5 {
            audit.log("unlock", "compensation", "ok", None);
        }
        assert_eq!(audit.recent(2).unwrap().len(), 2);
    }

    #[test]
    fn sink_records_error_kind_only() {
        let dir = TempDir::new().unwrap();
        let audit = AuditLog::open(dir.path()).unwrap();

        let outcome: Result<()> = Err(CompVaultError::InvalidServerSecretOrCorrupted);
        audit.record("recover", "payroll", &outcome);

        let entry = &audit.recent(1).unwrap()[0];
        assert_eq!(entry.domain, "payroll");
        assert_eq!(entry.outcome, "failed");
        assert_eq!(entry.detail.as_deref(), Some("DataIntegrity"));
    }

    #[test]
    fn open_returns_none_when_dir_is_a_file() {
        let dir = TempDir::new().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, b"x").unwrap();
        assert!(AuditLog::open(&blocker.join("store")).is_none());
    }

    #[cfg(unix)]
    #[test]
    fn audit_db_has_restrictive_permissions() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let _audit = AuditLog::open(dir.path()).unwrap();

        let perms = std::fs::metadata(dir.path().join("audit.db"))
            .unwrap()
            .permissions();
        assert_eq!(perms.mode() & 0o777, 0o600);
    }
}
