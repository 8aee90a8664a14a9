//! Audit trail of key-record operations.
//!
//! Every setup, recovery and unlock attempt can be recorded with its
//! outcome.  Only the operation name, the domain, `ok`/`failed` and the
//! error category are ever written; never a password, key or secret.
//!
//! The SQLite-backed `AuditLog` is behind the `audit-log` feature.  It is
//! designed for graceful degradation: if the database can't be opened or
//! written to, operations continue without logging.

#[cfg(feature = "audit-log")]
mod sqlite;

#[cfg(feature = "audit-log")]
pub use sqlite::{AuditEntry, AuditLog};

use crate::errors::Result;

/// Receives one event per audited operation. Must never fail the caller.
pub trait AuditSink: Send + Sync {
    fn record(&self, operation: &str, domain: &str, outcome: &Result<()>);
}

/// `("ok", None)` or `("failed", Some(<error kind>))` for an outcome.
pub fn describe_outcome(outcome: &Result<()>) -> (&'static str, Option<String>) {
    match outcome {
        Ok(()) => ("ok", None),
        Err(e) => ("failed", Some(format!("{:?}", e.kind()))),
    }
}
