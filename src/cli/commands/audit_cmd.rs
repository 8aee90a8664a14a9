//! `compvault audit`: display the audit log.
//!
//! Usage:
//!   compvault audit               # show last 50 entries
//!   compvault audit --last 20     # show last 20

use crate::cli::{Cli, Context};
use crate::errors::Result;

#[cfg(feature = "audit-log")]
use crate::audit::{AuditEntry, AuditLog};
#[cfg(feature = "audit-log")]
use crate::cli::output;
#[cfg(feature = "audit-log")]
use crate::errors::CompVaultError;

/// Execute the `audit` command.
#[cfg(feature = "audit-log")]
pub fn execute(cli: &Cli, last: usize) -> Result<()> {
    let ctx = Context::load(cli)?;

    // Reading the log must not create the store directory.
    if !AuditLog::db_path(&ctx.store_dir).exists() {
        output::info("No audit entries found.");
        return Ok(());
    }

    let audit = AuditLog::open(&ctx.store_dir)
        .ok_or_else(|| CompVaultError::AuditError("failed to open audit database".into()))?;
    let entries = audit.recent(last)?;

    if entries.is_empty() {
        output::info("No audit entries found.");
        return Ok(());
    }

    print_audit_table(&entries);
    Ok(())
}

#[cfg(not(feature = "audit-log"))]
pub fn execute(cli: &Cli, _last: usize) -> Result<()> {
    Context::load(cli)?;
    Err(crate::errors::CompVaultError::CommandFailed(
        "audit logging is not compiled in (build with the `audit-log` feature)".into(),
    ))
}

/// Print audit entries in a formatted table.
#[cfg(feature = "audit-log")]
pub fn print_audit_table(entries: &[AuditEntry]) {
    use comfy_table::{ContentArrangement, Table};
    use console::style;

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Time", "Operation", "Domain", "Outcome", "Detail"]);

    for entry in entries {
        table.add_row(vec![
            entry.timestamp.format("%Y-%m-%d %H:%M:%S").to_string(),
            entry.operation.clone(),
            entry.domain.clone(),
            colorize_outcome(&entry.outcome),
            entry.detail.clone().unwrap_or_else(|| "-".to_string()),
        ]);
    }

    println!(
        "{}",
        style(format!("{} audit entries:", entries.len())).bold()
    );
    println!("{table}");
}

#[cfg(feature = "audit-log")]
fn colorize_outcome(outcome: &str) -> String {
    use console::style;

    match outcome {
        "ok" => style(outcome).green().to_string(),
        "failed" => style(outcome).red().to_string(),
        _ => outcome.to_string(),
    }
}
