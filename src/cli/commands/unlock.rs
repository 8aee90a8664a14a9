//! `compvault unlock`: check that a password opens the master key.

use crate::cli::commands::open_session;
use crate::cli::{output, Cli, Context};
use crate::errors::Result;

/// Execute the `unlock` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut custodian = open_session(&ctx)?;
    custodian.lock();

    output::success(&format!(
        "Password accepted for domain '{}'",
        ctx.settings.domain
    ));
    Ok(())
}
