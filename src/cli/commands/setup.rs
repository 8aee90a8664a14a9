//! `compvault setup`: generate the master key and store both wrapped copies.

use crate::api::{KeyService, SetupRequest};
use crate::cli::commands::check_response;
use crate::cli::{output, prompt_new_password, Cli, Context};
use crate::errors::Result;

/// Execute the `setup` command.
pub fn execute(cli: &Cli, force: bool) -> Result<()> {
    let ctx = Context::load(cli)?;

    // Fail on a missing secret before asking for anything.
    let secret = ctx.settings.recovery_secret()?;

    let mut service = KeyService::new(ctx.store()?, &ctx.settings, Some(secret))?;
    if let Some(audit) = ctx.audit() {
        service = service.with_audit(audit);
    }

    let request = SetupRequest {
        password: prompt_new_password(ctx.settings.password_policy())?,
    };

    let response = if force {
        output::warning(&format!(
            "Replacing the key record for '{}': values protected under the old key will be unreadable.",
            ctx.settings.domain
        ));
        service.reprovision(&request)
    } else {
        service.setup(&request)
    };

    output::json_body(&response)?;
    check_response(&response)
}
