//! `compvault recover`: set a new password using the server recovery secret.
//!
//! The old password is not needed.  The master key is unchanged, so every
//! protected value stays readable under the new password.

use crate::api::{KeyService, RecoverRequest};
use crate::cli::commands::check_response;
use crate::cli::{output, prompt_new_password, Cli, Context};
use crate::errors::Result;

/// Execute the `recover` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;
    let secret = ctx.settings.recovery_secret()?;

    let mut service = KeyService::new(ctx.store()?, &ctx.settings, Some(secret))?;
    if let Some(audit) = ctx.audit() {
        service = service.with_audit(audit);
    }

    let request = RecoverRequest {
        new_password: prompt_new_password(ctx.settings.password_policy())?,
    };
    let response = service.recover(&request);

    output::json_body(&response)?;
    check_response(&response)
}
