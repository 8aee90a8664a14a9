//! `compvault status`: print `{"isSetup": bool}` for the domain.

use crate::api::KeyService;
use crate::cli::commands::check_response;
use crate::cli::{output, Cli, Context};
use crate::errors::Result;

/// Execute the `status` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let ctx = Context::load(cli)?;

    // Status never needs the recovery secret.
    let service = KeyService::new(ctx.store()?, &ctx.settings, None)?;
    let response = service.status();

    output::json_body(&response)?;
    check_response(&response)
}
