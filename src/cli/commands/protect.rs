//! `compvault protect`: encrypt one field value and print the `cvf1:` text.

use crate::cli::commands::open_session;
use crate::cli::{Cli, Context, FieldKind};
use crate::errors::Result;

/// Execute the `protect` command.
pub fn execute(cli: &Cli, value: &str, kind: FieldKind) -> Result<()> {
    // Reject malformed input before prompting for a password.
    let value = kind.parse(value)?;

    let ctx = Context::load(cli)?;
    let mut custodian = open_session(&ctx)?;
    let protected = custodian.field_cipher().protect(&value);
    custodian.lock();

    println!("{}", protected?);
    Ok(())
}
