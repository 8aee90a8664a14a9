//! `compvault reveal`: decrypt one `cvf1:` value and print it.

use crate::cli::commands::open_session;
use crate::cli::{Cli, Context};
use crate::errors::Result;

/// Execute the `reveal` command.
pub fn execute(cli: &Cli, ciphertext: &str) -> Result<()> {
    let ctx = Context::load(cli)?;
    let mut custodian = open_session(&ctx)?;
    let value = custodian.field_cipher().reveal(ciphertext);
    custodian.lock();

    println!("{}", value?);
    Ok(())
}
