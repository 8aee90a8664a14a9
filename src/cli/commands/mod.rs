//! One module per subcommand.

pub mod audit_cmd;
pub mod protect;
pub mod recover;
pub mod reveal;
pub mod setup;
pub mod status;
pub mod unlock;

use crate::access::SessionCustodian;
use crate::api::ApiResponse;
use crate::cli::{output, prompt_password, Context};
use crate::crypto::WrapCipher;
use crate::errors::{CompVaultError, Result};
use crate::record::KeyRecordStore;

/// Turn a non-200 endpoint response into a command failure.
///
/// The JSON body has already been printed, so the error only names the status.
pub(crate) fn check_response(response: &ApiResponse) -> Result<()> {
    if response.is_success() {
        Ok(())
    } else {
        Err(CompVaultError::CommandFailed(format!(
            "request failed with status {}",
            response.status
        )))
    }
}

/// Prompt for the password and unlock a session for the configured domain.
///
/// The attempt is audited whether or not it succeeds.
pub(crate) fn open_session(ctx: &Context) -> Result<SessionCustodian> {
    let store = ctx.store()?;
    let cipher = WrapCipher::new(ctx.settings.argon2_params())?;

    let mut custodian = SessionCustodian::new();
    let result = match store.get() {
        Ok(Some(record)) if record.is_setup() => {
            prompt_password().and_then(|password| custodian.unlock(&store, &cipher, &password))
        }
        Ok(_) => {
            output::tip("Run `compvault setup` to provision this domain.");
            Err(CompVaultError::NotSetup)
        }
        Err(e) => Err(e),
    };

    if let Some(audit) = ctx.audit() {
        audit.record("unlock", store.domain(), &result);
    }

    result?;
    Ok(custodian)
}
