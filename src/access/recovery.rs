//! Password recovery through the server-held secret.
//!
//! Recovery opens the recovery copy of the master key with the server
//! secret and wraps the same key again under a new password.  Only the
//! user-wrapped field of the record changes, so the two copies keep
//! opening to the same key.  The previous password is never needed.

use tracing::{info, warn};

use super::policy::PasswordPolicy;
use crate::config::ServerSecret;
use crate::crypto::{MasterKey, WrapCipher};
use crate::errors::{CompVaultError, Result};
use crate::record::{KeyRecordPatch, KeyRecordStore};

/// Resets the user password of one domain.
pub struct RecoveryService<'a, S: KeyRecordStore + ?Sized> {
    store: &'a S,
    cipher: WrapCipher,
    secret: &'a ServerSecret,
    policy: PasswordPolicy,
}

impl<'a, S: KeyRecordStore + ?Sized> RecoveryService<'a, S> {
    pub fn new(store: &'a S, cipher: WrapCipher, secret: &'a ServerSecret) -> Self {
        Self {
            store,
            cipher,
            secret,
            policy: PasswordPolicy::default(),
        }
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Replace the user-wrapped copy with one under `new_password`.
    pub fn recover(&self, new_password: &str) -> Result<()> {
        self.recover_key(new_password).map(drop)
    }

    /// Same as `recover`, handing the recovered key back to the caller so a
    /// session can be unlocked without a second KDF pass.
    pub(crate) fn recover_key(&self, new_password: &str) -> Result<MasterKey> {
        self.policy.check(new_password)?;

        let record = self.store.get()?.ok_or(CompVaultError::NotSetup)?;
        let recovery_wrapped = record
            .recovery_wrapped()
            .ok_or(CompVaultError::MissingRecoveryKey)?;

        let master_key = self
            .cipher
            .unwrap(recovery_wrapped, self.secret.as_bytes())
            .and_then(|plaintext| MasterKey::from_unwrapped(&plaintext))
            .map_err(|_| {
                warn!(domain = %self.store.domain(), "recovery copy did not open with the server secret");
                CompVaultError::InvalidServerSecretOrCorrupted
            })?;

        let user_wrapped = self
            .cipher
            .wrap(master_key.as_bytes(), new_password.as_bytes())?;
        self.store.patch(KeyRecordPatch::user_wrapped(user_wrapped))?;

        info!(domain = %self.store.domain(), "user password reset through recovery");
        Ok(master_key)
    }
}
