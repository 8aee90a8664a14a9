//! First-time provisioning of a protection domain.
//!
//! Generates the master key and writes it to the store exactly twice:
//! once wrapped under the user's password and once under the server
//! recovery secret.  The two copies go out in a single `put`, so the store
//! never holds a record with only one of them.

use tracing::{info, warn};

use super::policy::PasswordPolicy;
use crate::config::ServerSecret;
use crate::crypto::{MasterKey, WrapCipher};
use crate::errors::{CompVaultError, Result};
use crate::record::{KeyRecord, KeyRecordStore};

/// Creates the key record for one domain.
pub struct Provisioner<'a, S: KeyRecordStore + ?Sized> {
    store: &'a S,
    cipher: WrapCipher,
    secret: &'a ServerSecret,
    policy: PasswordPolicy,
    verify: bool,
}

impl<'a, S: KeyRecordStore + ?Sized> Provisioner<'a, S> {
    /// Default policy, self-check enabled.
    pub fn new(store: &'a S, cipher: WrapCipher, secret: &'a ServerSecret) -> Self {
        Self {
            store,
            cipher,
            secret,
            policy: PasswordPolicy::default(),
            verify: true,
        }
    }

    pub fn with_policy(mut self, policy: PasswordPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Toggle the write-time check that both copies open to the same key.
    pub fn verify_on_setup(mut self, verify: bool) -> Self {
        self.verify = verify;
        self
    }

    /// Provision the domain.
    ///
    /// Fails with `AlreadySetup` if the record holds a user copy or a
    /// recovery copy. A record with neither is treated as unprovisioned.
    pub fn setup(&self, password: &str) -> Result<()> {
        self.provision(password, false)
    }

    /// Provision the domain even if a record already exists.
    ///
    /// This generates a brand-new master key.  Anything protected under
    /// the old one becomes unreadable.
    pub fn reprovision(&self, password: &str) -> Result<()> {
        self.provision(password, true)
    }

    fn provision(&self, password: &str, force: bool) -> Result<()> {
        self.policy.check(password)?;

        if !force
            && self
                .store
                .get()?
                .is_some_and(|record| record.is_setup() || record.recovery_wrapped().is_some())
        {
            return Err(CompVaultError::AlreadySetup);
        }

        let master_key = MasterKey::generate();
        let user_wrapped = self.cipher.wrap(master_key.as_bytes(), password.as_bytes())?;
        let recovery_wrapped = self
            .cipher
            .wrap(master_key.as_bytes(), self.secret.as_bytes())?;

        if self.verify {
            self.check_copies(&master_key, &user_wrapped, &recovery_wrapped, password)?;
        }

        let record = KeyRecord::new(user_wrapped, recovery_wrapped);
        self.store.put(&record)?;

        if self.verify {
            self.check_persisted(&record)?;
        }

        info!(domain = %self.store.domain(), reprovisioned = force, "key record provisioned");
        Ok(())
    }

    /// Open both fresh copies and confirm they hold the key we generated.
    fn check_copies(
        &self,
        master_key: &MasterKey,
        user_wrapped: &str,
        recovery_wrapped: &str,
        password: &str,
    ) -> Result<()> {
        let from_user =
            MasterKey::from_unwrapped(&self.cipher.unwrap(user_wrapped, password.as_bytes())?)?;
        let from_recovery = MasterKey::from_unwrapped(
            &self
                .cipher
                .unwrap(recovery_wrapped, self.secret.as_bytes())?,
        )?;

        if !(master_key.ct_eq(&from_user) && master_key.ct_eq(&from_recovery)) {
            warn!(domain = %self.store.domain(), "wrapped copies disagree before write");
            return Err(CompVaultError::EncryptionFailed(
                "wrapped copies do not open to the same master key".into(),
            ));
        }
        Ok(())
    }

    /// Read the record back and confirm the store kept what we wrote.
    fn check_persisted(&self, written: &KeyRecord) -> Result<()> {
        let stored = self.store.get()?.ok_or_else(|| {
            CompVaultError::Store("key record missing immediately after write".into())
        })?;

        if stored.user_wrapped != written.user_wrapped
            || stored.recovery_wrapped != written.recovery_wrapped
        {
            warn!(domain = %self.store.domain(), "key record read-back mismatch");
            return Err(CompVaultError::Store(
                "key record read back differs from what was written".into(),
            ));
        }
        Ok(())
    }
}
