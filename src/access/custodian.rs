//! In-memory custody of the unwrapped master key for one session.
//!
//! A `SessionCustodian` is created per authenticated session and owned by
//! it; it is never a process-wide singleton.  Operations take `&mut self`,
//! so within a session they cannot race, and `lock()` has finished
//! wiping the key by the time it returns.

use tracing::{info, warn};

use super::field::FieldCipher;
use super::recovery::RecoveryService;
use crate::crypto::{MasterKey, WrapCipher};
use crate::errors::{CompVaultError, Result};
use crate::record::KeyRecordStore;

/// Where a custodian is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CustodyState {
    /// No key held. Protected fields are inaccessible.
    Locked,
    /// An unlock is in progress.
    Unlocking,
    /// The master key is held in memory.
    Unlocked,
}

/// Holds the master key between a successful unlock and the next lock.
#[derive(Debug)]
pub struct SessionCustodian {
    state: CustodyState,
    master_key: Option<MasterKey>,
}

impl Default for SessionCustodian {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionCustodian {
    /// A new custodian starts `Locked`.
    pub fn new() -> Self {
        Self {
            state: CustodyState::Locked,
            master_key: None,
        }
    }

    pub fn state(&self) -> CustodyState {
        self.state
    }

    pub fn is_unlocked(&self) -> bool {
        self.state == CustodyState::Unlocked
    }

    /// Unlock with the user password.
    ///
    /// Any key already held is dropped first, so a failed attempt always
    /// leaves the custodian `Locked`.
    pub fn unlock<S: KeyRecordStore + ?Sized>(
        &mut self,
        store: &S,
        cipher: &WrapCipher,
        password: &str,
    ) -> Result<()> {
        self.lock();
        self.state = CustodyState::Unlocking;

        match Self::open_user_copy(store, cipher, password) {
            Ok(master_key) => {
                self.adopt(master_key);
                info!(domain = %store.domain(), "session unlocked");
                Ok(())
            }
            Err(e) => {
                self.state = CustodyState::Locked;
                warn!(domain = %store.domain(), kind = ?e.kind(), "unlock rejected");
                Err(e)
            }
        }
    }

    /// Reset the password through recovery and unlock with the recovered key.
    pub fn recover_and_unlock<S: KeyRecordStore + ?Sized>(
        &mut self,
        recovery: &RecoveryService<'_, S>,
        new_password: &str,
    ) -> Result<()> {
        self.lock();
        self.state = CustodyState::Unlocking;

        match recovery.recover_key(new_password) {
            Ok(master_key) => {
                self.adopt(master_key);
                Ok(())
            }
            Err(e) => {
                self.state = CustodyState::Locked;
                Err(e)
            }
        }
    }

    /// Drop the master key (zeroized on drop) and return to `Locked`.
    pub fn lock(&mut self) {
        self.master_key = None;
        self.state = CustodyState::Locked;
    }

    /// A field cipher bound to this session.
    pub fn field_cipher(&self) -> FieldCipher<'_> {
        FieldCipher::new(self)
    }

    /// The held key, or `NotUnlocked`.
    pub(crate) fn master_key(&self) -> Result<&MasterKey> {
        match (self.state, self.master_key.as_ref()) {
            (CustodyState::Unlocked, Some(key)) => Ok(key),
            _ => Err(CompVaultError::NotUnlocked),
        }
    }

    fn adopt(&mut self, master_key: MasterKey) {
        self.master_key = Some(master_key);
        self.state = CustodyState::Unlocked;
    }

    fn open_user_copy<S: KeyRecordStore + ?Sized>(
        store: &S,
        cipher: &WrapCipher,
        password: &str,
    ) -> Result<MasterKey> {
        let record = store.get()?.ok_or(CompVaultError::NotSetup)?;
        let user_wrapped = record.user_wrapped().ok_or(CompVaultError::NotSetup)?;

        cipher
            .unwrap(user_wrapped, password.as_bytes())
            .and_then(|plaintext| MasterKey::from_unwrapped(&plaintext))
            .map_err(|_| CompVaultError::WrongPassword)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::access::Provisioner;
    use crate::config::ServerSecret;
    use crate::crypto::kdf::{Argon2Params, MIN_MEMORY_KIB};
    use crate::record::MemoryKeyRecordStore;

    fn cipher() -> WrapCipher {
        WrapCipher::new(Argon2Params {
            memory_kib: MIN_MEMORY_KIB,
            iterations: 1,
            parallelism: 1,
        })
        .unwrap()
    }

    fn provisioned() -> MemoryKeyRecordStore {
        let store = MemoryKeyRecordStore::new("compensation").unwrap();
        let secret = ServerSecret::new("server-secret").unwrap();
        Provisioner::new(&store, cipher(), &secret)
            .setup("secret1")
            .unwrap();
        store
    }

    #[test]
    fn starts_locked() {
        let custodian = SessionCustodian::new();
        assert_eq!(custodian.state(), CustodyState::Locked);
        assert!(!custodian.is_unlocked());
        assert!(matches!(
            custodian.master_key(),
            Err(CompVaultError::NotUnlocked)
        ));
    }

    #[test]
    fn unlock_on_empty_store_is_not_setup() {
        let store = MemoryKeyRecordStore::new("compensation").unwrap();
        let mut custodian = SessionCustodian::new();
        let result = custodian.unlock(&store, &cipher(), "secret1");
        assert!(matches!(result, Err(CompVaultError::NotSetup)));
        assert_eq!(custodian.state(), CustodyState::Locked);
    }

    #[test]
    fn failed_reunlock_drops_previous_key() {
        let store = provisioned();
        let mut custodian = SessionCustodian::new();
        custodian.unlock(&store, &cipher(), "secret1").unwrap();
        assert!(custodian.is_unlocked());

        let result = custodian.unlock(&store, &cipher(), "wrongpw");
        assert!(matches!(result, Err(CompVaultError::WrongPassword)));
        assert_eq!(custodian.state(), CustodyState::Locked);
        assert!(custodian.master_key().is_err());
    }

    #[test]
    fn lock_is_immediate() {
        let store = provisioned();
        let mut custodian = SessionCustodian::new();
        custodian.unlock(&store, &cipher(), "secret1").unwrap();
        custodian.lock();
        assert!(custodian.master_key.is_none());
        assert_eq!(custodian.state(), CustodyState::Locked);
    }
}
