//! The Master Key and the sub-keys derived from it.
//!
//! The MK is 32 random bytes.  It is never used directly as an AES key for
//! field values: HKDF-SHA256 expands it into a dedicated field key, so the
//! MK itself only ever appears as the plaintext inside a wrapped envelope.

use std::fmt;

use hkdf::Hkdf;
use rand::RngCore;
use sha2::Sha256;
use zeroize::{Zeroize, ZeroizeOnDrop, Zeroizing};

use crate::errors::{CompVaultError, Result};

/// Length of the master key and derived sub-keys (256 bits).
pub const KEY_LEN: usize = 32;

/// HKDF `info` for the key that encrypts protected field values.
const FIELD_KEY_INFO: &[u8] = b"compvault-field-v1";

/// Run HKDF-SHA256 expand with the given `info`.
///
/// The extract step uses a zero salt; the input is already uniformly
/// random so no further conditioning is needed.
fn hkdf_derive(ikm: &[u8], info: &[u8]) -> Result<Zeroizing<[u8; KEY_LEN]>> {
    let hk = Hkdf::<Sha256>::new(None, ikm);

    let mut okm = Zeroizing::new([0u8; KEY_LEN]);
    hk.expand(info, &mut okm[..])
        .map_err(|e| CompVaultError::KeyDerivationFailed(format!("HKDF expand failed: {e}")))?;

    Ok(okm)
}

/// A 32-byte master key that zeroes its memory when dropped.
///
/// Not `Clone`, not `Serialize`; `Debug` is redacted.
#[derive(Zeroize, ZeroizeOnDrop)]
pub struct MasterKey {
    bytes: [u8; KEY_LEN],
}

impl MasterKey {
    /// Draw a fresh master key from the OS CSPRNG.
    pub fn generate() -> Self {
        let mut bytes = [0u8; KEY_LEN];
        rand::rngs::OsRng.fill_bytes(&mut bytes);
        let key = Self { bytes };
        bytes.zeroize();
        key
    }

    /// Rebuild a master key from unwrapped bytes.
    ///
    /// Anything other than exactly 32 bytes is treated as corruption.
    pub fn from_unwrapped(plaintext: &[u8]) -> Result<Self> {
        let bytes: [u8; KEY_LEN] = plaintext
            .try_into()
            .map_err(|_| CompVaultError::InvalidKeyOrCorrupt)?;
        Ok(Self { bytes })
    }

    /// Raw key bytes, for wrapping only.
    pub(crate) fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Derive the key that encrypts protected field values.
    pub(crate) fn derive_field_key(&self) -> Result<Zeroizing<[u8; KEY_LEN]>> {
        hkdf_derive(&self.bytes, FIELD_KEY_INFO)
    }

    /// Constant-time equality against another master key.
    pub fn ct_eq(&self, other: &MasterKey) -> bool {
        use subtle::ConstantTimeEq;
        self.bytes[..].ct_eq(&other.bytes[..]).into()
    }
}

impl fmt::Debug for MasterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("MasterKey(<redacted>)")
    }
}
