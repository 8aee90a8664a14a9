//! AES-256-GCM authenticated encryption.
//!
//! Every call to `seal` draws a fresh random 12-byte nonce and prepends it
//! to the output; `open` splits it back off.  Optional associated data is
//! authenticated but not encrypted.
//!
//! Layout of a sealed buffer:
//!   [ 12-byte nonce | ciphertext + 16-byte auth tag ]

use aes_gcm::aead::{Aead, KeyInit, OsRng, Payload};
use aes_gcm::{AeadCore, Aes256Gcm, Nonce};

use crate::errors::{CompVaultError, Result};

/// Size of the AES-256-GCM nonce in bytes.
pub const NONCE_LEN: usize = 12;

/// Size of the AES-256-GCM authentication tag in bytes.
pub const TAG_LEN: usize = 16;

/// Encrypt `plaintext` under a 32-byte `key`, authenticating `aad` too.
///
/// Returns `nonce || ciphertext || tag`.
pub fn seal(key: &[u8], plaintext: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| CompVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let ciphertext = cipher
        .encrypt(
            &nonce,
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|e| CompVaultError::EncryptionFailed(format!("encryption error: {e}")))?;

    let mut output = Vec::with_capacity(NONCE_LEN + ciphertext.len());
    output.extend_from_slice(&nonce);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt a buffer produced by `seal` with the same key and `aad`.
///
/// Any failure, including a short buffer, is `InvalidKeyOrCorrupt`.
pub fn open(key: &[u8], sealed: &[u8], aad: &[u8]) -> Result<Vec<u8>> {
    if sealed.len() < NONCE_LEN + TAG_LEN {
        return Err(CompVaultError::InvalidKeyOrCorrupt);
    }

    let (nonce_bytes, ciphertext) = sealed.split_at(NONCE_LEN);
    let nonce = Nonce::from_slice(nonce_bytes);

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| CompVaultError::InvalidKeyOrCorrupt)?;

    cipher
        .decrypt(
            nonce,
            Payload {
                msg: ciphertext,
                aad,
            },
        )
        .map_err(|_| CompVaultError::InvalidKeyOrCorrupt)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aad_mismatch_is_rejected() {
        let key = [0x5Au8; 32];
        let sealed = seal(&key, b"salary", b"header-a").unwrap();
        assert!(open(&key, &sealed, b"header-a").is_ok());
        assert!(matches!(
            open(&key, &sealed, b"header-b"),
            Err(CompVaultError::InvalidKeyOrCorrupt)
        ));
    }

    #[test]
    fn nonce_only_buffer_is_rejected() {
        let key = [0x5Au8; 32];
        assert!(open(&key, &[0u8; NONCE_LEN], &[]).is_err());
    }
}
