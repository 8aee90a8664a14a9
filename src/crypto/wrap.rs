//! Passphrase-based key wrapping.
//!
//! `WrapCipher::wrap` turns a secret (normally the master key) into a
//! self-describing text envelope that only the same passphrase can open.
//! The passphrase is stretched with Argon2id under a fresh salt and the
//! secret is sealed with AES-256-GCM under the stretched key.
//!
//! Envelope layout before base64 encoding:
//!
//! ```text
//! [CVWK: 4 bytes][version: 1 byte][m_kib: u32 LE][t: u32 LE][p: u32 LE][salt: 16 bytes][nonce: 12 bytes][ciphertext + tag]
//! ```
//!
//! Everything up to and including the salt is fed to the AEAD as
//! associated data, so changing the KDF parameters or the salt breaks
//! authentication just like changing the ciphertext does.
//!
//! `unwrap` fails closed: a wrong passphrase, a truncated or tampered
//! envelope and an out-of-range parameter block all come back as the same
//! `InvalidKeyOrCorrupt` error.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use super::encryption::{open, seal, NONCE_LEN, TAG_LEN};
use super::kdf::{derive_wrapping_key, generate_salt, Argon2Params, SALT_LEN};
use crate::errors::{CompVaultError, Result};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Magic bytes at the start of every wrapped envelope.
const MAGIC: &[u8; 4] = b"CVWK";

/// Current envelope version.
pub const WRAP_VERSION: u8 = 1;

/// Magic + version + three u32 KDF parameters + salt.
const HEADER_LEN: usize = 4 + 1 + 12 + SALT_LEN;

/// Smallest envelope that can possibly authenticate (empty plaintext).
const MIN_ENVELOPE_LEN: usize = HEADER_LEN + NONCE_LEN + TAG_LEN;

// ---------------------------------------------------------------------------
// WrapCipher
// ---------------------------------------------------------------------------

/// Wraps and unwraps secrets under a passphrase.
///
/// The configured parameters only affect `wrap`; `unwrap` reads the
/// parameters out of the envelope it is given.
#[derive(Debug, Clone, Copy, Default)]
pub struct WrapCipher {
    params: Argon2Params,
}

impl WrapCipher {
    /// Build a cipher that wraps with the given Argon2id parameters.
    pub fn new(params: Argon2Params) -> Result<Self> {
        params.validate()?;
        Ok(Self { params })
    }

    /// Parameters new envelopes are written with.
    pub fn params(&self) -> Argon2Params {
        self.params
    }

    /// Seal `plaintext` under `passphrase`.
    ///
    /// Two calls with identical inputs produce different envelopes (fresh
    /// salt and nonce) that open to the same plaintext.
    pub fn wrap(&self, plaintext: &[u8], passphrase: &[u8]) -> Result<String> {
        let salt = generate_salt();
        let header = encode_header(&self.params, &salt);

        let key = derive_wrapping_key(passphrase, &salt, &self.params)?;
        let sealed = seal(&key[..], plaintext, &header)?;

        let mut envelope = Vec::with_capacity(header.len() + sealed.len());
        envelope.extend_from_slice(&header);
        envelope.extend_from_slice(&sealed);
        Ok(BASE64.encode(envelope))
    }

    /// Open an envelope produced by `wrap`.
    pub fn unwrap(&self, wrapped: &str, passphrase: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let envelope = BASE64
            .decode(wrapped.trim())
            .map_err(|_| CompVaultError::InvalidKeyOrCorrupt)?;

        if envelope.len() < MIN_ENVELOPE_LEN {
            return Err(CompVaultError::InvalidKeyOrCorrupt);
        }

        let (header, sealed) = envelope.split_at(HEADER_LEN);
        let (params, salt) = decode_header(header)?;

        let key = derive_wrapping_key(passphrase, salt, &params)
            .map_err(|_| CompVaultError::InvalidKeyOrCorrupt)?;
        let plaintext = open(&key[..], sealed, header)?;

        Ok(Zeroizing::new(plaintext))
    }
}

// ---------------------------------------------------------------------------
// Header encoding
// ---------------------------------------------------------------------------

fn encode_header(params: &Argon2Params, salt: &[u8; SALT_LEN]) -> Vec<u8> {
    let mut header = Vec::with_capacity(HEADER_LEN);
    header.extend_from_slice(MAGIC);
    header.push(WRAP_VERSION);
    header.extend_from_slice(&params.memory_kib.to_le_bytes());
    header.extend_from_slice(&params.iterations.to_le_bytes());
    header.extend_from_slice(&params.parallelism.to_le_bytes());
    header.extend_from_slice(salt);
    header
}

fn decode_header(header: &[u8]) -> Result<(Argon2Params, &[u8])> {
    if header.len() != HEADER_LEN || &header[0..4] != MAGIC || header[4] != WRAP_VERSION {
        return Err(CompVaultError::InvalidKeyOrCorrupt);
    }

    let read_u32 = |at: usize| -> Result<u32> {
        header[at..at + 4]
            .try_into()
            .map(u32::from_le_bytes)
            .map_err(|_| CompVaultError::InvalidKeyOrCorrupt)
    };

    let params = Argon2Params {
        memory_kib: read_u32(5)?,
        iterations: read_u32(9)?,
        parallelism: read_u32(13)?,
    };
    if !params.within_unwrap_limits() {
        return Err(CompVaultError::InvalidKeyOrCorrupt);
    }

    Ok((params, &header[17..HEADER_LEN]))
}
