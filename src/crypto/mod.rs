//! Cryptographic primitives for CompVault.
//!
//! This module provides:
//! - AES-256-GCM sealing with associated data (`encryption`)
//! - Argon2id passphrase stretching (`kdf`)
//! - The zeroizing `MasterKey` and its HKDF sub-keys (`keys`)
//! - Passphrase-based wrapping of the master key (`wrap`)

pub mod encryption;
pub mod kdf;
pub mod keys;
pub mod wrap;

pub use encryption::{open, seal};
pub use kdf::{derive_wrapping_key, generate_salt, Argon2Params};
pub use keys::MasterKey;
pub use wrap::WrapCipher;
