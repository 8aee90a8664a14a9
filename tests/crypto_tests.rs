//! Integration tests for the CompVault crypto module.

use compvault::crypto::kdf::MIN_MEMORY_KIB;
use compvault::crypto::{open, seal, Argon2Params, MasterKey, WrapCipher};
use compvault::errors::CompVaultError;

fn fast_cipher() -> WrapCipher {
    WrapCipher::new(Argon2Params {
        memory_kib: MIN_MEMORY_KIB,
        iterations: 1,
        parallelism: 1,
    })
    .expect("minimum params are valid")
}

// ---------------------------------------------------------------------------
// Wrap / unwrap
// ---------------------------------------------------------------------------

#[test]
fn wrap_then_unwrap_returns_plaintext() {
    let cipher = fast_cipher();
    let secret = [0x42u8; 32];

    let wrapped = cipher.wrap(&secret, b"secret1").expect("wrap");
    let unwrapped = cipher.unwrap(&wrapped, b"secret1").expect("unwrap");

    assert_eq!(&unwrapped[..], &secret[..]);
}

#[test]
fn wrong_passphrase_is_rejected_as_invalid_key_or_corrupt() {
    let cipher = fast_cipher();
    let wrapped = cipher.wrap(b"payload", b"correct horse").unwrap();

    let result = cipher.unwrap(&wrapped, b"battery staple");
    assert!(matches!(result, Err(CompVaultError::InvalidKeyOrCorrupt)));
}

#[test]
fn wrapping_twice_gives_different_envelopes() {
    let cipher = fast_cipher();
    let a = cipher.wrap(b"same", b"pw1234").unwrap();
    let b = cipher.wrap(b"same", b"pw1234").unwrap();

    assert_ne!(a, b, "salt and nonce must be fresh per wrap");
    assert_eq!(&cipher.unwrap(&a, b"pw1234").unwrap()[..], b"same");
    assert_eq!(&cipher.unwrap(&b, b"pw1234").unwrap()[..], b"same");
}

#[test]
fn unwrap_reads_params_from_the_envelope() {
    let writer = WrapCipher::new(Argon2Params {
        memory_kib: MIN_MEMORY_KIB * 2,
        iterations: 2,
        parallelism: 1,
    })
    .unwrap();
    let wrapped = writer.wrap(b"mk", b"pw1234").unwrap();

    // A cipher configured differently still opens it.
    assert_eq!(&fast_cipher().unwrap(&wrapped, b"pw1234").unwrap()[..], b"mk");
}

#[test]
fn malformed_input_is_invalid_key_or_corrupt() {
    let cipher = fast_cipher();
    for bad in ["", "not base64 at all!", "AAAA", "Q1ZXSw=="] {
        assert!(
            matches!(
                cipher.unwrap(bad, b"pw1234"),
                Err(CompVaultError::InvalidKeyOrCorrupt)
            ),
            "input {bad:?} should be rejected"
        );
    }
}

#[test]
fn weak_params_are_refused_at_construction() {
    let result = WrapCipher::new(Argon2Params {
        memory_kib: 1024,
        iterations: 1,
        parallelism: 1,
    });
    assert!(matches!(
        result,
        Err(CompVaultError::KeyDerivationFailed(_))
    ));
}

// ---------------------------------------------------------------------------
// Master key
// ---------------------------------------------------------------------------

#[test]
fn generated_master_keys_differ() {
    let a = MasterKey::generate();
    let b = MasterKey::generate();
    assert!(!a.ct_eq(&b));
}

#[test]
fn master_key_requires_exactly_32_bytes() {
    assert!(MasterKey::from_unwrapped(&[7u8; 32]).is_ok());
    assert!(MasterKey::from_unwrapped(&[]).is_err());
    assert!(MasterKey::from_unwrapped(&[7u8; 31]).is_err());
    assert!(MasterKey::from_unwrapped(&[7u8; 33]).is_err());
}

#[test]
fn master_key_debug_is_redacted() {
    let key = MasterKey::from_unwrapped(&[0xAA; 32]).unwrap();
    let shown = format!("{key:?}");
    assert!(!shown.contains("170"));
    assert!(!shown.to_lowercase().contains("aa"));
}

// ---------------------------------------------------------------------------
// AEAD
// ---------------------------------------------------------------------------

#[test]
fn seal_open_roundtrip_with_aad() {
    let key = [0xABu8; 32];
    let sealed = seal(&key, b"base salary", b"cvf1:").unwrap();
    assert_eq!(open(&key, &sealed, b"cvf1:").unwrap(), b"base salary");
}

#[test]
fn tampered_ciphertext_fails() {
    let key = [0xABu8; 32];
    let mut sealed = seal(&key, b"bonus", &[]).unwrap();
    let last = sealed.len() - 1;
    sealed[last] ^= 0xFF;
    assert!(matches!(
        open(&key, &sealed, &[]),
        Err(CompVaultError::InvalidKeyOrCorrupt)
    ));
}
