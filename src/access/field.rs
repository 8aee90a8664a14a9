//! Encryption of individual protected field values under the session key.
//!
//! Values are first put into a canonical, versioned byte form so that
//! `reveal` can check structure as well as authenticity:
//!
//! ```text
//! [schema version: 1 byte][type tag: 1 byte][payload]
//! ```
//!
//! | tag  | type    | payload              |
//! |------|---------|----------------------|
//! | 0x00 | Null    | empty                |
//! | 0x01 | Bool    | 1 byte, 0 or 1       |
//! | 0x02 | Integer | i64, little-endian   |
//! | 0x03 | Decimal | UTF-8 decimal text   |
//! | 0x04 | Text    | UTF-8                |
//!
//! The encoded bytes are sealed with AES-256-GCM under a key derived from
//! the master key, and rendered as `cvf1:<base64(nonce || ciphertext)>`.

use std::fmt;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use zeroize::Zeroizing;

use super::custodian::SessionCustodian;
use crate::crypto::encryption::{open, seal};
use crate::errors::{CompVaultError, Result};

/// Text prefix of every protected value; also bound as associated data.
const PREFIX: &str = "cvf1:";

/// Version of the canonical plaintext layout.
const SCHEMA_VERSION: u8 = 1;

const TAG_NULL: u8 = 0x00;
const TAG_BOOL: u8 = 0x01;
const TAG_INTEGER: u8 = 0x02;
const TAG_DECIMAL: u8 = 0x03;
const TAG_TEXT: u8 = 0x04;

// ---------------------------------------------------------------------------
// FieldValue
// ---------------------------------------------------------------------------

/// A single sensitive value, e.g. a salary or a bonus note.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldValue {
    Null,
    Bool(bool),
    Integer(i64),
    /// Canonical decimal text: optional `-`, digits, optional `.digits`.
    Decimal(String),
    Text(String),
}

impl FieldValue {
    /// Build a `Decimal`, rejecting anything that is not plain decimal text.
    pub fn decimal(text: &str) -> Result<Self> {
        if !is_decimal(text) {
            return Err(CompVaultError::InvalidFieldFormat(format!(
                "'{text}' is not a decimal number"
            )));
        }
        Ok(Self::Decimal(text.to_string()))
    }

    fn encode(&self) -> Zeroizing<Vec<u8>> {
        let mut out = Zeroizing::new(vec![SCHEMA_VERSION]);
        match self {
            Self::Null => out.push(TAG_NULL),
            Self::Bool(b) => {
                out.push(TAG_BOOL);
                out.push(u8::from(*b));
            }
            Self::Integer(n) => {
                out.push(TAG_INTEGER);
                out.extend_from_slice(&n.to_le_bytes());
            }
            Self::Decimal(d) => {
                out.push(TAG_DECIMAL);
                out.extend_from_slice(d.as_bytes());
            }
            Self::Text(t) => {
                out.push(TAG_TEXT);
                out.extend_from_slice(t.as_bytes());
            }
        }
        out
    }

    fn decode(bytes: &[u8]) -> Result<Self> {
        let malformed = |what: &str| CompVaultError::InvalidFieldFormat(what.to_string());

        let (&version, rest) = bytes.split_first().ok_or_else(|| malformed("empty value"))?;
        if version != SCHEMA_VERSION {
            return Err(malformed("unsupported schema version"));
        }
        let (&tag, payload) = rest.split_first().ok_or_else(|| malformed("missing type tag"))?;

        match tag {
            TAG_NULL if payload.is_empty() => Ok(Self::Null),
            TAG_BOOL => match payload {
                [0] => Ok(Self::Bool(false)),
                [1] => Ok(Self::Bool(true)),
                _ => Err(malformed("bad boolean payload")),
            },
            TAG_INTEGER => payload
                .try_into()
                .map(|raw| Self::Integer(i64::from_le_bytes(raw)))
                .map_err(|_| malformed("bad integer payload")),
            TAG_DECIMAL => {
                let text =
                    std::str::from_utf8(payload).map_err(|_| malformed("decimal is not UTF-8"))?;
                Self::decimal(text)
            }
            TAG_TEXT => std::str::from_utf8(payload)
                .map(|t| Self::Text(t.to_string()))
                .map_err(|_| malformed("text is not UTF-8")),
            _ => Err(malformed("unknown type tag")),
        }
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str("null"),
            Self::Bool(b) => write!(f, "{b}"),
            Self::Integer(n) => write!(f, "{n}"),
            Self::Decimal(d) => f.write_str(d),
            Self::Text(t) => f.write_str(t),
        }
    }
}

impl From<i64> for FieldValue {
    fn from(n: i64) -> Self {
        Self::Integer(n)
    }
}

impl From<bool> for FieldValue {
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

impl From<&str> for FieldValue {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

fn is_decimal(text: &str) -> bool {
    let unsigned = text.strip_prefix('-').unwrap_or(text);
    let (whole, frac) = match unsigned.split_once('.') {
        Some((w, f)) => (w, Some(f)),
        None => (unsigned, None),
    };
    let all_digits = |s: &str| !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit());
    all_digits(whole) && frac.map_or(true, all_digits)
}

// ---------------------------------------------------------------------------
// FieldCipher
// ---------------------------------------------------------------------------

/// Protects and reveals field values with the key held by a custodian.
///
/// Every call checks custody: once the custodian is locked, both
/// operations fail with `NotUnlocked`.
#[derive(Debug, Clone, Copy)]
pub struct FieldCipher<'a> {
    custodian: &'a SessionCustodian,
}

impl<'a> FieldCipher<'a> {
    pub fn new(custodian: &'a SessionCustodian) -> Self {
        Self { custodian }
    }

    /// Encrypt a value into its protected text form.
    pub fn protect(&self, value: &FieldValue) -> Result<String> {
        let field_key = self.custodian.master_key()?.derive_field_key()?;
        let plaintext = value.encode();
        let sealed = seal(&field_key[..], &plaintext, PREFIX.as_bytes())?;
        Ok(format!("{PREFIX}{}", BASE64.encode(sealed)))
    }

    /// Decrypt a protected value.
    ///
    /// A wrong key, tampering and a malformed envelope all fail; nothing
    /// partial is ever returned.
    pub fn reveal(&self, protected: &str) -> Result<FieldValue> {
        let field_key = self.custodian.master_key()?.derive_field_key()?;

        let body = protected
            .trim()
            .strip_prefix(PREFIX)
            .ok_or(CompVaultError::InvalidKeyOrCorrupt)?;
        let sealed = BASE64
            .decode(body)
            .map_err(|_| CompVaultError::InvalidKeyOrCorrupt)?;

        let plaintext = Zeroizing::new(open(&field_key[..], &sealed, PREFIX.as_bytes())?);
        FieldValue::decode(&plaintext)
    }
}
