//! The deployment-wide recovery secret.

use std::fmt;

use zeroize::Zeroizing;

use crate::errors::{CompVaultError, Result};

/// Server-held passphrase that wraps the recovery copy of every domain's
/// master key.
///
/// Provisioned out-of-band and never rotated here.  The value is wiped on
/// drop and never shown by `Debug`.
pub struct ServerSecret(Zeroizing<String>);

impl ServerSecret {
    /// Wrap an already-loaded secret. Empty (or all-whitespace) is refused.
    pub fn new(secret: impl Into<String>) -> Result<Self> {
        let secret = Zeroizing::new(secret.into());
        if secret.trim().is_empty() {
            return Err(CompVaultError::Configuration(
                "server recovery secret is empty".into(),
            ));
        }
        Ok(Self(secret))
    }

    /// Read the secret from the environment variable `var`.
    pub fn from_env(var: &str) -> Result<Self> {
        match std::env::var(var) {
            Ok(value) => Self::new(value)
                .map_err(|_| CompVaultError::Configuration(format!("{var} is set but empty"))),
            Err(_) => Err(CompVaultError::Configuration(format!(
                "{var} is not set; the recovery secret is required for setup and recovery"
            ))),
        }
    }

    pub(crate) fn as_bytes(&self) -> &[u8] {
        self.0.as_bytes()
    }
}

impl fmt::Debug for ServerSecret {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("ServerSecret(<redacted>)")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_is_refused() {
        assert!(ServerSecret::new("").is_err());
        assert!(ServerSecret::new("   ").is_err());
        assert!(ServerSecret::new("s3rver-secret").is_ok());
    }

    #[test]
    fn debug_does_not_leak() {
        let secret = ServerSecret::new("s3rver-secret").unwrap();
        assert!(!format!("{secret:?}").contains("s3rver"));
    }
}
