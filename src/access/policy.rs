use crate::errors::{CompVaultError, Result};

/// Default minimum password length, in characters.
pub const DEFAULT_MIN_PASSWORD_LEN: usize = 6;

/// Password acceptance rules applied by setup and recovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PasswordPolicy {
    min_len: usize,
}

impl Default for PasswordPolicy {
    fn default() -> Self {
        Self {
            min_len: DEFAULT_MIN_PASSWORD_LEN,
        }
    }
}

impl PasswordPolicy {
    pub fn new(min_len: usize) -> Self {
        Self { min_len }
    }

    pub fn min_len(&self) -> usize {
        self.min_len
    }

    /// Length is counted in characters, not bytes.
    pub fn check(&self, password: &str) -> Result<()> {
        if password.chars().count() < self.min_len {
            return Err(CompVaultError::WeakPassword { min: self.min_len });
        }
        Ok(())
    }
}
