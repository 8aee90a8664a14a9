use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::secret::ServerSecret;
use crate::errors::{CompVaultError, Result};

/// Deployment configuration, loaded from `.compvault.toml`.
///
/// Every field has a sensible default so CompVault works out-of-the-box
/// without any config file at all.  The recovery secret itself is never
/// read from this file, only the name of the environment variable that
/// carries it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Protection domain whose key record this deployment manages.
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Directory (relative to the working directory) holding key records.
    #[serde(default = "default_store_dir")]
    pub store_dir: String,

    /// Argon2 memory cost in KiB (default: 64 MB).
    #[serde(default = "default_argon2_memory_kib")]
    pub argon2_memory_kib: u32,

    /// Argon2 iteration count (default: 3).
    #[serde(default = "default_argon2_iterations")]
    pub argon2_iterations: u32,

    /// Argon2 parallelism degree (default: 4).
    #[serde(default = "default_argon2_parallelism")]
    pub argon2_parallelism: u32,

    /// Minimum password length in characters (default: 6).
    #[serde(default = "default_min_password_len")]
    pub min_password_len: usize,

    /// Unwrap both copies and compare them before a setup is committed.
    #[serde(default = "default_verify_on_setup")]
    pub verify_on_setup: bool,

    /// Environment variable holding the server recovery secret.
    #[serde(default = "default_recovery_secret_env")]
    pub recovery_secret_env: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_domain() -> String {
    "compensation".to_string()
}

fn default_store_dir() -> String {
    ".compvault".to_string()
}

fn default_argon2_memory_kib() -> u32 {
    65_536 // 64 MB
}

fn default_argon2_iterations() -> u32 {
    3
}

fn default_argon2_parallelism() -> u32 {
    4
}

fn default_min_password_len() -> usize {
    6
}

fn default_verify_on_setup() -> bool {
    true
}

fn default_recovery_secret_env() -> String {
    "COMPVAULT_RECOVERY_SECRET".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            domain: default_domain(),
            store_dir: default_store_dir(),
            argon2_memory_kib: default_argon2_memory_kib(),
            argon2_iterations: default_argon2_iterations(),
            argon2_parallelism: default_argon2_parallelism(),
            min_password_len: default_min_password_len(),
            verify_on_setup: default_verify_on_setup(),
            recovery_secret_env: default_recovery_secret_env(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the working directory.
    const FILE_NAME: &'static str = ".compvault.toml";

    /// Load settings from `<project_dir>/.compvault.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be read or parsed, a configuration
    /// error is returned.
    pub fn load(project_dir: &Path) -> Result<Self> {
        let config_path = project_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path).map_err(|e| {
            CompVaultError::Configuration(format!(
                "Failed to read {}: {e}",
                config_path.display()
            ))
        })?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            CompVaultError::Configuration(format!(
                "Failed to parse {}: {e}",
                config_path.display()
            ))
        })?;

        Ok(settings)
    }

    /// Full path of the key record directory.
    ///
    /// Example: `project_dir/.compvault`
    pub fn store_path(&self, project_dir: &Path) -> PathBuf {
        project_dir.join(&self.store_dir)
    }

    /// Convert the Argon2 settings into crypto-layer params.
    pub fn argon2_params(&self) -> crate::crypto::kdf::Argon2Params {
        crate::crypto::kdf::Argon2Params {
            memory_kib: self.argon2_memory_kib,
            iterations: self.argon2_iterations,
            parallelism: self.argon2_parallelism,
        }
    }

    /// Password policy derived from these settings.
    pub fn password_policy(&self) -> crate::access::PasswordPolicy {
        crate::access::PasswordPolicy::new(self.min_password_len)
    }

    /// Read the server recovery secret from the configured variable.
    ///
    /// Missing or empty is a fatal configuration error.
    pub fn recovery_secret(&self) -> Result<ServerSecret> {
        ServerSecret::from_env(&self.recovery_secret_env)
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert_eq!(s.domain, "compensation");
        assert_eq!(s.store_dir, ".compvault");
        assert_eq!(s.argon2_memory_kib, 65_536);
        assert_eq!(s.argon2_iterations, 3);
        assert_eq!(s.argon2_parallelism, 4);
        assert_eq!(s.min_password_len, 6);
        assert!(s.verify_on_setup);
        assert_eq!(s.recovery_secret_env, "COMPVAULT_RECOVERY_SECRET");
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.domain, "compensation");
    }

    #[test]
    fn load_parses_toml_file() {
        let tmp = TempDir::new().unwrap();
        let config = r#"
domain = "payroll"
store_dir = "keys"
argon2_memory_kib = 131072
argon2_iterations = 5
argon2_parallelism = 8
min_password_len = 10
verify_on_setup = false
recovery_secret_env = "PAYROLL_RECOVERY"
"#;
        fs::write(tmp.path().join(".compvault.toml"), config).unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.domain, "payroll");
        assert_eq!(settings.store_dir, "keys");
        assert_eq!(settings.argon2_memory_kib, 131_072);
        assert_eq!(settings.argon2_iterations, 5);
        assert_eq!(settings.argon2_parallelism, 8);
        assert_eq!(settings.min_password_len, 10);
        assert!(!settings.verify_on_setup);
        assert_eq!(settings.recovery_secret_env, "PAYROLL_RECOVERY");
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".compvault.toml"), "domain = \"bonus\"\n").unwrap();

        let settings = Settings::load(tmp.path()).unwrap();
        assert_eq!(settings.domain, "bonus");
        assert_eq!(settings.store_dir, ".compvault");
        assert_eq!(settings.argon2_iterations, 3);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join(".compvault.toml"), "not valid {{toml").unwrap();

        let result = Settings::load(tmp.path());
        assert!(matches!(result, Err(CompVaultError::Configuration(_))));
    }

    #[test]
    fn unreadable_config_is_a_configuration_error() {
        let tmp = TempDir::new().unwrap();
        fs::create_dir(tmp.path().join(".compvault.toml")).unwrap();

        let err = Settings::load(tmp.path()).unwrap_err();
        assert!(matches!(err, CompVaultError::Configuration(_)));
        assert!(!err.is_retryable());
    }

    #[test]
    fn store_path_respects_custom_dir() {
        let s = Settings {
            store_dir: "keys".to_string(),
            ..Settings::default()
        };
        assert_eq!(
            s.store_path(Path::new("/srv/app")),
            PathBuf::from("/srv/app/keys")
        );
    }

    #[test]
    fn missing_recovery_secret_is_a_configuration_error() {
        let s = Settings {
            recovery_secret_env: "COMPVAULT_TEST_SURELY_UNSET_VARIABLE".to_string(),
            ..Settings::default()
        };
        assert!(matches!(
            s.recovery_secret(),
            Err(CompVaultError::Configuration(_))
        ));
    }
}
