//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::{Parser, ValueEnum};
use zeroize::Zeroizing;

use crate::access::{FieldValue, PasswordPolicy};
use crate::audit::AuditSink;
use crate::config::Settings;
use crate::errors::{CompVaultError, Result};
use crate::record::FileKeyRecordStore;

/// Environment variable consulted before prompting for a password.
pub const PASSWORD_ENV: &str = "COMPVAULT_PASSWORD";

/// CompVault CLI: master key custody for protected compensation fields.
#[derive(Parser)]
#[command(
    name = "compvault",
    about = "Password- and recovery-wrapped master key custody",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Protection domain (overrides `domain` in .compvault.toml)
    #[arg(short, long, global = true)]
    pub domain: Option<String>,

    /// Key record directory (overrides `store_dir` in .compvault.toml)
    #[arg(long, global = true)]
    pub store_dir: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Report whether the domain has been set up
    Status,

    /// Generate the master key and store both wrapped copies
    Setup {
        /// Replace an existing key record (existing protected values become unreadable)
        #[arg(long)]
        force: bool,
    },

    /// Set a new password using the server recovery secret
    Recover,

    /// Check that a password unlocks the master key
    Unlock,

    /// Encrypt a field value
    Protect {
        /// The plaintext value
        value: String,
        /// How to interpret the value
        #[arg(short, long, value_enum, default_value = "text")]
        kind: FieldKind,
    },

    /// Decrypt a protected field value
    Reveal {
        /// A `cvf1:` protected value
        ciphertext: String,
    },

    /// View the audit log of key operations
    Audit {
        /// Number of entries to show (default: 50)
        #[arg(long, default_value = "50")]
        last: usize,
    },
}

/// Value type accepted by `protect --kind`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FieldKind {
    Integer,
    Decimal,
    Text,
    Bool,
}

impl FieldKind {
    /// Parse `raw` as a field value of this kind.
    pub fn parse(self, raw: &str) -> Result<FieldValue> {
        match self {
            Self::Integer => raw.trim().parse::<i64>().map(FieldValue::Integer).map_err(|_| {
                CompVaultError::InvalidFieldFormat(format!("'{raw}' is not an integer"))
            }),
            Self::Decimal => FieldValue::decimal(raw.trim()),
            Self::Text => Ok(FieldValue::Text(raw.to_string())),
            Self::Bool => match raw.trim() {
                "true" => Ok(FieldValue::Bool(true)),
                "false" => Ok(FieldValue::Bool(false)),
                _ => Err(CompVaultError::InvalidFieldFormat(format!(
                    "'{raw}' is not true or false"
                ))),
            },
        }
    }
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Settings plus the resolved key record directory for this invocation.
pub struct Context {
    pub settings: Settings,
    pub store_dir: PathBuf,
}

impl Context {
    /// Load `.compvault.toml` from the working directory and apply the
    /// `--domain` / `--store-dir` overrides.
    pub fn load(cli: &Cli) -> Result<Self> {
        let cwd = std::env::current_dir()?;
        let mut settings = Settings::load(&cwd)?;

        if let Some(domain) = &cli.domain {
            settings.domain = domain.clone();
        }
        if let Some(dir) = &cli.store_dir {
            settings.store_dir = dir.clone();
        }

        let store_dir = settings.store_path(&cwd);
        Ok(Self {
            settings,
            store_dir,
        })
    }

    /// The privileged file store for the configured domain.
    pub fn store(&self) -> Result<FileKeyRecordStore> {
        FileKeyRecordStore::privileged(&self.store_dir, &self.settings.domain)
    }

    /// The audit sink, if audit logging is compiled in and available.
    pub fn audit(&self) -> Option<Box<dyn AuditSink>> {
        #[cfg(feature = "audit-log")]
        {
            crate::audit::AuditLog::open(&self.store_dir)
                .map(|log| Box::new(log) as Box<dyn AuditSink>)
        }
        #[cfg(not(feature = "audit-log"))]
        {
            None
        }
    }
}

/// Get the current password, trying in order:
/// 1. `COMPVAULT_PASSWORD` env var (scripts, CI)
/// 2. Interactive prompt
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on drop.
pub fn prompt_password() -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    let pw = dialoguer::Password::new()
        .with_prompt("Enter password")
        .interact()
        .map_err(|e| CompVaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation (setup and recovery).
///
/// Also respects `COMPVAULT_PASSWORD`.  An env-supplied password is passed
/// through unchecked so the policy error comes from the service itself;
/// interactive input is re-prompted until it satisfies `policy`.
pub fn prompt_new_password(policy: PasswordPolicy) -> Result<Zeroizing<String>> {
    if let Some(pw) = password_from_env() {
        return Ok(pw);
    }

    loop {
        let password = Zeroizing::new(
            dialoguer::Password::new()
                .with_prompt("Choose new password")
                .with_confirmation("Confirm new password", "Passwords do not match, try again")
                .interact()
                .map_err(|e| CompVaultError::CommandFailed(format!("password prompt: {e}")))?,
        );

        if let Err(e) = policy.check(&password) {
            output::warning(&format!("{e}. Try again."));
            continue;
        }

        return Ok(password);
    }
}

fn password_from_env() -> Option<Zeroizing<String>> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .filter(|pw| !pw.is_empty())
        .map(Zeroizing::new)
}
