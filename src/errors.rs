use thiserror::Error;

/// All errors that can occur in CompVault.
#[derive(Debug, Error)]
pub enum CompVaultError {
    // --- Input policy ---
    #[error("Password must be at least {min} characters")]
    WeakPassword { min: usize },

    // --- Key record lifecycle ---
    #[error("Protection domain is not set up")]
    NotSetup,

    #[error("Protection domain is already set up")]
    AlreadySetup,

    #[error("Recovery copy of the master key is missing")]
    MissingRecoveryKey,

    // --- Cipher authentication ---
    #[error("Wrong password")]
    WrongPassword,

    #[error("Invalid key or corrupted data")]
    InvalidKeyOrCorrupt,

    #[error("Server recovery secret is invalid or the recovery copy is corrupted")]
    InvalidServerSecretOrCorrupted,

    // --- Custody contract ---
    #[error("Master key is not unlocked for this session")]
    NotUnlocked,

    // --- External collaborators ---
    #[error("Key record store error: {0}")]
    Store(String),

    #[error("Configuration error: {0}")]
    Configuration(String),

    // --- Crypto plumbing ---
    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Invalid protected field: {0}")]
    InvalidFieldFormat(String),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Audit error: {0}")]
    AuditError(String),
}

/// Coarse category of a [`CompVaultError`], used by the endpoint layer
/// and by callers deciding whether to retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Password or length policy violation. User-correctable.
    WeakInput,
    NotSetup,
    AlreadySetup,
    /// Wrong password, wrong key or corrupted ciphertext. These are
    /// deliberately not told apart.
    Authentication,
    /// The recovery copy is gone or cannot be opened with the server secret.
    DataIntegrity,
    /// The backing store failed. Transient.
    Store,
    /// Missing server secret or unreadable settings. Fatal.
    Configuration,
    /// A locked-state or other programming-contract violation.
    Contract,
    Internal,
}

impl CompVaultError {
    /// Map this error onto its taxonomy category.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::WeakPassword { .. } => ErrorKind::WeakInput,
            Self::NotSetup => ErrorKind::NotSetup,
            Self::AlreadySetup => ErrorKind::AlreadySetup,
            Self::WrongPassword | Self::InvalidKeyOrCorrupt | Self::InvalidFieldFormat(_) => {
                ErrorKind::Authentication
            }
            Self::MissingRecoveryKey | Self::InvalidServerSecretOrCorrupted => {
                ErrorKind::DataIntegrity
            }
            Self::Store(_) | Self::Io(_) => ErrorKind::Store,
            Self::Configuration(_) => ErrorKind::Configuration,
            Self::NotUnlocked => ErrorKind::Contract,
            Self::EncryptionFailed(_)
            | Self::KeyDerivationFailed(_)
            | Self::Serialization(_)
            | Self::CommandFailed(_)
            | Self::AuditError(_) => ErrorKind::Internal,
        }
    }

    /// Whether the caller may reasonably try the same operation again.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::WeakInput | ErrorKind::Authentication | ErrorKind::Store
        )
    }

    /// Message safe to hand to an external caller.
    ///
    /// Store, configuration and internal failures collapse to a generic
    /// text so paths, secrets and library detail never cross the boundary.
    pub fn public_message(&self) -> String {
        match self.kind() {
            ErrorKind::Store => "Key storage is temporarily unavailable".to_string(),
            ErrorKind::Configuration | ErrorKind::Internal => "Internal server error".to_string(),
            _ => self.to_string(),
        }
    }
}

/// Convenience type alias for CompVault results.
pub type Result<T> = std::result::Result<T, CompVaultError>;
