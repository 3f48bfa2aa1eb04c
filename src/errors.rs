use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in AgileVault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Vault format errors ---
    #[error("Corrupt vault: {0}")]
    CorruptVault(String),

    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    // --- Crypto errors ---
    #[error("Decryption failed — wrong password or corrupted data")]
    DecryptError,

    #[error("Encryption failed: {0}")]
    EncryptError(String),

    #[error("Vault is locked — unlock it first")]
    Locked,

    // --- Lookup errors ---
    #[error("'{0}' not found")]
    NotFound(String),

    #[error("Pattern '{0}' matches more than one item")]
    Ambiguous(String),

    // --- Concurrency errors ---
    #[error("Vault is locked for writing by another process (lockfile at {0})")]
    Conflict(PathBuf),

    // --- Agent errors ---
    #[error("Agent error: {0}")]
    Agent(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    Serialization(String),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    Config(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("User cancelled operation")]
    UserCancelled,

    #[error("Password mismatch — passwords do not match")]
    PasswordMismatch,
}

impl VaultError {
    /// Stable wire identifier for agent replies.
    pub fn kind(&self) -> &'static str {
        match self {
            VaultError::CorruptVault(_) => "CorruptVault",
            VaultError::VaultNotFound(_) => "VaultNotFound",
            VaultError::VaultAlreadyExists(_) => "VaultAlreadyExists",
            VaultError::DecryptError => "DecryptError",
            VaultError::EncryptError(_) => "EncryptError",
            VaultError::Locked => "Locked",
            VaultError::NotFound(_) => "NotFound",
            VaultError::Ambiguous(_) => "Ambiguous",
            VaultError::Conflict(_) => "Conflict",
            VaultError::Agent(_) => "Agent",
            VaultError::Io(_) => "IoError",
            VaultError::Serialization(_) => "Serialization",
            VaultError::Config(_) => "Config",
            VaultError::CommandFailed(_) => "CommandFailed",
            VaultError::UserCancelled => "UserCancelled",
            VaultError::PasswordMismatch => "PasswordMismatch",
        }
    }

    /// Rebuild an error from an agent reply's `{kind, msg}` pair.
    ///
    /// Kinds that carry structured data on this side (paths, patterns)
    /// collapse into their message form; the CLI only needs the text.
    pub fn from_wire(kind: &str, msg: &str) -> Self {
        match kind {
            "DecryptError" => VaultError::DecryptError,
            "Locked" => VaultError::Locked,
            "CorruptVault" => VaultError::CorruptVault(msg.to_string()),
            "NotFound" => VaultError::NotFound(msg.to_string()),
            _ => VaultError::Agent(format!("{kind}: {msg}")),
        }
    }
}

/// Convenience type alias for AgileVault results.
pub type Result<T> = std::result::Result<T, VaultError>;
