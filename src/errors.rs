use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in mfavault.
#[derive(Debug, Error)]
pub enum VaultError {
    // --- Codec errors ---
    #[error("Invalid password")]
    InvalidPassword,

    #[error("Vault data is too short or misaligned to be a vault")]
    InvalidBlob,

    #[error("Vault data is corrupted: {0}")]
    CorruptData(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Encryption key must be exactly 32 bytes, got {0}")]
    InvalidKey(usize),

    // --- Vault errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Client ID '{0}' not found")]
    ClientNotFound(String),

    #[error("Client ID '{0}' already exists in the vault (pass --overwrite to replace it)")]
    ClientAlreadyExists(String),

    #[error("Client ID cannot be empty")]
    InvalidClientId,

    // --- Agent channel errors ---
    #[error("Not a socket: {0}")]
    NotASocket(PathBuf),

    #[error("Cannot reach the vault agent at {path}: {source}")]
    ChannelUnreachable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to start the vault agent: {0}")]
    SpawnFailed(String),

    #[error("Vault agent did not come up at {0} in time")]
    ConnectTimeout(PathBuf),

    #[error("Agent protocol error: {0}")]
    Protocol(String),

    #[error("Agent error: {0}")]
    Remote(String),

    // --- TOTP errors ---
    #[error("Invalid TOTP secret: {0}")]
    InvalidTotpSecret(String),

    #[error("Clipboard error: {0}")]
    Clipboard(String),

    // --- Config errors ---
    #[error("Config error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Command failed: {0}")]
    CommandFailed(String),

    #[error("Cancelled")]
    Cancelled,
}

impl VaultError {
    /// True for errors that the password flow recovers from by re-prompting.
    pub fn is_invalid_password(&self) -> bool {
        matches!(self, VaultError::InvalidPassword)
    }
}

/// Convenience type alias for mfavault results.
pub type Result<T> = std::result::Result<T, VaultError>;
