use std::path::PathBuf;
use thiserror::Error;

/// All errors that can occur in keyvault.
#[derive(Debug, Error)]
pub enum KeyVaultError {
    // --- Registry errors ---
    #[error("Key '{0}' already exists")]
    DuplicateKey(String),

    #[error("Key '{0}' is not loaded")]
    UnknownKey(String),

    #[error("Incorrect password for key '{id}' after {attempts} attempts")]
    PasswordVerificationExhausted { id: String, attempts: u32 },

    // --- Codec errors ---
    #[error("Invalid v1 header: {0}")]
    MalformedHeader(String),

    #[error("Invalid encoding: {0}")]
    InvalidEncoding(String),

    // --- Crypto errors ---
    #[error("Key derivation failed: {0}")]
    KeyDerivationFailed(String),

    #[error("Encryption failed: {0}")]
    EncryptionFailed(String),

    #[error("Decryption failed: corrupted or tampered data")]
    DecryptionFailed,

    #[error("Random source failed: {0}")]
    RandomSourceFailed(String),

    // --- Input errors ---
    #[error("Prompt failed: {0}")]
    PromptFailed(String),

    // --- Vault file errors ---
    #[error("Vault not found at {0}")]
    VaultNotFound(PathBuf),

    #[error("Vault already exists at {0}")]
    VaultAlreadyExists(PathBuf),

    // --- Config errors ---
    #[error("Config file error: {0}")]
    ConfigError(String),

    // --- IO errors ---
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    // --- Serialization errors ---
    #[error("Serialization error: {0}")]
    SerializationError(String),

    // --- CLI errors ---
    #[error("Invalid key id: {0}")]
    InvalidKeyId(String),

    #[error("Command failed: {0}")]
    CommandFailed(String),
}

/// Convenience type alias for keyvault results.
pub type Result<T> = std::result::Result<T, KeyVaultError>;
