//! AES-256-GCM authenticated encryption with an explicit IV.
//!
//! The vault stores the IV in its own field (the header `IV:` line or the
//! first line of a body chunk), so unlike a nonce-prefixed blob the caller
//! supplies it on both sides.
//!
//! Ciphertext layout: `[ ciphertext | 16-byte auth tag ]`.

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};
use zeroize::Zeroizing;

use crate::errors::{KeyVaultError, Result};

/// Key length in bytes (AES-256).
pub const KEY_LEN: usize = 32;

/// IV (GCM nonce) length in bytes.
pub const IV_LEN: usize = 12;

/// Encrypt `plaintext` under a 32-byte `key` and 12-byte `iv`.
pub fn encrypt(key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    if iv.len() != IV_LEN {
        return Err(KeyVaultError::EncryptionFailed(format!(
            "IV must be {IV_LEN} bytes, got {}",
            iv.len()
        )));
    }

    let cipher = Aes256Gcm::new_from_slice(key)
        .map_err(|e| KeyVaultError::EncryptionFailed(format!("invalid key length: {e}")))?;

    cipher
        .encrypt(Nonce::from_slice(iv), plaintext)
        .map_err(|e| KeyVaultError::EncryptionFailed(format!("encryption error: {e}")))
}

/// Decrypt and authenticate data produced by `encrypt`.
pub fn decrypt(key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
    if iv.len() != IV_LEN {
        return Err(KeyVaultError::DecryptionFailed);
    }

    let cipher = Aes256Gcm::new_from_slice(key).map_err(|_| KeyVaultError::DecryptionFailed)?;

    let plaintext = cipher
        .decrypt(Nonce::from_slice(iv), ciphertext)
        .map_err(|_| KeyVaultError::DecryptionFailed)?;

    Ok(Zeroizing::new(plaintext))
}
