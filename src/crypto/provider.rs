//! The cryptographic capability handed to the key manager.
//!
//! `KeyManager` never calls Argon2, AES-GCM, or the OS RNG directly; it
//! goes through a `CryptoProvider` so the primitives can be swapped or
//! instrumented (tests wrap `SystemCrypto` to count derivations).

use rand::TryRngCore;
use subtle::ConstantTimeEq;
use zeroize::Zeroizing;

use super::encryption;
use super::kdf::{self, KdfParams};
use crate::errors::{KeyVaultError, Result};

/// Primitive operations the key lifecycle is built from.
pub trait CryptoProvider {
    /// Password-based derivation of `output_len` bytes.
    fn derive_bytes(
        &self,
        password: &[u8],
        salt: &[u8],
        params: &KdfParams,
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>>;

    /// Encrypt `plaintext` under `key` and `iv`.
    fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>>;

    /// Decrypt and authenticate `ciphertext` under `key` and `iv`.
    fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>>;

    /// `len` bytes from a cryptographically secure source.
    fn random_bytes(&self, len: usize) -> Result<Vec<u8>>;

    /// Equality whose running time does not depend on where `a` and `b` differ.
    fn constant_time_eq(&self, a: &[u8], b: &[u8]) -> bool;
}

/// Argon2id + AES-256-GCM + OS randomness + `subtle`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemCrypto;

impl CryptoProvider for SystemCrypto {
    fn derive_bytes(
        &self,
        password: &[u8],
        salt: &[u8],
        params: &KdfParams,
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        kdf::derive_bytes(password, salt, params, output_len)
    }

    fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        encryption::encrypt(key, iv, plaintext)
    }

    fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        encryption::decrypt(key, iv, ciphertext)
    }

    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        let mut bytes = vec![0u8; len];
        rand::rngs::OsRng
            .try_fill_bytes(&mut bytes)
            .map_err(|e| KeyVaultError::RandomSourceFailed(e.to_string()))?;
        Ok(bytes)
    }

    fn constant_time_eq(&self, a: &[u8], b: &[u8]) -> bool {
        // `ct_eq` on slices of different length is false without looking at contents.
        a.ct_eq(b).into()
    }
}
