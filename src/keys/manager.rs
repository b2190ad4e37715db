//! The key manager: the in-memory registry of key records and their
//! lock/unlock lifecycle.
//!
//! A password is stretched to `2 × KEY_LEN` bytes. The first half wraps
//! the protected key, the second half is stored as the record's
//! signature. Unlocking re-derives the hash from the stored salt and
//! compares the second half in constant time before any decryption runs,
//! so a wrong password never reaches the cipher.
//!
//! Prompting is strictly sequential: each retry prompt is issued only
//! after the previous attempt has been verified.

use std::collections::HashMap;

use tracing::{debug, error, info, warn};
use zeroize::Zeroizing;

use crate::crypto::{CryptoProvider, KdfParams, IV_LEN, KEY_LEN, SALT_LEN};
use crate::errors::{KeyVaultError, Result};
use crate::vault::chunk::EncryptedDataChunk;
use crate::vault::format::{decode_b64, encode_b64};
use crate::vault::payload;

use super::reader::SecretReader;
use super::record::{KeyMaterial, KeyRecord, RECORD_VERSION};

/// Wrong passwords tolerated by `get_decrypted_key` before giving up.
/// The operator gets `MAX_RETRIES + 1` attempts in total.
pub const MAX_RETRIES: u32 = 5;

const CONFIRM_PROMPT: &str = "Confirm password";

/// Owns every loaded `KeyRecord` and drives the password prompts and
/// crypto needed to create, unlock, and re-password them.
///
/// The reader and crypto provider are injected; `cli` wires the terminal
/// reader and `SystemCrypto`, tests wire scripted ones.
pub struct KeyManager<R, C> {
    keys: HashMap<String, KeyRecord>,
    reader: R,
    crypto: C,
    kdf_params: KdfParams,
}

impl<R: SecretReader, C: CryptoProvider> KeyManager<R, C> {
    /// Create an empty manager using the `v1` KDF parameters.
    pub fn new(reader: R, crypto: C) -> Self {
        Self {
            keys: HashMap::new(),
            reader,
            crypto,
            kdf_params: KdfParams::v1(),
        }
    }

    /// Override the KDF parameters. Records created under one set of
    /// parameters can only be unlocked under the same set.
    pub fn with_kdf_params(mut self, kdf_params: KdfParams) -> Self {
        self.kdf_params = kdf_params;
        self
    }

    pub fn kdf_params(&self) -> &KdfParams {
        &self.kdf_params
    }

    pub fn reader(&self) -> &R {
        &self.reader
    }

    pub fn crypto(&self) -> &C {
        &self.crypto
    }

    // ------------------------------------------------------------------
    // Registry
    // ------------------------------------------------------------------

    /// Insert a fully formed record. Its id must not be loaded yet and its
    /// version must be one this crate can write back.
    pub fn add_key(&mut self, record: KeyRecord) -> Result<()> {
        if record.version != RECORD_VERSION {
            return Err(KeyVaultError::MalformedHeader(format!(
                "key '{}' has unsupported version '{}', expected '{RECORD_VERSION}'",
                record.id, record.version
            )));
        }
        if self.keys.contains_key(&record.id) {
            return Err(KeyVaultError::DuplicateKey(record.id));
        }
        debug!(id = %record.id, unlocked = record.is_unlocked(), "key loaded");
        self.keys.insert(record.id.clone(), record);
        Ok(())
    }

    /// The live record for `id`. It is the same record later operations
    /// mutate, not a snapshot.
    pub fn get_key(&self, id: &str) -> Result<&KeyRecord> {
        self.keys
            .get(id)
            .ok_or_else(|| KeyVaultError::UnknownKey(id.to_string()))
    }

    fn get_key_mut(&mut self, id: &str) -> Result<&mut KeyRecord> {
        self.keys
            .get_mut(id)
            .ok_or_else(|| KeyVaultError::UnknownKey(id.to_string()))
    }

    pub fn contains_key(&self, id: &str) -> bool {
        self.keys.contains_key(id)
    }

    /// Loaded ids, sorted.
    pub fn key_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.keys.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Zero and drop the plaintext key of `id`. Locking a locked key is a no-op.
    pub fn lock_key(&mut self, id: &str) -> Result<()> {
        if self.get_key_mut(id)?.lock() {
            debug!(id = %id, "erased decrypted key");
        }
        Ok(())
    }

    pub fn lock_all_keys(&mut self) {
        for (id, record) in &mut self.keys {
            if record.lock() {
                debug!(id = %id, "erased decrypted key");
            }
        }
    }

    /// Lock and forget `id`. Unknown ids are ignored.
    pub fn remove_key(&mut self, id: &str) {
        if let Some(mut record) = self.keys.remove(id) {
            record.lock();
            debug!(id = %id, "key removed");
        }
    }

    /// Lock and forget every key.
    pub fn reset(&mut self) {
        self.lock_all_keys();
        self.keys.clear();
        debug!("key registry reset");
    }

    // ------------------------------------------------------------------
    // Lifecycle
    // ------------------------------------------------------------------

    /// Generate a fresh random key under `id` and wrap it with a password
    /// the operator enters (and confirms). The new key is left unlocked.
    pub fn create_new_key(&mut self, id: &str) -> Result<&KeyRecord> {
        if self.keys.contains_key(id) {
            return Err(KeyVaultError::DuplicateKey(id.to_string()));
        }

        let key = KeyMaterial::new(Zeroizing::new(self.crypto.random_bytes(KEY_LEN)?));
        let record = self.wrap_key(id, &key)?;
        info!(id = %id, "created new key");

        Ok(self.keys.entry(id.to_string()).or_insert(record))
    }

    /// Re-wrap the key under a new password. The protected key bytes do
    /// not change; salt, IV, encrypted key, and signature all do.
    pub fn change_key_password(&mut self, id: &str) -> Result<()> {
        let key = self.get_decrypted_key(id)?;
        let rewrapped = self.wrap_key(id, &key)?;
        *self.get_key_mut(id)? = rewrapped;
        info!(id = %id, "key password changed");
        Ok(())
    }

    /// Plaintext key for `id`, prompting for the password if it is locked.
    pub fn get_decrypted_key(&mut self, id: &str) -> Result<KeyMaterial> {
        self.get_decrypted_key_with_retries(id, MAX_RETRIES)
    }

    /// Like `get_decrypted_key`, tolerating `retries` wrong passwords
    /// (so at most `retries + 1` prompts) before failing with
    /// `PasswordVerificationExhausted`.
    pub fn get_decrypted_key_with_retries(
        &mut self,
        id: &str,
        retries: u32,
    ) -> Result<KeyMaterial> {
        let record = self.get_key(id)?;
        if let Some(key) = record.decrypted_key() {
            return Ok(key.clone());
        }

        let salt = decode_b64("salt", &record.salt)?;
        let iv = decode_b64("iv", &record.iv)?;
        let signature = decode_b64("signature", &record.signature)?;
        let encrypted_key = decode_b64("encrypted key", &record.encrypted_key)?;

        let prompt = format!("Enter password to decrypt key {id}");
        let attempts = retries.saturating_add(1);

        for attempt in 1..=attempts {
            let password = self.reader.read_secret(&prompt, false)?;
            let hash = self.derive_hash(&password, &salt)?;
            let (wrap_key, candidate) = hash.split_at(KEY_LEN);

            if !self.crypto.constant_time_eq(candidate, &signature) {
                warn!(id = %id, attempt, "incorrect password");
                continue;
            }

            let plaintext = self.crypto.decrypt(wrap_key, &iv, &encrypted_key)?;
            drop(hash);

            let key = KeyMaterial::new(plaintext);
            self.get_key_mut(id)?.decrypted_key = Some(key.clone());
            info!(id = %id, attempt, "key unlocked");
            return Ok(key);
        }

        error!(id = %id, attempts, "maximum password attempts exceeded");
        Err(KeyVaultError::PasswordVerificationExhausted {
            id: id.to_string(),
            attempts,
        })
    }

    // ------------------------------------------------------------------
    // Payload
    // ------------------------------------------------------------------

    /// Encrypt `plaintext` under the key `id` protects, unlocking it first
    /// if needed.
    pub fn encrypt_payload(
        &mut self,
        id: &str,
        plaintext: &[u8],
        chunk_size: usize,
        line_width: usize,
    ) -> Result<Vec<EncryptedDataChunk>> {
        let key = self.get_decrypted_key(id)?;
        let chunks = payload::seal(&self.crypto, &key.expose(), plaintext, chunk_size, line_width)?;
        debug!(id = %id, chunks = chunks.len(), "payload sealed");
        Ok(chunks)
    }

    /// Decrypt body chunks in order under the key `id` protects.
    pub fn decrypt_payload(
        &mut self,
        id: &str,
        chunks: &[EncryptedDataChunk],
    ) -> Result<Zeroizing<Vec<u8>>> {
        let key = self.get_decrypted_key(id)?;
        payload::open(&self.crypto, &key.expose(), chunks)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    /// Prompt for a new password, salt and derive, and encrypt `key`.
    fn wrap_key(&mut self, id: &str, key: &KeyMaterial) -> Result<KeyRecord> {
        let password = self.prompt_new_password(id)?;

        let iv = self.crypto.random_bytes(IV_LEN)?;
        let salt = self.crypto.random_bytes(SALT_LEN)?;
        let hash = self.derive_hash(&password, &salt)?;
        let (wrap_key, signature) = hash.split_at(KEY_LEN);

        let encrypted_key = self.crypto.encrypt(wrap_key, &iv, &key.expose())?;
        let record = KeyRecord::new(
            id,
            encode_b64(&encrypted_key),
            encode_b64(&iv),
            encode_b64(&salt),
            encode_b64(signature),
        )
        .with_decrypted_key(key.clone());
        drop(hash);

        Ok(record)
    }

    /// Ask for a password and its confirmation until the two agree.
    fn prompt_new_password(&mut self, id: &str) -> Result<Zeroizing<String>> {
        let prompt = format!("Enter password to encrypt key {id}");
        loop {
            let password = self.reader.read_secret(&prompt, false)?;
            let confirmation = self.reader.read_secret(CONFIRM_PROMPT, false)?;
            if self
                .crypto
                .constant_time_eq(password.as_bytes(), confirmation.as_bytes())
            {
                return Ok(password);
            }
            warn!(id = %id, "passwords do not match");
        }
    }

    fn derive_hash(&self, password: &str, salt: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        let hash =
            self.crypto
                .derive_bytes(password.as_bytes(), salt, &self.kdf_params, 2 * KEY_LEN)?;
        if hash.len() != 2 * KEY_LEN {
            return Err(KeyVaultError::KeyDerivationFailed(format!(
                "expected {} bytes, got {}",
                2 * KEY_LEN,
                hash.len()
            )));
        }
        Ok(hash)
    }
}

impl<R, C> Drop for KeyManager<R, C> {
    fn drop(&mut self) {
        for record in self.keys.values_mut() {
            record.lock();
        }
    }
}
