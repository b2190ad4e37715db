//! `KeyRecord` and the shared plaintext buffer it carries while unlocked.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use serde::Serialize;
use subtle::ConstantTimeEq;
use zeroize::{Zeroize, Zeroizing};

/// The only record format version this crate reads or writes.
pub const RECORD_VERSION: &str = "v1";

/// Plaintext key bytes held while a record is unlocked.
///
/// Clones share one buffer. When the manager locks, removes, or resets a
/// key it zero-fills that buffer in place, so every handle a caller kept
/// observes the erasure. The buffer is also zeroed when the last handle
/// is dropped.
#[derive(Clone)]
pub struct KeyMaterial {
    bytes: Arc<Mutex<Zeroizing<Vec<u8>>>>,
}

impl KeyMaterial {
    pub fn new(bytes: Zeroizing<Vec<u8>>) -> Self {
        Self {
            bytes: Arc::new(Mutex::new(bytes)),
        }
    }

    /// Copy the key bytes out into a buffer that zeroes itself on drop.
    pub fn expose(&self) -> Zeroizing<Vec<u8>> {
        Zeroizing::new(self.guard().to_vec())
    }

    pub fn len(&self) -> usize {
        self.guard().len()
    }

    pub fn is_empty(&self) -> bool {
        self.guard().is_empty()
    }

    /// True once every byte is zero (the state `erase` leaves behind).
    pub fn is_erased(&self) -> bool {
        self.guard().iter().all(|b| *b == 0)
    }

    /// Overwrite every byte with zero, keeping the length.
    pub(crate) fn erase(&self) {
        self.guard().as_mut_slice().zeroize();
    }

    fn guard(&self) -> MutexGuard<'_, Zeroizing<Vec<u8>>> {
        self.bytes.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl From<Vec<u8>> for KeyMaterial {
    fn from(bytes: Vec<u8>) -> Self {
        Self::new(Zeroizing::new(bytes))
    }
}

impl PartialEq for KeyMaterial {
    fn eq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.bytes, &other.bytes) {
            return true;
        }
        let a = self.expose();
        let b = other.expose();
        a.as_slice().ct_eq(b.as_slice()).into()
    }
}

impl Eq for KeyMaterial {}

impl fmt::Debug for KeyMaterial {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KeyMaterial")
            .field("len", &self.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}

/// One protected key: its persisted envelope plus, while unlocked, the
/// plaintext key.
///
/// `encrypted_key`, `iv`, `salt`, and `signature` are base64 text exactly
/// as they appear in the vault header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct KeyRecord {
    pub version: String,
    pub id: String,
    pub encrypted_key: String,
    pub iv: String,
    pub salt: String,
    pub signature: String,
    #[serde(skip)]
    pub(crate) decrypted_key: Option<KeyMaterial>,
}

impl KeyRecord {
    /// Build a locked record from its persisted fields.
    pub fn new(
        id: impl Into<String>,
        encrypted_key: impl Into<String>,
        iv: impl Into<String>,
        salt: impl Into<String>,
        signature: impl Into<String>,
    ) -> Self {
        Self {
            version: RECORD_VERSION.to_string(),
            id: id.into(),
            encrypted_key: encrypted_key.into(),
            iv: iv.into(),
            salt: salt.into(),
            signature: signature.into(),
            decrypted_key: None,
        }
    }

    /// Attach plaintext key material, marking the record unlocked.
    pub fn with_decrypted_key(mut self, key: KeyMaterial) -> Self {
        self.decrypted_key = Some(key);
        self
    }

    pub fn decrypted_key(&self) -> Option<&KeyMaterial> {
        self.decrypted_key.as_ref()
    }

    pub fn is_unlocked(&self) -> bool {
        self.decrypted_key.is_some()
    }

    /// Erase and detach the plaintext key. Returns whether anything was erased.
    pub(crate) fn lock(&mut self) -> bool {
        match self.decrypted_key.take() {
            Some(key) => {
                key.erase();
                true
            }
            None => false,
        }
    }
}
