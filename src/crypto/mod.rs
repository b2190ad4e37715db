//! Cryptographic primitives for keyvault.
//!
//! This module provides:
//! - Argon2id password hashing with variable output length (`kdf`)
//! - AES-256-GCM encryption with an explicit IV (`encryption`)
//! - The `CryptoProvider` seam the key manager is built against (`provider`)

pub mod encryption;
pub mod kdf;
pub mod provider;

pub use encryption::{decrypt, encrypt, IV_LEN, KEY_LEN};
pub use kdf::{derive_bytes, KdfParams, SALT_LEN};
pub use provider::{CryptoProvider, SystemCrypto};
