//! Vault module: the on-disk container for one key record and its payload.
//!
//! This module provides:
//! - `EncryptedDataChunk`, one IV-prefixed block of body ciphertext (`chunk`)
//! - The line-oriented text codec and atomic file I/O (`format`)
//! - Splitting a payload into encrypted chunks and back (`payload`)

pub mod chunk;
pub mod format;
pub mod payload;

// Re-export the most commonly used items.
pub use chunk::EncryptedDataChunk;
pub use format::{parse, read_vault, serialize, to_text, write_vault, VaultFile};
