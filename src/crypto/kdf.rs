//! Password-based key derivation using Argon2id.
//!
//! The key manager asks for `2 × KEY_LEN` bytes per password: the first
//! half becomes the wrapping key, the second half the password verifier
//! ("signature") stored in the vault header.

use argon2::{Algorithm, Argon2, Params, Version};
use zeroize::Zeroizing;

use crate::errors::{KeyVaultError, Result};

/// Length of the per-key salt in bytes.
pub const SALT_LEN: usize = 16;

/// Argon2id cost parameters.
///
/// A `v1` header does not record these, so every vault written with
/// `KdfParams::v1()` must be opened with the same values.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KdfParams {
    /// Memory cost in KiB.
    pub memory_kib: u32,
    /// Number of passes (the fixed iteration count).
    pub iterations: u32,
    /// Parallelism lanes.
    pub parallelism: u32,
}

impl KdfParams {
    /// Parameters pinned by the `v1` vault format (19 MiB, 2 passes, 1 lane).
    pub const fn v1() -> Self {
        Self {
            memory_kib: 19_456,
            iterations: 2,
            parallelism: 1,
        }
    }
}

impl Default for KdfParams {
    fn default() -> Self {
        Self::v1()
    }
}

/// Derive `output_len` bytes from a password and salt.
///
/// The same password + salt + params + length always produce the same
/// bytes. The buffer is zeroed when the returned value is dropped.
pub fn derive_bytes(
    password: &[u8],
    salt: &[u8],
    kdf_params: &KdfParams,
    output_len: usize,
) -> Result<Zeroizing<Vec<u8>>> {
    if kdf_params.iterations < 1 {
        return Err(KeyVaultError::KeyDerivationFailed(
            "Argon2 iterations must be at least 1".into(),
        ));
    }
    if kdf_params.parallelism < 1 {
        return Err(KeyVaultError::KeyDerivationFailed(
            "Argon2 parallelism must be at least 1".into(),
        ));
    }

    let params = Params::new(
        kdf_params.memory_kib,
        kdf_params.iterations,
        kdf_params.parallelism,
        Some(output_len),
    )
    .map_err(|e| KeyVaultError::KeyDerivationFailed(format!("invalid Argon2 params: {e}")))?;

    let argon2 = Argon2::new(Algorithm::Argon2id, Version::V0x13, params);

    let mut output = Zeroizing::new(vec![0u8; output_len]);
    argon2
        .hash_password_into(password, salt, output.as_mut_slice())
        .map_err(|e| KeyVaultError::KeyDerivationFailed(format!("Argon2id hashing failed: {e}")))?;

    Ok(output)
}
