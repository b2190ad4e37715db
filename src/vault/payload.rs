//! Payload encryption under a protected key.
//!
//! Plaintext is cut into `chunk_size` pieces. Each piece is encrypted with
//! its own random IV and becomes one body chunk, with the base64
//! ciphertext wrapped to `line_width` characters per data line.

use zeroize::Zeroizing;

use super::chunk::EncryptedDataChunk;
use super::format::{decode_b64, encode_b64};
use crate::crypto::{CryptoProvider, IV_LEN};
use crate::errors::{KeyVaultError, Result};

/// Encrypt `plaintext` into body chunks.
///
/// Empty plaintext yields no chunks.
pub fn seal<C: CryptoProvider + ?Sized>(
    crypto: &C,
    key: &[u8],
    plaintext: &[u8],
    chunk_size: usize,
    line_width: usize,
) -> Result<Vec<EncryptedDataChunk>> {
    if chunk_size == 0 || line_width == 0 {
        return Err(KeyVaultError::EncryptionFailed(
            "chunk size and line width must be positive".into(),
        ));
    }

    plaintext
        .chunks(chunk_size)
        .map(|piece| -> Result<EncryptedDataChunk> {
            let iv = crypto.random_bytes(IV_LEN)?;
            let ciphertext = crypto.encrypt(key, &iv, piece)?;
            Ok(EncryptedDataChunk::new(
                encode_b64(&iv),
                wrap_lines(&encode_b64(&ciphertext), line_width),
            ))
        })
        .collect()
}

/// Decrypt chunks in order and concatenate the plaintext.
pub fn open<C: CryptoProvider + ?Sized>(
    crypto: &C,
    key: &[u8],
    chunks: &[EncryptedDataChunk],
) -> Result<Zeroizing<Vec<u8>>> {
    let mut plaintext = Zeroizing::new(Vec::new());

    for (index, chunk) in chunks.iter().enumerate() {
        let iv = decode_b64(&format!("chunk {index} iv"), &chunk.iv)?;
        let ciphertext = decode_b64(&format!("chunk {index} data"), &chunk.joined_data())?;
        let piece = crypto.decrypt(key, &iv, &ciphertext)?;
        plaintext.extend_from_slice(&piece);
    }

    Ok(plaintext)
}

/// Split ASCII `text` into lines of at most `width` characters.
fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    text.as_bytes()
        .chunks(width)
        .map(|line| String::from_utf8_lossy(line).into_owned())
        .collect()
}
