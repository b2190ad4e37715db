//! Body chunks of a vault file.

use serde::Serialize;

/// One independently decryptable unit of payload ciphertext.
///
/// On disk the chunk is its IV line followed by its data lines, and a
/// blank line ends it. `data` holds the base64 ciphertext split into lines;
/// concatenated in order they decode to one AES-GCM ciphertext.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EncryptedDataChunk {
    pub iv: String,
    pub data: Vec<String>,
}

impl EncryptedDataChunk {
    pub fn new(iv: impl Into<String>, data: Vec<String>) -> Self {
        Self {
            iv: iv.into(),
            data,
        }
    }

    /// The data lines joined back into one base64 string.
    pub fn joined_data(&self) -> String {
        self.data.concat()
    }
}
