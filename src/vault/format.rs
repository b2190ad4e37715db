//! The line-oriented vault text format.
//!
//! A vault file looks like this:
//!
//! ```text
//! V:v1
//! ID:<key id>
//! K:<encrypted key, base64>
//! IV:<key-wrapping IV, base64>
//! SG:<password verifier, base64>
//! S:<KDF salt, base64>
//!
//! <chunk IV>
//! <data line>
//! <data line>
//!
//! <chunk IV>
//! <data line>
//!
//! ```
//!
//! - The header is exactly six `KEY:VALUE` lines, split on the first `:`.
//! - An empty line ends the header and each body chunk.
//! - Lines whose first non-whitespace character is `#` are comments. They
//!   are skipped anywhere in the file and never written back.
//!
//! `serialize` followed by `parse` reproduces the header and chunks
//! exactly (comments aside).

use std::fs;
use std::io::Write;
use std::path::Path;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use tracing::debug;

use super::chunk::EncryptedDataChunk;
use crate::errors::{KeyVaultError, Result};
use crate::keys::record::{KeyRecord, RECORD_VERSION};

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Number of lines in a v1 header.
const HEADER_LINES: usize = 6;

const KEY_VERSION: &str = "V";
const KEY_ID: &str = "ID";
const KEY_ENCRYPTED_KEY: &str = "K";
const KEY_IV: &str = "IV";
const KEY_SIGNATURE: &str = "SG";
const KEY_SALT: &str = "S";

/// Header keys in the order they are written.
const HEADER_KEYS: [&str; HEADER_LINES] = [
    KEY_VERSION,
    KEY_ID,
    KEY_ENCRYPTED_KEY,
    KEY_IV,
    KEY_SIGNATURE,
    KEY_SALT,
];

// ---------------------------------------------------------------------------
// VaultFile
// ---------------------------------------------------------------------------

/// A parsed vault: the key record from the header plus the body chunks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VaultFile {
    pub header: KeyRecord,
    pub body: Vec<EncryptedDataChunk>,
}

impl VaultFile {
    pub fn new(header: KeyRecord, body: Vec<EncryptedDataChunk>) -> Self {
        Self { header, body }
    }

    /// The file as lines, see [`serialize`].
    pub fn to_lines(&self) -> Vec<String> {
        serialize(&self.header, &self.body)
    }

    /// The file as text, see [`to_text`].
    pub fn to_text(&self) -> String {
        to_text(&self.header, &self.body)
    }
}

// ---------------------------------------------------------------------------
// Parsing
// ---------------------------------------------------------------------------

/// Parse a whole vault file.
pub fn parse(text: &str) -> Result<VaultFile> {
    let lines: Vec<&str> = text.lines().collect();
    parse_lines(&lines)
}

/// Parse a vault file given as lines (without line terminators).
pub fn parse_lines<S: AsRef<str>>(lines: &[S]) -> Result<VaultFile> {
    let mut sections = split_sections(lines).into_iter();

    let header_lines = sections
        .next()
        .ok_or_else(|| KeyVaultError::MalformedHeader("file is empty".into()))?;
    let header = parse_header(&header_lines)?;

    let body_sections: Vec<Vec<&str>> = sections.collect();
    let body = parse_body(&body_sections);

    Ok(VaultFile { header, body })
}

/// Group lines into sections separated by empty lines, dropping comments.
///
/// Only a truly empty line separates; a whitespace-only line is content.
/// Consecutive empty lines (and empty lines at the start) do not produce
/// empty sections. A final section without a trailing empty line is kept.
pub fn split_sections<S: AsRef<str>>(lines: &[S]) -> Vec<Vec<&str>> {
    let mut sections = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in lines {
        let line = line.as_ref();
        if is_comment(line) {
            continue;
        }
        if line.is_empty() {
            if !current.is_empty() {
                sections.push(std::mem::take(&mut current));
            }
            continue;
        }
        current.push(line);
    }

    if !current.is_empty() {
        sections.push(current);
    }

    sections
}

/// Parse the six header lines into a locked `KeyRecord`.
pub fn parse_header<S: AsRef<str>>(lines: &[S]) -> Result<KeyRecord> {
    if lines.len() != HEADER_LINES {
        return Err(KeyVaultError::MalformedHeader(format!(
            "expected {HEADER_LINES} lines, found {}",
            lines.len()
        )));
    }

    let mut values: [Option<&str>; HEADER_LINES] = [None; HEADER_LINES];

    for line in lines {
        let line = line.as_ref();
        let (key, value) = line.split_once(':').ok_or_else(|| {
            KeyVaultError::MalformedHeader(format!("line '{line}' has no ':' separator"))
        })?;
        if key.is_empty() || value.is_empty() {
            return Err(KeyVaultError::MalformedHeader(format!(
                "line '{line}' has an empty key or value"
            )));
        }

        let slot = HEADER_KEYS
            .iter()
            .position(|known| *known == key)
            .ok_or_else(|| KeyVaultError::MalformedHeader(format!("unknown key '{key}'")))?;
        if values[slot].replace(value).is_some() {
            return Err(KeyVaultError::MalformedHeader(format!(
                "duplicate key '{key}'"
            )));
        }
    }

    // Six lines, six distinct known keys: every slot is filled.
    let [version, id, encrypted_key, iv, signature, salt] = values.map(Option::unwrap_or_default);

    if version != RECORD_VERSION {
        return Err(KeyVaultError::MalformedHeader(format!(
            "unsupported version '{version}', expected '{RECORD_VERSION}'"
        )));
    }

    Ok(KeyRecord::new(id, encrypted_key, iv, salt, signature))
}

/// Turn body sections into chunks: first line is the IV, the rest is data.
pub fn parse_body<S: AsRef<str>>(sections: &[Vec<S>]) -> Vec<EncryptedDataChunk> {
    sections
        .iter()
        .filter_map(|section| {
            let (iv, data) = section.split_first()?;
            Some(EncryptedDataChunk::new(
                iv.as_ref(),
                data.iter().map(|line| line.as_ref().to_string()).collect(),
            ))
        })
        .collect()
}

fn is_comment(line: &str) -> bool {
    line.trim_start().starts_with('#')
}

// ---------------------------------------------------------------------------
// Serialization
// ---------------------------------------------------------------------------

/// The six header lines in fixed key order.
pub fn serialize_header(header: &KeyRecord) -> Vec<String> {
    vec![
        format!("{KEY_VERSION}:{}", header.version),
        format!("{KEY_ID}:{}", header.id),
        format!("{KEY_ENCRYPTED_KEY}:{}", header.encrypted_key),
        format!("{KEY_IV}:{}", header.iv),
        format!("{KEY_SIGNATURE}:{}", header.signature),
        format!("{KEY_SALT}:{}", header.salt),
    ]
}

/// Each chunk as its IV line, its data lines, and a closing blank line.
pub fn serialize_body(body: &[EncryptedDataChunk]) -> Vec<String> {
    body.iter()
        .flat_map(|chunk| {
            std::iter::once(chunk.iv.clone())
                .chain(chunk.data.iter().cloned())
                .chain(std::iter::once(String::new()))
        })
        .collect()
}

/// Header, one blank line, then the body.
pub fn serialize(header: &KeyRecord, body: &[EncryptedDataChunk]) -> Vec<String> {
    let mut lines = serialize_header(header);
    lines.push(String::new());
    lines.extend(serialize_body(body));
    lines
}

/// `serialize` joined with `\n`, ending in a newline.
pub fn to_text(header: &KeyRecord, body: &[EncryptedDataChunk]) -> String {
    let mut text = serialize(header, body).join("\n");
    text.push('\n');
    text
}

// ---------------------------------------------------------------------------
// Files
// ---------------------------------------------------------------------------

/// Read and parse a vault file.
pub fn read_vault(path: &Path) -> Result<VaultFile> {
    if !path.exists() {
        return Err(KeyVaultError::VaultNotFound(path.to_path_buf()));
    }
    let text = fs::read_to_string(path)?;
    parse(&text)
}

/// Write a vault file to disk **atomically**.
///
/// The text goes to a temp file in the same directory, which is then
/// renamed over `path`, so readers never see a half-written vault.
pub fn write_vault(path: &Path, header: &KeyRecord, body: &[EncryptedDataChunk]) -> Result<()> {
    let text = to_text(header, body);

    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    // A temp file left by an interrupted write may carry looser permissions.
    if tmp_path.exists() {
        fs::remove_file(&tmp_path)?;
    }

    // Owner-only from the moment the file exists (no chmod window).
    #[cfg(unix)]
    let mut file = {
        use std::os::unix::fs::OpenOptionsExt;
        fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .mode(0o600)
            .open(&tmp_path)?
    };

    #[cfg(not(unix))]
    let mut file = fs::OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(&tmp_path)?;

    file.write_all(text.as_bytes())?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    debug!(path = %path.display(), id = %header.id, chunks = body.len(), "vault written");

    Ok(())
}

// ---------------------------------------------------------------------------
// Base64 helpers for header and chunk fields
// ---------------------------------------------------------------------------

pub(crate) fn encode_b64(data: &[u8]) -> String {
    BASE64.encode(data)
}

/// Decode a base64 field, naming it in the error.
pub(crate) fn decode_b64(field: &str, text: &str) -> Result<Vec<u8>> {
    BASE64
        .decode(text)
        .map_err(|e| KeyVaultError::InvalidEncoding(format!("{field}: {e}")))
}
