//! Keys module: protected key records and their lifecycle.
//!
//! This module provides:
//! - `KeyRecord` and the shared plaintext handle `KeyMaterial` (`record`)
//! - The `SecretReader` prompt seam and its terminal implementation (`reader`)
//! - `KeyManager`, the registry that creates, unlocks, and locks keys (`manager`)

pub mod manager;
pub mod reader;
pub mod record;

pub use manager::{KeyManager, MAX_RETRIES};
pub use reader::{SecretReader, TerminalReader, PASSWORD_ENV_VAR};
pub use record::{KeyMaterial, KeyRecord, RECORD_VERSION};
