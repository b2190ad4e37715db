use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::errors::{KeyVaultError, Result};

/// Project-level configuration, loaded from `.keyvault.toml`.
///
/// Every field has a sensible default so keyvault works out-of-the-box
/// without any config file at all. KDF costs are deliberately absent:
/// the `v1` header does not record them, so they cannot vary per project.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Settings {
    /// Plaintext bytes sealed into each body chunk.
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,

    /// Base64 characters per body data line.
    #[serde(default = "default_line_width")]
    pub line_width: usize,

    /// Log filter used when `KEYVAULT_LOG` is not set.
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_chunk_size() -> usize {
    4096
}

fn default_line_width() -> usize {
    64
}

fn default_log_level() -> String {
    "warn".to_string()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            line_width: default_line_width(),
            log_level: default_log_level(),
        }
    }
}

impl Settings {
    /// Name of the config file we look for in the config directory.
    pub const FILE_NAME: &'static str = ".keyvault.toml";

    /// Load settings from `<config_dir>/.keyvault.toml`.
    ///
    /// If the file does not exist, defaults are returned. If it exists
    /// but cannot be parsed or holds invalid values, an error is returned.
    pub fn load(config_dir: &Path) -> Result<Self> {
        let config_path = config_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            KeyVaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        settings.validate()?;
        Ok(settings)
    }

    fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(KeyVaultError::ConfigError(
                "chunk_size must be at least 1".into(),
            ));
        }
        if self.line_width == 0 {
            return Err(KeyVaultError::ConfigError(
                "line_width must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────
