//! CLI module — Clap argument parser, output helpers, and command implementations.
//!
//! This is also where the key manager's collaborators are chosen: the
//! terminal reader and the system crypto provider.

pub mod commands;
pub mod output;

use std::path::{Path, PathBuf};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use crate::config::Settings;
use crate::crypto::SystemCrypto;
use crate::errors::{KeyVaultError, Result};
use crate::keys::{KeyManager, SecretReader, TerminalReader};
use crate::vault::{read_vault, VaultFile};

/// Environment variable holding a log filter that overrides `log_level`.
pub const LOG_ENV_VAR: &str = "KEYVAULT_LOG";

/// Maximum length of a key id.
const MAX_ID_LEN: usize = 128;

/// keyvault CLI: password-protected key vault.
#[derive(Parser)]
#[command(name = "keyvault", about = "Password-protected key vault", version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Directory containing .keyvault.toml (default: current directory)
    #[arg(long, env = "KEYVAULT_CONFIG_DIR", global = true)]
    pub config_dir: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault file holding a fresh random key
    Create {
        /// Path of the vault file to create
        file: PathBuf,
        /// Key id (omit for interactive prompt)
        #[arg(long)]
        id: Option<String>,
    },

    /// Change the password protecting a vault's key
    Passwd {
        /// Path of the vault file
        file: PathBuf,
    },

    /// Encrypt data under the vault's key and append it to the vault
    Seal {
        /// Path of the vault file
        file: PathBuf,
        /// File to encrypt (reads stdin if omitted)
        #[arg(short, long)]
        input: Option<PathBuf>,
    },

    /// Decrypt all data stored in a vault
    Open {
        /// Path of the vault file
        file: PathBuf,
        /// Output file path (prints to stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Show a vault's header and body layout (no password needed)
    Inspect {
        /// Path of the vault file
        file: PathBuf,
        /// Print JSON instead of a table
        #[arg(long)]
        json: bool,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Key manager wired to the terminal and the system crypto provider.
pub type InteractiveKeyManager = KeyManager<TerminalReader, SystemCrypto>;

/// Build the interactive key manager used by every command.
pub fn key_manager() -> InteractiveKeyManager {
    KeyManager::new(TerminalReader, SystemCrypto)
}

/// Read a vault file and register its key with `manager`.
pub fn load_vault(manager: &mut InteractiveKeyManager, path: &Path) -> Result<VaultFile> {
    let vault = read_vault(path)?;
    manager.add_key(vault.header.clone())?;
    Ok(vault)
}

/// Load settings from `--config-dir` or the current directory.
pub fn load_settings(cli: &Cli) -> Result<Settings> {
    let dir = match &cli.config_dir {
        Some(dir) => dir.clone(),
        None => std::env::current_dir()?,
    };
    Settings::load(&dir)
}

/// Install the stderr log subscriber.
///
/// `KEYVAULT_LOG` (EnvFilter syntax) wins over the configured level.
pub fn init_tracing(log_level: &str) {
    let filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .unwrap_or_else(|_| EnvFilter::new(format!("keyvault={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

/// Ask the operator for a key id (echoed).
pub fn prompt_key_id<R: SecretReader>(reader: &mut R) -> Result<String> {
    let answer = reader.read_secret("Enter a name for the new key", true)?;
    let id = answer.trim().to_string();
    validate_key_id(&id)?;
    Ok(id)
}

/// Validate that a key id can be written to and read back from a header.
///
/// Must be non-empty, at most 128 characters, free of line breaks, and
/// without surrounding whitespace.
pub fn validate_key_id(id: &str) -> Result<()> {
    if id.is_empty() {
        return Err(KeyVaultError::InvalidKeyId("cannot be empty".into()));
    }

    if id.chars().count() > MAX_ID_LEN {
        return Err(KeyVaultError::InvalidKeyId(format!(
            "cannot exceed {MAX_ID_LEN} characters"
        )));
    }

    if id.contains(['\n', '\r']) {
        return Err(KeyVaultError::InvalidKeyId(
            "cannot contain line breaks".into(),
        ));
    }

    if id.trim() != id {
        return Err(KeyVaultError::InvalidKeyId(format!(
            "'{id}' cannot start or end with whitespace"
        )));
    }

    Ok(())
}
