//! `keyvault create` — create a new vault holding a fresh random key.

use std::path::Path;

use crate::cli::output;
use crate::cli::{key_manager, prompt_key_id, validate_key_id};
use crate::errors::{KeyVaultError, Result};
use crate::keys::TerminalReader;
use crate::vault::write_vault;

/// Execute the `create` command.
pub fn execute(file: &Path, id: Option<&str>) -> Result<()> {
    // 1. Never overwrite an existing vault.
    if file.exists() {
        output::tip("Use `keyvault passwd` to change the password of an existing vault.");
        return Err(KeyVaultError::VaultAlreadyExists(file.to_path_buf()));
    }

    // 2. Resolve the key id from the flag or an interactive prompt.
    let id = match id {
        Some(id) => {
            validate_key_id(id)?;
            id.to_string()
        }
        None => prompt_key_id(&mut TerminalReader)?,
    };

    // 3. Generate the key under a new password and write the empty vault.
    let mut manager = key_manager();
    let record = manager.create_new_key(&id)?;
    write_vault(file, record, &[])?;
    manager.lock_all_keys();

    output::success(&format!("Created key '{id}' in {}", file.display()));
    output::tip("Run `keyvault seal <FILE>` to store data under this key.");

    Ok(())
}
