//! `keyvault passwd` — re-protect a vault's key under a new password.
//!
//! The key itself does not change, so sealed data stays readable.

use std::path::Path;

use crate::cli::output;
use crate::cli::{key_manager, load_vault};
use crate::errors::Result;
use crate::vault::write_vault;

/// Execute the `passwd` command.
pub fn execute(file: &Path) -> Result<()> {
    let mut manager = key_manager();
    let vault = load_vault(&mut manager, file)?;
    let id = vault.header.id.clone();

    output::info(&format!("Changing the password of key '{id}'."));
    manager.change_key_password(&id)?;

    write_vault(file, manager.get_key(&id)?, &vault.body)?;
    manager.lock_all_keys();

    output::success(&format!("Password changed for key '{id}'"));
    Ok(())
}
