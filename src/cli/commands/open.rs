//! `keyvault open` — decrypt every chunk in a vault.

use std::fs;
use std::io::{self, Write};
use std::path::Path;

use crate::cli::output;
use crate::cli::{key_manager, load_vault};
use crate::errors::{KeyVaultError, Result};

/// Execute the `open` command.
pub fn execute(file: &Path, output_path: Option<&Path>) -> Result<()> {
    // Safety: refuse to write plaintext over the vault itself.
    if let Some(dest) = output_path {
        if is_same_file(dest, file)? {
            return Err(KeyVaultError::CommandFailed(
                "refusing to write output over the vault file".into(),
            ));
        }
    }

    let mut manager = key_manager();
    let vault = load_vault(&mut manager, file)?;

    if vault.body.is_empty() {
        output::info("This vault holds no data yet.");
        return Ok(());
    }

    let plaintext = manager.decrypt_payload(&vault.header.id, &vault.body)?;
    manager.lock_all_keys();

    match output_path {
        Some(dest) => {
            fs::write(dest, plaintext.as_slice())?;
            output::success(&format!(
                "Wrote {} bytes to {}",
                plaintext.len(),
                dest.display()
            ));
        }
        None => {
            // Raw output only, so it can be piped.
            let mut stdout = io::stdout().lock();
            stdout.write_all(&plaintext)?;
            stdout.flush()?;
        }
    }

    Ok(())
}

/// True when both paths name the same existing file, however spelled.
fn is_same_file(a: &Path, b: &Path) -> Result<bool> {
    if a == b {
        return Ok(true);
    }
    if !a.exists() || !b.exists() {
        return Ok(false);
    }
    Ok(fs::canonicalize(a)? == fs::canonicalize(b)?)
}
