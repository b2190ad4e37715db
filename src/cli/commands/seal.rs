//! `keyvault seal` — encrypt data and append it to a vault's body.

use std::fs;
use std::io::{self, Read};
use std::path::Path;

use zeroize::Zeroizing;

use crate::cli::output;
use crate::cli::{key_manager, load_vault};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::write_vault;

/// Execute the `seal` command.
pub fn execute(settings: &Settings, file: &Path, input: Option<&Path>) -> Result<()> {
    let mut manager = key_manager();
    let mut vault = load_vault(&mut manager, file)?;

    // Read the payload before prompting so piped input is fully consumed.
    let plaintext = read_input(input)?;
    if plaintext.is_empty() {
        output::warning("Nothing to seal: input is empty.");
        return Ok(());
    }

    let chunks = manager.encrypt_payload(
        &vault.header.id,
        &plaintext,
        settings.chunk_size,
        settings.line_width,
    )?;
    let added = chunks.len();
    vault.body.extend(chunks);

    write_vault(file, &vault.header, &vault.body)?;
    manager.lock_all_keys();

    output::success(&format!(
        "Sealed {} bytes into {added} chunk(s) in {}",
        plaintext.len(),
        file.display()
    ));
    Ok(())
}

fn read_input(input: Option<&Path>) -> Result<Zeroizing<Vec<u8>>> {
    match input {
        Some(path) => Ok(Zeroizing::new(fs::read(path)?)),
        None => {
            let mut buf = Zeroizing::new(Vec::new());
            io::stdin().read_to_end(&mut buf)?;
            Ok(buf)
        }
    }
}
