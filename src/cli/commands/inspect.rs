//! `keyvault inspect` — show a vault's structure without unlocking it.

use std::path::Path;

use serde::Serialize;

use crate::cli::output;
use crate::errors::{KeyVaultError, Result};
use crate::keys::KeyRecord;
use crate::vault::{read_vault, VaultFile};

#[derive(Serialize)]
struct Summary<'a> {
    #[serde(flatten)]
    header: &'a KeyRecord,
    chunks: usize,
    data_lines: usize,
}

/// Execute the `inspect` command.
pub fn execute(file: &Path, json: bool) -> Result<()> {
    let vault = read_vault(file)?;

    if json {
        println!("{}", summary_json(&vault)?);
    } else {
        output::print_vault_table(&vault);
    }

    Ok(())
}

fn summary_json(vault: &VaultFile) -> Result<String> {
    let summary = Summary {
        header: &vault.header,
        chunks: vault.body.len(),
        data_lines: vault.body.iter().map(|c| c.data.len()).sum(),
    };
    serde_json::to_string_pretty(&summary)
        .map_err(|e| KeyVaultError::SerializationError(e.to_string()))
}
