//! Colored terminal output helpers.
//!
//! All user-facing output goes through these functions so we get
//! consistent styling across every command.

use comfy_table::{ContentArrangement, Table};
use console::style;

use crate::vault::VaultFile;

/// Print a green success message: "check_mark {msg}"
pub fn success(msg: &str) {
    eprintln!("{} {}", style("\u{2713}").green().bold(), msg);
}

/// Print a red error message: "x_mark {msg}"
pub fn error(msg: &str) {
    eprintln!("{} {}", style("\u{2717}").red().bold(), msg);
}

/// Print a yellow warning: "warning_sign {msg}"
pub fn warning(msg: &str) {
    eprintln!("{} {}", style("\u{26a0}").yellow().bold(), msg);
}

/// Print a blue info message: "info_sign {msg}"
pub fn info(msg: &str) {
    eprintln!("{} {}", style("\u{2139}").blue().bold(), msg);
}

/// Print a dim tip/hint: "arrow {msg}"
pub fn tip(msg: &str) {
    eprintln!("{} {}", style("\u{2192}").dim(), style(msg).dim());
}

/// Print a vault's header fields and body layout as a two-column table.
pub fn print_vault_table(vault: &VaultFile) {
    let header = &vault.header;
    let data_lines: usize = vault.body.iter().map(|c| c.data.len()).sum();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(vec!["Field", "Value"]);
    table.add_row(vec!["Version", header.version.as_str()]);
    table.add_row(vec!["Key ID", header.id.as_str()]);
    table.add_row(vec!["Encrypted key", header.encrypted_key.as_str()]);
    table.add_row(vec!["IV", header.iv.as_str()]);
    table.add_row(vec!["Signature", header.signature.as_str()]);
    table.add_row(vec!["Salt", header.salt.as_str()]);
    table.add_row(vec!["Chunks".to_string(), vault.body.len().to_string()]);
    table.add_row(vec!["Data lines".to_string(), data_lines.to_string()]);

    println!("{table}");

    if vault.body.is_empty() {
        tip("Run `keyvault seal <FILE>` to store data under this key.");
    }
}
