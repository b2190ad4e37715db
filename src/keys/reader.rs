//! Reading secrets (and the occasional plain answer) from the operator.

use zeroize::Zeroizing;

use crate::errors::{KeyVaultError, Result};

/// Environment variable consulted before any non-echoing prompt.
pub const PASSWORD_ENV_VAR: &str = "KEYVAULT_PASSWORD";

/// Prompts for one line of input.
///
/// `echo == false` means the answer is a secret and must not be shown
/// while typed. Prompts are plain text without a trailing separator.
pub trait SecretReader {
    fn read_secret(&mut self, prompt: &str, echo: bool) -> Result<Zeroizing<String>>;
}

/// Interactive terminal reader backed by `dialoguer`.
///
/// Non-echoing prompts take `KEYVAULT_PASSWORD` when it is set and
/// non-empty, for scripted use.
#[derive(Debug, Default)]
pub struct TerminalReader;

impl SecretReader for TerminalReader {
    fn read_secret(&mut self, prompt: &str, echo: bool) -> Result<Zeroizing<String>> {
        if echo {
            let answer: String = dialoguer::Input::new()
                .with_prompt(prompt)
                .interact_text()
                .map_err(|e| KeyVaultError::PromptFailed(format!("{prompt}: {e}")))?;
            return Ok(Zeroizing::new(answer));
        }

        if let Ok(pw) = std::env::var(PASSWORD_ENV_VAR) {
            if !pw.is_empty() {
                return Ok(Zeroizing::new(pw));
            }
        }

        let password = dialoguer::Password::new()
            .with_prompt(prompt)
            .interact()
            .map_err(|e| KeyVaultError::PromptFailed(format!("{prompt}: {e}")))?;
        Ok(Zeroizing::new(password))
    }
}

impl<R: SecretReader + ?Sized> SecretReader for &mut R {
    fn read_secret(&mut self, prompt: &str, echo: bool) -> Result<Zeroizing<String>> {
        (**self).read_secret(prompt, echo)
    }
}

impl<R: SecretReader + ?Sized> SecretReader for Box<R> {
    fn read_secret(&mut self, prompt: &str, echo: bool) -> Result<Zeroizing<String>> {
        (**self).read_secret(prompt, echo)
    }
}
