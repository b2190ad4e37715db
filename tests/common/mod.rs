//! Shared helpers for the integration tests: a scripted prompt reader and
//! a crypto provider that counts how often each primitive runs.

#![allow(dead_code)]

use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::rc::Rc;

use keyvault::crypto::{CryptoProvider, KdfParams, SystemCrypto};
use keyvault::errors::{KeyVaultError, Result};
use keyvault::keys::{KeyManager, SecretReader};
use zeroize::Zeroizing;

/// Cheap Argon2 costs so tests do not spend seconds per derivation.
pub const FAST_KDF: KdfParams = KdfParams {
    memory_kib: 64,
    iterations: 1,
    parallelism: 1,
};

/// One prompt as the reader saw it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub text: String,
    pub echo: bool,
}

/// Answers prompts from a fixed script and records every prompt.
///
/// Running out of answers is a `PromptFailed` error, which lets a test
/// prove that no further prompt was issued.
#[derive(Debug, Default, Clone)]
pub struct ScriptedReader {
    answers: Rc<RefCell<VecDeque<String>>>,
    prompts: Rc<RefCell<Vec<Prompt>>>,
}

impl ScriptedReader {
    pub fn new(answers: &[&str]) -> Self {
        let reader = Self::default();
        reader.push(answers);
        reader
    }

    /// Queue more answers. Clones share the same script.
    pub fn push(&self, answers: &[&str]) {
        self.answers
            .borrow_mut()
            .extend(answers.iter().map(|a| a.to_string()));
    }

    pub fn prompts(&self) -> Vec<Prompt> {
        self.prompts.borrow().clone()
    }

    pub fn prompt_count(&self) -> usize {
        self.prompts.borrow().len()
    }

    pub fn remaining(&self) -> usize {
        self.answers.borrow().len()
    }
}

impl SecretReader for ScriptedReader {
    fn read_secret(&mut self, prompt: &str, echo: bool) -> Result<Zeroizing<String>> {
        self.prompts.borrow_mut().push(Prompt {
            text: prompt.to_string(),
            echo,
        });
        self.answers
            .borrow_mut()
            .pop_front()
            .map(Zeroizing::new)
            .ok_or_else(|| KeyVaultError::PromptFailed(format!("no scripted answer for '{prompt}'")))
    }
}

/// Per-primitive call counters.
#[derive(Debug, Default)]
pub struct Counts {
    pub derive: Cell<usize>,
    pub encrypt: Cell<usize>,
    pub decrypt: Cell<usize>,
    pub random: Cell<usize>,
}

fn bump(cell: &Cell<usize>) {
    cell.set(cell.get() + 1);
}

/// `SystemCrypto` with call counting. Clones share the counters.
#[derive(Debug, Default, Clone)]
pub struct CountingCrypto {
    pub counts: Rc<Counts>,
}

impl CryptoProvider for CountingCrypto {
    fn derive_bytes(
        &self,
        password: &[u8],
        salt: &[u8],
        params: &KdfParams,
        output_len: usize,
    ) -> Result<Zeroizing<Vec<u8>>> {
        bump(&self.counts.derive);
        SystemCrypto.derive_bytes(password, salt, params, output_len)
    }

    fn encrypt(&self, key: &[u8], iv: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
        bump(&self.counts.encrypt);
        SystemCrypto.encrypt(key, iv, plaintext)
    }

    fn decrypt(&self, key: &[u8], iv: &[u8], ciphertext: &[u8]) -> Result<Zeroizing<Vec<u8>>> {
        bump(&self.counts.decrypt);
        SystemCrypto.decrypt(key, iv, ciphertext)
    }

    fn random_bytes(&self, len: usize) -> Result<Vec<u8>> {
        bump(&self.counts.random);
        SystemCrypto.random_bytes(len)
    }

    fn constant_time_eq(&self, a: &[u8], b: &[u8]) -> bool {
        SystemCrypto.constant_time_eq(a, b)
    }
}

pub type TestManager = KeyManager<ScriptedReader, CountingCrypto>;

/// A manager with fast KDF costs plus handles to its reader and counters.
pub fn manager(answers: &[&str]) -> (TestManager, ScriptedReader, Rc<Counts>) {
    let reader = ScriptedReader::new(answers);
    let crypto = CountingCrypto::default();
    let counts = Rc::clone(&crypto.counts);
    let manager = KeyManager::new(reader.clone(), crypto).with_kdf_params(FAST_KDF);
    (manager, reader, counts)
}
