//! Integration tests for the key manager lifecycle.
//!
//! Every test uses a scripted reader and cheap Argon2 costs, and counts
//! crypto calls to check how much work each operation does.

mod common;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use common::{manager, Prompt};
use keyvault::crypto::{IV_LEN, KEY_LEN, SALT_LEN};
use keyvault::errors::KeyVaultError;
use keyvault::keys::{KeyRecord, MAX_RETRIES, RECORD_VERSION};

const ENCRYPT_K1: &str = "Enter password to encrypt key k1";
const DECRYPT_K1: &str = "Enter password to decrypt key k1";
const CONFIRM: &str = "Confirm password";

fn secret(text: &str) -> Prompt {
    Prompt {
        text: text.to_string(),
        echo: false,
    }
}

fn decoded_len(field: &str) -> usize {
    BASE64.decode(field).expect("field should be base64").len()
}

/// A locked copy of `record` with only its persisted fields.
fn persisted(record: &KeyRecord) -> KeyRecord {
    KeyRecord::new(
        record.id.clone(),
        record.encrypted_key.clone(),
        record.iv.clone(),
        record.salt.clone(),
        record.signature.clone(),
    )
}

// ---------------------------------------------------------------------------
// Creation
// ---------------------------------------------------------------------------

#[test]
fn create_new_key_prompts_twice_and_leaves_key_unlocked() {
    let (mut km, reader, counts) = manager(&["hunter2", "hunter2"]);

    let record = km.create_new_key("k1").unwrap();
    assert_eq!(record.version, RECORD_VERSION);
    assert_eq!(record.id, "k1");
    assert!(record.is_unlocked());
    assert_eq!(record.decrypted_key().unwrap().len(), KEY_LEN);

    // AES-GCM appends a 16-byte tag.
    assert_eq!(decoded_len(&record.encrypted_key), KEY_LEN + 16);
    assert_eq!(decoded_len(&record.iv), IV_LEN);
    assert_eq!(decoded_len(&record.salt), SALT_LEN);
    assert_eq!(decoded_len(&record.signature), KEY_LEN);

    assert_eq!(reader.prompts(), vec![secret(ENCRYPT_K1), secret(CONFIRM)]);
    assert_eq!(counts.derive.get(), 1);
    assert_eq!(counts.encrypt.get(), 1);
}

#[test]
fn two_keys_get_different_material_and_salts() {
    let (mut km, _reader, _counts) = manager(&["pw", "pw", "pw", "pw"]);

    let a = km.create_new_key("a").unwrap().clone();
    let b = km.create_new_key("b").unwrap().clone();

    assert_ne!(a.salt, b.salt);
    assert_ne!(a.signature, b.signature);
    assert_ne!(
        *a.decrypted_key().unwrap().expose(),
        *b.decrypted_key().unwrap().expose()
    );
    assert_eq!(km.key_ids(), vec!["a", "b"]);
}

#[test]
fn mismatched_confirmation_prompts_again_until_they_agree() {
    let (mut km, reader, counts) = manager(&["a", "b", "c", "c"]);

    km.create_new_key("k1").unwrap();

    assert_eq!(
        reader.prompts(),
        vec![
            secret(ENCRYPT_K1),
            secret(CONFIRM),
            secret(ENCRYPT_K1),
            secret(CONFIRM),
        ]
    );
    // Only the agreed password is ever stretched.
    assert_eq!(counts.derive.get(), 1);
}

#[test]
fn create_duplicate_id_fails_without_prompting() {
    let (mut km, reader, _counts) = manager(&["pw", "pw"]);
    km.create_new_key("k1").unwrap();

    assert!(matches!(
        km.create_new_key("k1"),
        Err(KeyVaultError::DuplicateKey(id)) if id == "k1"
    ));
    assert_eq!(reader.prompt_count(), 2);
}

#[test]
fn prompt_failure_propagates() {
    let (mut km, _reader, _counts) = manager(&[]);
    assert!(matches!(
        km.create_new_key("k1"),
        Err(KeyVaultError::PromptFailed(_))
    ));
    assert!(!km.contains_key("k1"));
}

// ---------------------------------------------------------------------------
// Registry
// ---------------------------------------------------------------------------

#[test]
fn add_key_rejects_duplicates_and_keeps_original() {
    let (mut km, _reader, _counts) = manager(&[]);
    km.add_key(KeyRecord::new("k1", "AAAA", "AAAA", "AAAA", "ORIG"))
        .unwrap();

    let err = km
        .add_key(KeyRecord::new("k1", "BBBB", "BBBB", "BBBB", "NEW"))
        .unwrap_err();
    assert!(matches!(err, KeyVaultError::DuplicateKey(ref id) if id == "k1"));
    assert_eq!(km.get_key("k1").unwrap().signature, "ORIG");
    assert_eq!(km.len(), 1);
}

#[test]
fn record_with_foreign_version_is_never_registered() {
    let (mut km, _reader, _counts) = manager(&[]);
    let mut record = KeyRecord::new("k1", "AAAA", "AAAA", "AAAA", "AAAA");
    record.version = "v2".to_string();

    assert!(matches!(
        km.add_key(record),
        Err(KeyVaultError::MalformedHeader(_))
    ));
    assert!(!km.contains_key("k1"));
}

#[test]
fn unknown_key_fails_without_prompting() {
    let (mut km, reader, _counts) = manager(&["pw"]);
    assert!(matches!(
        km.get_decrypted_key("nope"),
        Err(KeyVaultError::UnknownKey(_))
    ));
    assert_eq!(reader.prompt_count(), 0);
}

// ---------------------------------------------------------------------------
// Unlocking
// ---------------------------------------------------------------------------

#[test]
fn create_lock_unlock_recovers_the_same_key() {
    let (mut km, reader, counts) = manager(&["hunter2", "hunter2", "hunter2"]);

    let original = km
        .create_new_key("k1")
        .unwrap()
        .decrypted_key()
        .unwrap()
        .expose();
    km.lock_key("k1").unwrap();
    assert!(!km.get_key("k1").unwrap().is_unlocked());

    let unlocked = km.get_decrypted_key("k1").unwrap();
    assert_eq!(*unlocked.expose(), *original);
    assert!(km.get_key("k1").unwrap().is_unlocked());

    assert_eq!(reader.prompts().last(), Some(&secret(DECRYPT_K1)));
    assert_eq!(counts.derive.get(), 2);
    assert_eq!(counts.decrypt.get(), 1);
}

#[test]
fn unlocked_key_is_returned_without_prompting() {
    let (mut km, reader, counts) = manager(&["pw", "pw"]);
    km.create_new_key("k1").unwrap();

    let first = km.get_decrypted_key("k1").unwrap();
    let second = km.get_decrypted_key("k1").unwrap();

    assert_eq!(first, second);
    assert_eq!(reader.prompt_count(), 2);
    assert_eq!(counts.derive.get(), 1);
}

#[test]
fn six_wrong_passwords_exhaust_the_retries() {
    let wrong = ["w1", "w2", "w3", "w4", "w5", "w6"];
    let (mut km, reader, counts) = manager(&["right", "right"]);
    km.create_new_key("k1").unwrap();
    km.lock_key("k1").unwrap();

    // One correct answer queued after the wrong ones must never be read.
    reader.push(&wrong);
    reader.push(&["right"]);
    let derivations_before = counts.derive.get();

    let err = km.get_decrypted_key("k1").unwrap_err();
    match err {
        KeyVaultError::PasswordVerificationExhausted { id, attempts } => {
            assert_eq!(id, "k1");
            assert_eq!(attempts, MAX_RETRIES + 1);
        }
        other => panic!("expected PasswordVerificationExhausted, got {other:?}"),
    }

    assert_eq!(counts.derive.get() - derivations_before, 6);
    assert_eq!(counts.decrypt.get(), 0);
    assert_eq!(reader.remaining(), 1);
    assert!(!km.get_key("k1").unwrap().is_unlocked());
}

#[test]
fn correct_password_on_third_attempt_succeeds_after_three_derivations() {
    let (mut km, reader, counts) = manager(&["right", "right"]);
    km.create_new_key("k1").unwrap();
    km.lock_key("k1").unwrap();

    reader.push(&["nope", "still nope", "right"]);
    let derivations_before = counts.derive.get();

    km.get_decrypted_key("k1").unwrap();

    assert_eq!(counts.derive.get() - derivations_before, 3);
    assert_eq!(counts.decrypt.get(), 1);
    assert_eq!(reader.prompt_count(), 5);
}

#[test]
fn correct_password_on_last_allowed_attempt_succeeds() {
    let (mut km, reader, _counts) = manager(&["right", "right"]);
    km.create_new_key("k1").unwrap();
    km.lock_key("k1").unwrap();

    reader.push(&["1", "2", "3", "4", "5", "right"]);
    assert!(km.get_decrypted_key("k1").is_ok());
}

#[test]
fn zero_retries_allows_a_single_attempt() {
    let (mut km, reader, _counts) = manager(&["right", "right"]);
    km.create_new_key("k1").unwrap();
    km.lock_key("k1").unwrap();

    reader.push(&["wrong", "right"]);
    assert!(matches!(
        km.get_decrypted_key_with_retries("k1", 0),
        Err(KeyVaultError::PasswordVerificationExhausted { attempts: 1, .. })
    ));
    assert_eq!(reader.remaining(), 1);
}

#[test]
fn tampered_encrypted_key_fails_after_signature_check() {
    let (mut km, _reader, _counts) = manager(&["hunter2", "hunter2"]);
    let mut record = persisted(km.create_new_key("k1").unwrap());

    let mut bytes = BASE64.decode(&record.encrypted_key).unwrap();
    bytes[0] ^= 0xFF;
    record.encrypted_key = BASE64.encode(&bytes);

    let (mut other, _reader, _counts) = manager(&["hunter2"]);
    other.add_key(record).unwrap();
    assert!(matches!(
        other.get_decrypted_key("k1"),
        Err(KeyVaultError::DecryptionFailed)
    ));
    assert!(!other.get_key("k1").unwrap().is_unlocked());
}

// ---------------------------------------------------------------------------
// Locking and zeroing
// ---------------------------------------------------------------------------

#[test]
fn lock_key_zeroes_material_held_elsewhere() {
    let (mut km, _reader, _counts) = manager(&["pw", "pw"]);
    km.create_new_key("k1").unwrap();
    let handle = km.get_decrypted_key("k1").unwrap();
    assert!(!handle.is_erased());

    km.lock_key("k1").unwrap();

    assert!(handle.is_erased());
    assert_eq!(handle.len(), KEY_LEN);
    assert!(!km.get_key("k1").unwrap().is_unlocked());
}

#[test]
fn locking_twice_is_a_noop() {
    let (mut km, _reader, _counts) = manager(&["pw", "pw"]);
    km.create_new_key("k1").unwrap();

    km.lock_key("k1").unwrap();
    let after_first = km.get_key("k1").unwrap().clone();
    km.lock_key("k1").unwrap();

    assert_eq!(km.get_key("k1").unwrap(), &after_first);
}

#[test]
fn lock_all_keys_zeroes_every_key() {
    let (mut km, _reader, _counts) = manager(&["pw", "pw", "pw", "pw"]);
    km.create_new_key("a").unwrap();
    km.create_new_key("b").unwrap();
    let a = km.get_decrypted_key("a").unwrap();
    let b = km.get_decrypted_key("b").unwrap();

    km.lock_all_keys();

    assert!(a.is_erased());
    assert!(b.is_erased());
    assert_eq!(km.len(), 2);
}

#[test]
fn remove_key_zeroes_and_forgets() {
    let (mut km, _reader, _counts) = manager(&["pw", "pw"]);
    km.create_new_key("k1").unwrap();
    let handle = km.get_decrypted_key("k1").unwrap();

    km.remove_key("k1");

    assert!(handle.is_erased());
    assert!(!km.contains_key("k1"));
    assert!(matches!(
        km.get_key("k1"),
        Err(KeyVaultError::UnknownKey(_))
    ));
}

#[test]
fn reset_zeroes_and_empties_the_registry() {
    let (mut km, _reader, _counts) = manager(&["pw", "pw", "pw", "pw"]);
    km.create_new_key("a").unwrap();
    km.create_new_key("b").unwrap();
    let a = km.get_decrypted_key("a").unwrap();
    let b = km.get_decrypted_key("b").unwrap();

    km.reset();

    assert!(km.is_empty());
    assert!(a.is_erased());
    assert!(b.is_erased());
}

#[test]
fn dropping_the_manager_zeroes_keys() {
    let handle = {
        let (mut km, _reader, _counts) = manager(&["pw", "pw"]);
        km.create_new_key("k1").unwrap();
        km.get_decrypted_key("k1").unwrap()
    };
    assert!(handle.is_erased());
}

// ---------------------------------------------------------------------------
// Password change
// ---------------------------------------------------------------------------

#[test]
fn change_password_keeps_the_key_and_replaces_the_envelope() {
    let (mut km, reader, _counts) = manager(&["old", "old"]);
    let before = persisted(km.create_new_key("k1").unwrap());
    let key = km.get_decrypted_key("k1").unwrap().expose();
    km.lock_key("k1").unwrap();

    reader.push(&["old", "new", "new"]);
    km.change_key_password("k1").unwrap();

    let after = km.get_key("k1").unwrap();
    assert!(after.is_unlocked());
    assert_ne!(after.salt, before.salt);
    assert_ne!(after.iv, before.iv);
    assert_ne!(after.encrypted_key, before.encrypted_key);
    assert_ne!(after.signature, before.signature);
    assert_eq!(
        reader.prompts()[2..],
        [secret(DECRYPT_K1), secret(ENCRYPT_K1), secret(CONFIRM)]
    );

    // Unlock the new envelope from scratch.
    let rewrapped = persisted(after);
    let (mut fresh, fresh_reader, _counts) = manager(&["old"]);
    fresh.add_key(rewrapped).unwrap();
    assert!(matches!(
        fresh.get_decrypted_key_with_retries("k1", 0),
        Err(KeyVaultError::PasswordVerificationExhausted { .. })
    ));
    fresh_reader.push(&["new"]);
    assert_eq!(*fresh.get_decrypted_key("k1").unwrap().expose(), *key);
}

#[test]
fn change_password_on_unlocked_key_skips_the_decrypt_prompt() {
    let (mut km, reader, _counts) = manager(&["old", "old", "new", "new"]);
    km.create_new_key("k1").unwrap();

    km.change_key_password("k1").unwrap();

    assert_eq!(
        reader.prompts(),
        vec![
            secret(ENCRYPT_K1),
            secret(CONFIRM),
            secret(ENCRYPT_K1),
            secret(CONFIRM),
        ]
    );
}

#[test]
fn change_password_of_unknown_key_fails() {
    let (mut km, _reader, _counts) = manager(&[]);
    assert!(matches!(
        km.change_key_password("ghost"),
        Err(KeyVaultError::UnknownKey(_))
    ));
}

// ---------------------------------------------------------------------------
// Payload
// ---------------------------------------------------------------------------

#[test]
fn payload_survives_lock_and_unlock() {
    let (mut km, reader, _counts) = manager(&["hunter2", "hunter2"]);
    km.create_new_key("k1").unwrap();

    let plaintext = b"the quick brown fox jumps over the lazy dog\n".repeat(10);
    let chunks = km.encrypt_payload("k1", &plaintext, 128, 64).unwrap();
    assert_eq!(chunks.len(), (plaintext.len() + 127) / 128);

    km.lock_all_keys();
    reader.push(&["hunter2"]);

    let opened = km.decrypt_payload("k1", &chunks).unwrap();
    assert_eq!(opened.as_slice(), plaintext.as_slice());
}

#[test]
fn payload_from_another_key_does_not_open() {
    let (mut km, _reader, _counts) = manager(&["pw", "pw", "pw", "pw"]);
    km.create_new_key("a").unwrap();
    km.create_new_key("b").unwrap();

    let chunks = km.encrypt_payload("a", b"for a only", 64, 64).unwrap();
    assert!(matches!(
        km.decrypt_payload("b", &chunks),
        Err(KeyVaultError::DecryptionFailed)
    ));
}
