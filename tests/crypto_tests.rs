//! Integration tests for the crypto layer.

use agilevault::crypto::{codec, Cryptor, KeyStore, SecurityLevel};
use agilevault::errors::VaultError;

// Low iteration counts keep PBKDF2 fast in tests; the format minimum is
// 1000.
const ITERATIONS: u32 = 1000;

// ---------------------------------------------------------------------------
// Payload round-trip
// ---------------------------------------------------------------------------

#[test]
fn payload_roundtrip_through_keystore() {
    let store = KeyStore::generate("hunter2", ITERATIONS).unwrap();
    let plaintext = br#"{"URLs":[{"label":"site","url":"https://example.com"}]}"#;

    let blob = store.encrypt(SecurityLevel::SL5, plaintext).unwrap();
    let recovered = store.decrypt(SecurityLevel::SL5, &blob).unwrap();
    assert_eq!(&recovered[..], &plaintext[..]);
}

#[test]
fn blob_is_salted_base64() {
    let store = KeyStore::generate("hunter2", ITERATIONS).unwrap();
    let blob = store.encrypt(SecurityLevel::SL5, b"data").unwrap();

    // The decoded blob starts with the Salted__ magic and an 8-byte salt.
    let (salt, ciphertext) = codec::decode_salted(&blob).unwrap();
    assert_eq!(salt.len(), 8);
    assert_eq!(ciphertext.len() % 16, 0);
}

#[test]
fn levels_use_independent_keys() {
    let store = KeyStore::generate("hunter2", ITERATIONS).unwrap();
    let blob = store.encrypt(SecurityLevel::SL5, b"secret").unwrap();

    let result = store.decrypt(SecurityLevel::SL3, &blob);
    assert!(matches!(result, Err(VaultError::DecryptError)));
}

// ---------------------------------------------------------------------------
// Unlock semantics
// ---------------------------------------------------------------------------

#[test]
fn unlock_is_idempotent() {
    let generated = KeyStore::generate("hunter2", ITERATIONS).unwrap();
    let mut store = KeyStore::from_key_file(generated.to_key_file()).unwrap();

    store.unlock("hunter2").unwrap();
    let blob = store.encrypt(SecurityLevel::SL5, b"payload").unwrap();

    // Unlocking again is a no-op; previously produced blobs still decrypt.
    store.unlock("hunter2").unwrap();
    let recovered = store.decrypt(SecurityLevel::SL5, &blob).unwrap();
    assert_eq!(&recovered[..], b"payload");
}

#[test]
fn failed_unlock_does_not_change_state() {
    let generated = KeyStore::generate("hunter2", ITERATIONS).unwrap();
    let mut store = KeyStore::from_key_file(generated.to_key_file()).unwrap();

    store.unlock("hunter2").unwrap();
    assert!(matches!(
        store.unlock("wrong"),
        Err(VaultError::DecryptError)
    ));

    // Still unlocked: encrypt/decrypt keep working.
    let blob = store.encrypt(SecurityLevel::SL5, b"x").unwrap();
    assert_eq!(&store.decrypt(SecurityLevel::SL5, &blob).unwrap()[..], b"x");
}

#[test]
fn locked_store_refuses_crypto() {
    let generated = KeyStore::generate("hunter2", ITERATIONS).unwrap();
    let store = KeyStore::from_key_file(generated.to_key_file()).unwrap();

    assert!(matches!(
        store.encrypt(SecurityLevel::SL5, b"x"),
        Err(VaultError::Locked)
    ));
}

// ---------------------------------------------------------------------------
// Rewrap
// ---------------------------------------------------------------------------

#[test]
fn rewrap_preserves_existing_blobs() {
    let store = KeyStore::generate("old-pw", ITERATIONS).unwrap();
    let blob = store.encrypt(SecurityLevel::SL5, b"kept across rewrap").unwrap();

    let mut rewrapped = KeyStore::from_key_file(store.to_key_file()).unwrap();
    rewrapped.rewrap("old-pw", "new-pw").unwrap();

    let mut reopened = KeyStore::from_key_file(rewrapped.to_key_file()).unwrap();
    assert!(matches!(
        reopened.unlock("old-pw"),
        Err(VaultError::DecryptError)
    ));
    reopened.unlock("new-pw").unwrap();

    let recovered = reopened.decrypt(SecurityLevel::SL5, &blob).unwrap();
    assert_eq!(&recovered[..], b"kept across rewrap");
}

#[test]
fn rewrap_requires_the_old_password() {
    let store = KeyStore::generate("old-pw", ITERATIONS).unwrap();
    let mut reopened = KeyStore::from_key_file(store.to_key_file()).unwrap();

    assert!(matches!(
        reopened.rewrap("not-the-password", "new-pw"),
        Err(VaultError::DecryptError)
    ));
}

// ---------------------------------------------------------------------------
// Corrupt inputs
// ---------------------------------------------------------------------------

#[test]
fn tampered_wrapped_key_fails_validation() {
    let store = KeyStore::generate("hunter2", ITERATIONS).unwrap();
    let mut file = store.to_key_file();

    // Swap the validator for a blob encrypted with unrelated material: the
    // wrapped key decrypts (PKCS#7 is permissive) but validation must fail.
    let salt = [7u8; 8];
    let (key, iv) = codec::openssl_kdf(&[0xEEu8; 1024], &salt);
    let bogus = codec::aes_cbc_encrypt(&key, &iv, &[0xEEu8; 1024]).unwrap();
    file.list[0].validation = codec::encode_salted(&salt, &bogus);

    let mut reopened = KeyStore::from_key_file(file).unwrap();
    assert!(reopened.unlock("hunter2").is_err());
}

#[test]
fn truncated_key_blob_is_rejected() {
    let store = KeyStore::generate("hunter2", ITERATIONS).unwrap();
    let mut file = store.to_key_file();
    file.list[0].data = "AAAA".into();

    let mut reopened = KeyStore::from_key_file(file).unwrap();
    assert!(matches!(
        reopened.unlock("hunter2"),
        Err(VaultError::CorruptVault(_))
    ));
}
