//! Integration tests for the vault store and API.

use std::fs;
use std::path::PathBuf;

use agilevault::crypto::KeyStore;
use agilevault::errors::VaultError;
use agilevault::vault::{
    format, Item, ItemContent, ItemUrl, Vault, VaultStore, WebFormField, TOMBSTONE_TYPE,
};
use tempfile::TempDir;

const ITERATIONS: u32 = 1000;

/// Helper: a fresh vault path inside a temp dir.
fn vault_path() -> (TempDir, PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.agilekeychain");
    (dir, path)
}

fn login_content(url: &str) -> ItemContent {
    ItemContent {
        form_fields: vec![WebFormField {
            value: "hunter2".into(),
            id: "p".into(),
            name: "password".into(),
            field_type: "P".into(),
            designation: "password".into(),
        }],
        urls: vec![ItemUrl {
            label: "site".into(),
            url: url.into(),
        }],
        ..ItemContent::default()
    }
}

/// Reopen a vault with an unlocked in-process key store attached.
fn reopen_unlocked(path: &std::path::Path, password: &str) -> Vault {
    let mut vault = Vault::open(path).expect("open vault");
    let keys = format::read_key_file(&format::data_dir(path)).expect("read keys");
    let mut keystore = KeyStore::from_key_file(keys).expect("parse keys");
    keystore.unlock(password).expect("unlock");
    vault.set_cryptor(Box::new(keystore));
    vault
}

// ---------------------------------------------------------------------------
// Create and unlock
// ---------------------------------------------------------------------------

#[test]
fn create_then_unlock_with_right_and_wrong_password() {
    let (_dir, path) = vault_path();
    Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    VaultStore::check_vault(&path).unwrap();

    let keys = format::read_key_file(&format::data_dir(&path)).unwrap();
    let mut keystore = KeyStore::from_key_file(keys).unwrap();
    assert!(matches!(
        keystore.unlock("wrong"),
        Err(VaultError::DecryptError)
    ));
    keystore.unlock("hunter2").unwrap();
}

#[test]
fn create_requires_the_suffix_and_a_fresh_path() {
    let dir = TempDir::new().unwrap();

    let bad = dir.path().join("not-a-vault");
    assert!(matches!(
        Vault::create(&bad, "pw", ITERATIONS),
        Err(VaultError::CorruptVault(_))
    ));

    let good = dir.path().join("v.agilekeychain");
    Vault::create(&good, "pw", ITERATIONS).unwrap();
    assert!(matches!(
        Vault::create(&good, "pw", ITERATIONS),
        Err(VaultError::VaultAlreadyExists(_))
    ));
}

// ---------------------------------------------------------------------------
// Add and fetch
// ---------------------------------------------------------------------------

#[test]
fn add_item_and_look_it_up() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    let content = login_content("https://example.com");
    vault
        .add_item("Example", "webforms.WebForm", &content)
        .unwrap();

    let matches = vault.lookup("exam");
    assert_eq!(matches.len(), 1);
    let item = &matches[0];
    assert_eq!(item.uuid.len(), 32);
    assert!(item.uuid.chars().all(|c| c.is_ascii_hexdigit()));

    // The decrypted content round-trips exactly.
    let vault = reopen_unlocked(&path, "hunter2");
    let item = vault.lookup_single("Example").unwrap();
    assert_eq!(vault.content(&item).unwrap(), content);
}

#[test]
fn lookup_matches_uuid_prefix_and_type_alias() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    let item = vault
        .add_item("Example", "webforms.WebForm", &login_content("https://a"))
        .unwrap();
    vault
        .add_item("Notes", "securenotes.SecureNote", &ItemContent::default())
        .unwrap();

    let prefix = item.uuid[..6].to_lowercase();
    let by_uuid = vault.lookup(&prefix);
    assert_eq!(by_uuid.len(), 1);
    assert_eq!(by_uuid[0].uuid, item.uuid);

    let by_alias = vault.lookup("login");
    assert_eq!(by_alias.len(), 1);
    assert_eq!(by_alias[0].title, "Example");

    assert!(matches!(
        vault.lookup_single("e"),
        Err(VaultError::Ambiguous(_))
    ));
    assert!(matches!(
        vault.lookup_single("zzz"),
        Err(VaultError::NotFound(_))
    ));
}

// ---------------------------------------------------------------------------
// Index/file consistency
// ---------------------------------------------------------------------------

#[test]
fn index_mirrors_item_files_after_mutations() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    let a = vault
        .add_item("Alpha", "webforms.WebForm", &login_content("https://a"))
        .unwrap();
    let b = vault
        .add_item("Beta", "webforms.WebForm", &login_content("https://b"))
        .unwrap();
    let mut b_reloaded = vault.load_item(&b.uuid).unwrap();
    vault.trash(&mut b_reloaded).unwrap();
    vault
        .add_item("Gamma", "securenotes.SecureNote", &ItemContent::default())
        .unwrap();
    vault.remove(&a).unwrap();

    let data_dir = format::data_dir(&path);
    for entry in format::read_index(&data_dir).unwrap() {
        let item = format::read_item(&data_dir, &entry.uuid).expect("every entry has a file");
        assert_eq!(entry.type_name, item.type_name);
        assert_eq!(entry.title, item.title);
        assert_eq!(entry.location, item.location);
        assert_eq!(entry.folder_uuid, item.folder_uuid);
        assert_eq!(entry.updated_at, item.updated_at);
        assert_eq!(entry.trashed, item.trashed);
        assert_eq!(entry.contents_hash, item.contents_hash);
    }
}

#[test]
fn contents_hash_matches_decrypted_content() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();
    vault
        .add_item("Example", "webforms.WebForm", &login_content("https://e"))
        .unwrap();

    let vault = reopen_unlocked(&path, "hunter2");
    let item = vault.lookup_single("Example").unwrap();
    let content = vault.content(&item).unwrap();
    assert_eq!(item.contents_hash, content.contents_hash(&item.title));
}

#[test]
fn insertion_order_is_preserved() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    for title in ["Zebra", "Alpha", "Middle"] {
        vault
            .add_item(title, "securenotes.SecureNote", &ItemContent::default())
            .unwrap();
    }
    // Re-saving the first item must not move it.
    let zebra = vault.lookup_single("Zebra").unwrap();
    let mut zebra = vault.load_item(&zebra.uuid).unwrap();
    vault.set_content(&mut zebra, &ItemContent::default()).unwrap();
    vault.save(&zebra).unwrap();

    let reopened = Vault::open(&path).unwrap();
    let titles: Vec<String> = reopened.list_items().into_iter().map(|i| i.title).collect();
    assert_eq!(titles, vec!["Zebra", "Alpha", "Middle"]);
}

// ---------------------------------------------------------------------------
// Trash and restore
// ---------------------------------------------------------------------------

#[test]
fn trash_tombstones_and_restore_is_lossy() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    let item = vault
        .add_item("Example", "webforms.WebForm", &login_content("https://e"))
        .unwrap();
    let mut item = vault.load_item(&item.uuid).unwrap();
    vault.trash(&mut item).unwrap();

    let entry = format::read_index(&format::data_dir(&path))
        .unwrap()
        .into_iter()
        .find(|e| e.uuid == item.uuid)
        .unwrap();
    assert!(entry.trashed);
    assert_eq!(entry.type_name, TOMBSTONE_TYPE);
    assert_eq!(entry.contents_hash, "");

    let on_disk = vault.load_item(&item.uuid).unwrap();
    assert_eq!(on_disk.encrypted, "");

    // The content was discarded at trash time; restore must refuse.
    let mut tombstone = vault.load_item(&item.uuid).unwrap();
    assert!(vault.restore(&mut tombstone).is_err());
}

#[test]
fn restore_works_for_non_tombstoned_trash() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    // Vaults written by other applications may flag `trashed` without
    // tombstoning; those restore cleanly.
    let mut item = Item::new("Kept", "webforms.WebForm");
    item.trashed = true;
    vault.save(&item).unwrap();

    let mut reloaded = vault.load_item(&item.uuid).unwrap();
    vault.restore(&mut reloaded).unwrap();
    assert!(!vault.load_item(&item.uuid).unwrap().trashed);
}

// ---------------------------------------------------------------------------
// Master password change
// ---------------------------------------------------------------------------

#[test]
fn set_master_password_keeps_items_decryptable() {
    let (_dir, path) = vault_path();
    let content = login_content("https://example.com");
    {
        let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();
        vault
            .add_item("Example", "webforms.WebForm", &content)
            .unwrap();
        vault.set_master_password("hunter2", "Tr0ub4dor").unwrap();
    }

    // Old password no longer unlocks.
    let keys = format::read_key_file(&format::data_dir(&path)).unwrap();
    let mut keystore = KeyStore::from_key_file(keys).unwrap();
    assert!(matches!(
        keystore.unlock("hunter2"),
        Err(VaultError::DecryptError)
    ));

    // New password unlocks and the item decrypts to the same plaintext.
    let vault = reopen_unlocked(&path, "Tr0ub4dor");
    let item = vault.lookup_single("Example").unwrap();
    assert_eq!(vault.content(&item).unwrap(), content);
}

#[test]
fn set_master_password_with_wrong_old_password_fails() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();
    assert!(matches!(
        vault.set_master_password("wrong", "new"),
        Err(VaultError::DecryptError)
    ));
}

// ---------------------------------------------------------------------------
// Crash-window reconciliation
// ---------------------------------------------------------------------------

#[test]
fn orphan_item_file_is_reindexed_on_open() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();
    vault
        .add_item("Indexed", "securenotes.SecureNote", &ItemContent::default())
        .unwrap();

    // Simulate a crash between the item-file commit and the index rewrite:
    // the item file exists, the index does not mention it.
    let orphan = Item::new("Orphan", "securenotes.SecureNote");
    let data_dir = format::data_dir(&path);
    format::write_item(&data_dir, &orphan).unwrap();

    let reopened = Vault::open(&path).unwrap();
    let titles: Vec<String> = reopened.list_items().into_iter().map(|i| i.title).collect();
    assert!(titles.contains(&"Orphan".to_string()));
}

#[test]
fn dangling_index_entry_is_dropped_with_a_warning() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();
    let item = vault
        .add_item("Vanishing", "securenotes.SecureNote", &ItemContent::default())
        .unwrap();

    let data_dir = format::data_dir(&path);
    fs::remove_file(format::item_path(&data_dir, &item.uuid)).unwrap();

    let reopened = Vault::open(&path).unwrap();
    assert!(reopened.list_items().is_empty());
    assert_eq!(reopened.warnings().len(), 1);
}

#[test]
fn leftover_tmp_files_are_swept_on_open() {
    let (_dir, path) = vault_path();
    Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    let data_dir = format::data_dir(&path);
    let tmp = data_dir.join("contents.js.tmp");
    fs::write(&tmp, b"half-written").unwrap();

    Vault::open(&path).unwrap();
    assert!(!tmp.exists());
}

// ---------------------------------------------------------------------------
// Write lock
// ---------------------------------------------------------------------------

#[test]
fn live_write_lock_conflicts() {
    let (_dir, path) = vault_path();
    let mut vault = Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    // Another live process (this one) holds the lock.
    let data_dir = format::data_dir(&path);
    fs::write(data_dir.join(".write.lock"), std::process::id().to_string()).unwrap();

    let result = vault.add_item("Blocked", "securenotes.SecureNote", &ItemContent::default());
    assert!(matches!(result, Err(VaultError::Conflict(_))));
}

// ---------------------------------------------------------------------------
// Corrupt vaults
// ---------------------------------------------------------------------------

#[test]
fn malformed_key_file_is_corrupt_vault() {
    let (_dir, path) = vault_path();
    Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    let data_dir = format::data_dir(&path);
    fs::write(data_dir.join("encryptionKeys.js"), b"{\"list\": 42}").unwrap();

    assert!(matches!(
        Vault::open(&path),
        Err(VaultError::CorruptVault(_))
    ));
}

#[test]
fn malformed_index_is_corrupt_vault() {
    let (_dir, path) = vault_path();
    Vault::create(&path, "hunter2", ITERATIONS).unwrap();

    let data_dir = format::data_dir(&path);
    fs::write(data_dir.join("contents.js"), b"{}").unwrap();

    assert!(matches!(
        Vault::open(&path),
        Err(VaultError::CorruptVault(_))
    ));
}
