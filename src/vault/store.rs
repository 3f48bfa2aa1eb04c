//! Vault persistence and the high-level item API.
//!
//! [`VaultStore`] owns the on-disk state: the directory layout checks, the
//! ordered `contents.js` index, and the commit discipline (item file first,
//! index second, both atomic, under the advisory write lock).  [`Vault`]
//! wraps a store together with a [`Cryptor`] — either an in-process
//! `KeyStore` or the agent client stub — and exposes the operations the
//! CLI works with.

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::crypto::{Cryptor, KeyFile, KeyStore};
use crate::errors::{Result, VaultError};
use crate::vault::content::ItemContent;
use crate::vault::format::{self, IndexEntry, WriteLock, VAULT_EXT};
use crate::vault::item::{self, Item, TOMBSTONE_TYPE};

/// On-disk vault handle: layout, index, and atomic mutation.
pub struct VaultStore {
    root: PathBuf,
    data_dir: PathBuf,
    index: Vec<IndexEntry>,
    warnings: Vec<String>,
}

impl VaultStore {
    /// Check that `path` looks like a healthy vault: right suffix, and
    /// well-shaped `encryptionKeys.js` and `contents.js`.
    pub fn check_vault(path: &Path) -> Result<()> {
        check_suffix(path)?;
        let data_dir = format::data_dir(path);
        if !data_dir.is_dir() {
            return Err(VaultError::VaultNotFound(path.to_path_buf()));
        }
        let keys = format::read_key_file(&data_dir)?;
        KeyStore::from_key_file(keys)?;
        format::read_index(&data_dir)?;
        Ok(())
    }

    /// Open an existing vault.
    ///
    /// Sweeps `.tmp` leftovers, loads the index, and reconciles it against
    /// the item files: a committed item missing from the index (the crash
    /// window between the two atomic writes) is re-indexed, and an index
    /// entry whose file is gone is dropped with a warning.  Reconciliation
    /// is in-memory only — readers take no lock — and is persisted by the
    /// next mutation.
    pub fn open(path: &Path) -> Result<Self> {
        check_suffix(path)?;
        let data_dir = format::data_dir(path);
        if !data_dir.is_dir() {
            return Err(VaultError::VaultNotFound(path.to_path_buf()));
        }

        format::sweep_tmp_files(&data_dir)?;
        // Parse eagerly so a malformed key file fails the open, not the
        // eventual unlock.
        KeyStore::from_key_file(format::read_key_file(&data_dir)?)?;

        let mut index = format::read_index(&data_dir)?;
        let mut warnings = Vec::new();

        let on_disk = format::list_item_files(&data_dir)?;
        index.retain(|entry| {
            let present = on_disk.contains(&entry.uuid);
            if !present {
                warnings.push(format!(
                    "index entry '{}' ({}) has no item file; dropping it",
                    entry.title, entry.uuid
                ));
            }
            present
        });
        for uuid in &on_disk {
            if !index.iter().any(|e| &e.uuid == uuid) {
                match format::read_item(&data_dir, uuid) {
                    Ok(item) => index.push(IndexEntry::from_item(&item)),
                    Err(e) => warnings.push(format!("unindexed item file {uuid}: {e}")),
                }
            }
        }

        Ok(Self {
            root: path.to_path_buf(),
            data_dir,
            index,
            warnings,
        })
    }

    /// Create a new vault directory with fresh SL3 and SL5 keys.
    ///
    /// Returns the store together with the generated key store, which is
    /// already unlocked so the first items can be added without a prompt.
    pub fn create(path: &Path, master_password: &str, iterations: u32) -> Result<(Self, KeyStore)> {
        check_suffix(path)?;
        if path.exists() {
            return Err(VaultError::VaultAlreadyExists(path.to_path_buf()));
        }

        let data_dir = format::data_dir(path);
        std::fs::create_dir_all(&data_dir)?;

        let keystore = KeyStore::generate(master_password, iterations)?;
        format::write_key_file(&data_dir, &keystore.to_key_file())?;
        format::write_index(&data_dir, &[])?;

        Ok((
            Self {
                root: path.to_path_buf(),
                data_dir,
                index: Vec::new(),
                warnings: Vec::new(),
            },
            keystore,
        ))
    }

    pub fn path(&self) -> &Path {
        &self.root
    }

    /// The ordered index entries.
    pub fn entries(&self) -> &[IndexEntry] {
        &self.index
    }

    /// Problems found while reconciling the index on open.
    pub fn warnings(&self) -> &[String] {
        &self.warnings
    }

    pub fn load_item(&self, uuid: &str) -> Result<Item> {
        format::read_item(&self.data_dir, uuid)
    }

    /// Persist an item: item file first, then the index, both atomically,
    /// under the write lock.  Inserts a new index entry at the end or
    /// replaces the existing one in place, preserving insertion order.
    pub fn save_item(&mut self, item: &Item) -> Result<()> {
        let _lock = WriteLock::acquire(&self.data_dir)?;

        format::write_item(&self.data_dir, item)?;

        let entry = IndexEntry::from_item(item);
        match self.index.iter_mut().find(|e| e.uuid == item.uuid) {
            Some(existing) => *existing = entry,
            None => self.index.push(entry),
        }
        format::write_index(&self.data_dir, &self.index)
    }

    /// Hard-delete: remove the item file, drop the index entry, rewrite
    /// the index.
    pub fn remove_item(&mut self, uuid: &str) -> Result<()> {
        let _lock = WriteLock::acquire(&self.data_dir)?;

        format::remove_item_file(&self.data_dir, uuid)?;
        self.index.retain(|e| e.uuid != uuid);
        format::write_index(&self.data_dir, &self.index)
    }

    pub fn key_file(&self) -> Result<KeyFile> {
        format::read_key_file(&self.data_dir)
    }

    pub fn save_key_file(&self, keys: &KeyFile) -> Result<()> {
        let _lock = WriteLock::acquire(&self.data_dir)?;
        format::write_key_file(&self.data_dir, keys)
    }

    pub fn hint(&self) -> Option<String> {
        format::read_hint(&self.data_dir)
    }

    pub fn set_hint(&self, hint: &str) -> Result<()> {
        format::write_hint(&self.data_dir, hint)
    }
}

fn check_suffix(path: &Path) -> Result<()> {
    if path
        .file_name()
        .map(|n| n.to_string_lossy().ends_with(VAULT_EXT))
        .unwrap_or(false)
    {
        Ok(())
    } else {
        Err(VaultError::CorruptVault(format!(
            "vault directory must end with {VAULT_EXT}"
        )))
    }
}

/// A vault plus the crypto needed for plaintext operations.
pub struct Vault {
    store: VaultStore,
    cryptor: Option<Box<dyn Cryptor>>,
}

impl Vault {
    /// Open an existing vault.  Metadata operations work immediately;
    /// anything touching plaintext needs [`Vault::set_cryptor`] first.
    pub fn open(path: &Path) -> Result<Self> {
        Ok(Self {
            store: VaultStore::open(path)?,
            cryptor: None,
        })
    }

    /// Create a new vault.  The in-process key store becomes the cryptor,
    /// so items can be added right away.
    pub fn create(path: &Path, master_password: &str, iterations: u32) -> Result<Self> {
        let (store, keystore) = VaultStore::create(path, master_password, iterations)?;
        Ok(Self {
            store,
            cryptor: Some(Box::new(keystore)),
        })
    }

    /// Attach the key holder used for encrypt/decrypt — the agent client
    /// in normal operation.
    pub fn set_cryptor(&mut self, cryptor: Box<dyn Cryptor>) {
        self.cryptor = Some(cryptor);
    }

    fn cryptor(&self) -> Result<&dyn Cryptor> {
        self.cryptor.as_deref().ok_or(VaultError::Locked)
    }

    pub fn path(&self) -> &Path {
        self.store.path()
    }

    pub fn warnings(&self) -> &[String] {
        self.store.warnings()
    }

    pub fn hint(&self) -> Option<String> {
        self.store.hint()
    }

    pub fn set_hint(&self, hint: &str) -> Result<()> {
        self.store.set_hint(hint)
    }

    /// Every item, as views over the index, in index order.
    pub fn list_items(&self) -> Vec<Item> {
        self.store
            .entries()
            .iter()
            .map(IndexEntry::to_item_view)
            .collect()
    }

    /// Load the full item file (metadata plus encrypted blob).
    pub fn load_item(&self, uuid: &str) -> Result<Item> {
        self.store.load_item(uuid)
    }

    /// Items whose lowercased title contains `pattern`, whose uuid starts
    /// with it, or whose type matches it as a short alias.
    pub fn lookup(&self, pattern: &str) -> Vec<Item> {
        let lowered = pattern.to_lowercase();
        let alias_type = item::type_for_alias(&lowered);

        self.list_items()
            .into_iter()
            .filter(|item| {
                item.title.to_lowercase().contains(&lowered)
                    || item.uuid.to_lowercase().starts_with(&lowered)
                    || alias_type.map_or(false, |t| item.type_name == t)
            })
            .collect()
    }

    /// Like [`Vault::lookup`], but requires exactly one match.  Returns
    /// the full item (loaded from its file), so the result is safe to
    /// mutate and save back.
    pub fn lookup_single(&self, pattern: &str) -> Result<Item> {
        let matches = self.lookup(pattern);
        match matches.len() {
            0 => Err(VaultError::NotFound(pattern.to_string())),
            1 => self.load_item(&matches[0].uuid),
            _ => Err(VaultError::Ambiguous(pattern.to_string())),
        }
    }

    /// Decrypt and parse an item's content.
    pub fn content(&self, item: &Item) -> Result<ItemContent> {
        // Index views carry neither the blob nor the real security level;
        // fall back to the item file for both.
        let loaded;
        let item = if item.encrypted.is_empty() {
            loaded = self.store.load_item(&item.uuid)?;
            &loaded
        } else {
            item
        };
        if item.encrypted.is_empty() {
            return Err(VaultError::NotFound(format!(
                "content of '{}' (tombstoned items have none)",
                item.title
            )));
        }

        let plaintext = self
            .cryptor()?
            .decrypt(item.security_level, &item.encrypted)?;
        serde_json::from_slice(&plaintext)
            .map_err(|e| VaultError::CorruptVault(format!("item {} content: {e}", item.uuid)))
    }

    /// The raw decrypted JSON of an item, pretty-printed.
    pub fn content_json(&self, item: &Item) -> Result<String> {
        let content = self.content(item)?;
        serde_json::to_string_pretty(&content)
            .map_err(|e| VaultError::Serialization(e.to_string()))
    }

    /// Create, encrypt, and persist a new item.  New items are SL5.
    pub fn add_item(&mut self, title: &str, type_name: &str, content: &ItemContent) -> Result<Item> {
        let mut item = Item::new(title, type_name);
        self.set_content(&mut item, content)?;
        self.store.save_item(&item)?;
        Ok(item)
    }

    /// Re-encrypt new content into the item and refresh `contentsHash`
    /// and `updatedAt`.  The caller persists with [`Vault::save`].
    pub fn set_content(&self, item: &mut Item, content: &ItemContent) -> Result<()> {
        let plaintext = serde_json::to_vec(content)
            .map_err(|e| VaultError::Serialization(format!("item content: {e}")))?;

        item.encrypted = self.cryptor()?.encrypt(item.security_level, &plaintext)?;
        item.contents_hash = content.contents_hash(&item.title);
        item.updated_at = Utc::now().timestamp();
        Ok(())
    }

    /// Persist an item through the atomic item-then-index commit.
    pub fn save(&mut self, item: &Item) -> Result<()> {
        self.store.save_item(item)
    }

    /// Hard-delete an item.
    pub fn remove(&mut self, item: &Item) -> Result<()> {
        self.store.remove_item(&item.uuid)
    }

    /// Soft-delete: tombstone the item.  The encrypted content and hash
    /// are discarded along with the original type.
    pub fn trash(&mut self, item: &mut Item) -> Result<()> {
        item.trashed = true;
        item.type_name = TOMBSTONE_TYPE.to_string();
        item.encrypted = String::new();
        item.contents_hash = String::new();
        item.updated_at = Utc::now().timestamp();
        self.store.save_item(item)
    }

    /// Un-trash an item.  Tombstoned items cannot come back: their content
    /// was discarded when they were trashed.
    pub fn restore(&mut self, item: &mut Item) -> Result<()> {
        if item.is_tombstone() {
            return Err(VaultError::CommandFailed(format!(
                "'{}' was emptied when it was trashed; its content cannot be restored",
                item.title
            )));
        }
        item.trashed = false;
        item.updated_at = Utc::now().timestamp();
        self.store.save_item(item)
    }

    /// Change the title, keeping the contents hash in step (the hash
    /// covers the title, so this needs the decrypted content).
    pub fn rename(&mut self, item: &mut Item, new_title: &str) -> Result<()> {
        let content = self.content(item)?;
        item.title = new_title.to_string();
        self.set_content(item, &content)?;
        self.store.save_item(item)
    }

    /// Rewrap the level keys under a new master password and persist the
    /// new `encryptionKeys.js`.  Item files are untouched: the underlying
    /// level keys do not change.
    pub fn set_master_password(&mut self, old_password: &str, new_password: &str) -> Result<()> {
        let mut keystore = KeyStore::from_key_file(self.store.key_file()?)?;
        keystore.rewrap(old_password, new_password)?;
        self.store.save_key_file(&keystore.to_key_file())
    }
}
