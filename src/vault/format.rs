//! On-disk layout of an `.agilekeychain` directory.
//!
//! ```text
//! V/                                   (ends with .agilekeychain)
//! V/data/default/encryptionKeys.js     security levels + wrapped keys
//! V/data/default/contents.js           index: JSON array of arrays
//! V/data/default/<UUID>.1password      one JSON file per item
//! V/data/default/.password.hint        optional
//! V/data/default/.write.lock           advisory writer lock (runtime)
//! ```
//!
//! Every mutation goes through [`atomic_write`]: the bytes land in a
//! sibling `.tmp` file which is fsynced and renamed over the target, so
//! readers never observe a half-written file.  A crash can still leave the
//! item file committed while `contents.js` is stale; the store reconciles
//! that window on open.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use serde_json::{json, Value};

use crate::crypto::KeyFile;
use crate::errors::{Result, VaultError};
use crate::vault::item::Item;

/// Required suffix of every vault directory.
pub const VAULT_EXT: &str = ".agilekeychain";

/// Extension of per-item files.
pub const ITEM_EXT: &str = "1password";

const KEYS_FILE: &str = "encryptionKeys.js";
const CONTENTS_FILE: &str = "contents.js";
const HINT_FILE: &str = ".password.hint";
const LOCK_FILE: &str = ".write.lock";

/// The profile data directory inside a vault root.
pub fn data_dir(root: &Path) -> PathBuf {
    root.join("data").join("default")
}

pub fn item_path(data_dir: &Path, uuid: &str) -> PathBuf {
    data_dir.join(format!("{uuid}.{ITEM_EXT}"))
}

// ---------------------------------------------------------------------------
// encryptionKeys.js
// ---------------------------------------------------------------------------

pub fn read_key_file(data_dir: &Path) -> Result<KeyFile> {
    let path = data_dir.join(KEYS_FILE);
    let bytes = fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            VaultError::CorruptVault(format!("missing {KEYS_FILE}"))
        }
        _ => VaultError::Io(e),
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| VaultError::CorruptVault(format!("{KEYS_FILE}: {e}")))
}

pub fn write_key_file(data_dir: &Path, keys: &KeyFile) -> Result<()> {
    let bytes = serde_json::to_vec(keys)
        .map_err(|e| VaultError::Serialization(format!("{KEYS_FILE}: {e}")))?;
    atomic_write(&data_dir.join(KEYS_FILE), &bytes)
}

// ---------------------------------------------------------------------------
// contents.js index
// ---------------------------------------------------------------------------

/// One row of `contents.js`, kept in insertion order for the lifetime of
/// the vault.  The on-disk row is
/// `[uuid, typeName, title, location, folderUuid, updatedAt, trashed(0|1),
/// contentsHash, "N"]`.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexEntry {
    pub uuid: String,
    pub type_name: String,
    pub title: String,
    pub location: String,
    pub folder_uuid: String,
    pub updated_at: i64,
    pub trashed: bool,
    pub contents_hash: String,
}

impl IndexEntry {
    /// Mirror of the item attributes the index duplicates.
    pub fn from_item(item: &Item) -> Self {
        Self {
            uuid: item.uuid.clone(),
            type_name: item.type_name.clone(),
            title: item.title.clone(),
            location: item.location.clone(),
            folder_uuid: item.folder_uuid.clone(),
            updated_at: item.updated_at,
            trashed: item.trashed,
            contents_hash: item.contents_hash.clone(),
        }
    }

    /// An `Item` view of the index row alone.  `createdAt` and the
    /// encrypted blob are only available by loading the item file.
    pub fn to_item_view(&self) -> Item {
        Item {
            uuid: self.uuid.clone(),
            type_name: self.type_name.clone(),
            title: self.title.clone(),
            location: self.location.clone(),
            folder_uuid: self.folder_uuid.clone(),
            created_at: 0,
            updated_at: self.updated_at,
            trashed: self.trashed,
            security_level: crate::crypto::SecurityLevel::SL5,
            contents_hash: self.contents_hash.clone(),
            open_contents: None,
            encrypted: String::new(),
        }
    }

    fn to_row(&self) -> Value {
        json!([
            self.uuid,
            self.type_name,
            self.title,
            self.location,
            self.folder_uuid,
            self.updated_at,
            if self.trashed { 1 } else { 0 },
            self.contents_hash,
            "N",
        ])
    }

    fn from_row(row: &Value) -> Result<Self> {
        let cells = row
            .as_array()
            .ok_or_else(|| VaultError::CorruptVault("index row is not an array".into()))?;
        if cells.len() < 8 {
            return Err(VaultError::CorruptVault(format!(
                "index row has {} cells, expected at least 8",
                cells.len()
            )));
        }

        let text = |i: usize| -> String {
            cells[i].as_str().unwrap_or_default().to_string()
        };
        // Older writers store trashed as a bool, newer ones as 0/1.
        let trashed = match &cells[6] {
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_i64().unwrap_or(0) != 0,
            _ => false,
        };

        Ok(Self {
            uuid: text(0),
            type_name: text(1),
            title: text(2),
            location: text(3),
            folder_uuid: text(4),
            updated_at: cells[5].as_i64().unwrap_or_default(),
            trashed,
            contents_hash: text(7),
        })
    }
}

pub fn read_index(data_dir: &Path) -> Result<Vec<IndexEntry>> {
    let path = data_dir.join(CONTENTS_FILE);
    let bytes = fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => {
            VaultError::CorruptVault(format!("missing {CONTENTS_FILE}"))
        }
        _ => VaultError::Io(e),
    })?;
    let rows: Vec<Value> = serde_json::from_slice(&bytes)
        .map_err(|e| VaultError::CorruptVault(format!("{CONTENTS_FILE}: {e}")))?;
    rows.iter().map(IndexEntry::from_row).collect()
}

pub fn write_index(data_dir: &Path, entries: &[IndexEntry]) -> Result<()> {
    let rows: Vec<Value> = entries.iter().map(IndexEntry::to_row).collect();
    let bytes = serde_json::to_vec(&rows)
        .map_err(|e| VaultError::Serialization(format!("{CONTENTS_FILE}: {e}")))?;
    atomic_write(&data_dir.join(CONTENTS_FILE), &bytes)
}

// ---------------------------------------------------------------------------
// Item files
// ---------------------------------------------------------------------------

pub fn read_item(data_dir: &Path, uuid: &str) -> Result<Item> {
    let path = item_path(data_dir, uuid);
    let bytes = fs::read(&path).map_err(|e| match e.kind() {
        std::io::ErrorKind::NotFound => VaultError::NotFound(uuid.to_string()),
        _ => VaultError::Io(e),
    })?;
    serde_json::from_slice(&bytes)
        .map_err(|e| VaultError::CorruptVault(format!("item {uuid}: {e}")))
}

pub fn write_item(data_dir: &Path, item: &Item) -> Result<()> {
    let bytes = serde_json::to_vec(item)
        .map_err(|e| VaultError::Serialization(format!("item {}: {e}", item.uuid)))?;
    atomic_write(&item_path(data_dir, &item.uuid), &bytes)
}

pub fn remove_item_file(data_dir: &Path, uuid: &str) -> Result<()> {
    match fs::remove_file(item_path(data_dir, uuid)) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VaultError::NotFound(uuid.to_string()))
        }
        Err(e) => Err(e.into()),
    }
}

/// All item uuids present on disk, in directory order.
pub fn list_item_files(data_dir: &Path) -> Result<Vec<String>> {
    let mut uuids = Vec::new();
    for entry in fs::read_dir(data_dir)? {
        let name = entry?.file_name();
        let name = name.to_string_lossy();
        if let Some(stem) = name.strip_suffix(&format!(".{ITEM_EXT}")) {
            uuids.push(stem.to_string());
        }
    }
    Ok(uuids)
}

// ---------------------------------------------------------------------------
// Password hint
// ---------------------------------------------------------------------------

pub fn read_hint(data_dir: &Path) -> Option<String> {
    fs::read_to_string(data_dir.join(HINT_FILE)).ok()
}

pub fn write_hint(data_dir: &Path, hint: &str) -> Result<()> {
    fs::write(data_dir.join(HINT_FILE), hint)?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Atomic writes
// ---------------------------------------------------------------------------

/// Write bytes to a sibling `.tmp` file, fsync, and rename over the target.
pub fn atomic_write(path: &Path, bytes: &[u8]) -> Result<()> {
    let tmp_path = tmp_path_for(path);
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(bytes)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut name = path
        .file_name()
        .unwrap_or_default()
        .to_string_lossy()
        .into_owned();
    name.push_str(".tmp");
    path.with_file_name(name)
}

/// Remove `.tmp` leftovers from interrupted writes.
pub fn sweep_tmp_files(data_dir: &Path) -> Result<()> {
    for entry in fs::read_dir(data_dir)? {
        let entry = entry?;
        if entry.file_name().to_string_lossy().ends_with(".tmp") {
            let _ = fs::remove_file(entry.path());
        }
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Advisory write lock
// ---------------------------------------------------------------------------

/// Exclusive advisory lock held for the duration of a mutating operation.
///
/// The lockfile holds the owner's pid.  If the file already exists but its
/// owner is gone (a crashed writer), the stale lock is reclaimed; a live
/// owner yields `Conflict`.  Readers never take this lock.
pub struct WriteLock {
    path: PathBuf,
}

impl WriteLock {
    pub fn acquire(data_dir: &Path) -> Result<WriteLock> {
        let path = data_dir.join(LOCK_FILE);

        for attempt in 0..2 {
            match fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
            {
                Ok(mut file) => {
                    let _ = write!(file, "{}", std::process::id());
                    return Ok(WriteLock { path });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if attempt == 0 && Self::owner_is_dead(&path) {
                        let _ = fs::remove_file(&path);
                        continue;
                    }
                    return Err(VaultError::Conflict(path));
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(VaultError::Conflict(path))
    }

    /// True when the pid recorded in the lockfile no longer exists.
    /// An unreadable or malformed lockfile counts as stale.
    fn owner_is_dead(path: &Path) -> bool {
        let pid = match fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse::<i32>().ok())
        {
            Some(pid) if pid > 0 => pid,
            _ => return true,
        };

        #[cfg(unix)]
        unsafe {
            libc::kill(pid, 0) != 0
                && std::io::Error::last_os_error().raw_os_error() == Some(libc::ESRCH)
        }
        #[cfg(not(unix))]
        false
    }
}

impl Drop for WriteLock {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}
