//! Item metadata as stored in `<UUID>.1password` files.

use chrono::Utc;
use rand::RngCore;
use serde::{Deserialize, Deserializer, Serialize};

use crate::crypto::SecurityLevel;

/// The type name given to soft-deleted items.  Tombstoning discards the
/// original type along with the encrypted content.
pub const TOMBSTONE_TYPE: &str = "system.Tombstone";

/// A single record in the vault.
///
/// `encrypted` holds the base64 `Salted__` blob of the content; everything
/// else is cleartext metadata mirrored into the index.  `trashed` appears
/// as a bool in item files but as `0`/`1` in the index, so deserialization
/// accepts both.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub uuid: String,
    pub type_name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub location: String,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub folder_uuid: String,
    #[serde(default)]
    pub created_at: i64,
    #[serde(default)]
    pub updated_at: i64,
    #[serde(default, deserialize_with = "bool_or_int")]
    pub trashed: bool,
    #[serde(default = "default_level")]
    pub security_level: SecurityLevel,
    #[serde(default)]
    pub contents_hash: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub open_contents: Option<OpenContents>,
    #[serde(default)]
    pub encrypted: String,
}

/// Cleartext flags stored alongside the encrypted blob.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OpenContents {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    /// "Never" suppresses auto-submit in the original browser extensions.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
}

fn default_level() -> SecurityLevel {
    SecurityLevel::SL5
}

/// Accept `true`/`false` as well as `0`/`1` (older vaults mix both).
fn bool_or_int<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum BoolOrInt {
        Bool(bool),
        Int(i64),
    }
    Ok(match BoolOrInt::deserialize(deserializer)? {
        BoolOrInt::Bool(b) => b,
        BoolOrInt::Int(i) => i != 0,
    })
}

impl Item {
    /// Create a fresh item shell with a new uuid and current timestamps.
    /// New items always use the default security level.
    pub fn new(title: &str, type_name: &str) -> Self {
        let now = Utc::now().timestamp();
        Self {
            uuid: new_item_uuid(),
            type_name: type_name.to_string(),
            title: title.to_string(),
            location: String::new(),
            folder_uuid: String::new(),
            created_at: now,
            updated_at: now,
            trashed: false,
            security_level: SecurityLevel::SL5,
            contents_hash: String::new(),
            open_contents: None,
            encrypted: String::new(),
        }
    }

    pub fn is_tombstone(&self) -> bool {
        self.type_name == TOMBSTONE_TYPE
    }

    /// Human-readable type name, falling back to the raw identifier.
    pub fn type_display_name(&self) -> &str {
        type_display_name(&self.type_name)
    }

    /// The timestamp shown in listings: `updatedAt`, or `createdAt` for
    /// items that were never modified.
    pub fn display_time(&self) -> i64 {
        if self.updated_at != 0 {
            self.updated_at
        } else {
            self.created_at
        }
    }
}

/// 32 uppercase hex chars from 16 random bytes, the uuid style the
/// original applications write.
pub fn new_item_uuid() -> String {
    let mut raw = [0u8; 16];
    rand::rngs::OsRng.fill_bytes(&mut raw);
    raw.iter().map(|b| format!("{b:02X}")).collect()
}

/// Known item types: `(typeName, display name, short alias)`.
///
/// The tombstone type is deliberately absent; it is not addressable by
/// alias and never offered when creating items.
pub const ITEM_TYPES: &[(&str, &str, &str)] = &[
    ("webforms.WebForm", "Login", "login"),
    ("wallet.financial.CreditCard", "Credit Card", "card"),
    ("wallet.financial.BankAccountUS", "Bank Account", "bank"),
    ("passwords.Password", "Password", "pass"),
    ("securenotes.SecureNote", "Secure Note", "note"),
    ("identities.Identity", "Identity", "id"),
    ("system.folder.Regular", "Folder", "folder"),
];

/// Display name for a type, falling back to the raw identifier.
pub fn type_display_name(type_name: &str) -> &str {
    ITEM_TYPES
        .iter()
        .find(|(name, _, _)| *name == type_name)
        .map(|(_, display, _)| *display)
        .unwrap_or(type_name)
}

/// Resolve a short alias (`login`, `note`, …) to its full type name.
pub fn type_for_alias(alias: &str) -> Option<&'static str> {
    ITEM_TYPES
        .iter()
        .find(|(_, _, a)| *a == alias)
        .map(|(name, _, _)| *name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_uuid_is_32_upper_hex() {
        let uuid = new_item_uuid();
        assert_eq!(uuid.len(), 32);
        assert!(uuid
            .chars()
            .all(|c| c.is_ascii_digit() || ('A'..='F').contains(&c)));
        assert_ne!(uuid, new_item_uuid());
    }

    #[test]
    fn trashed_accepts_bool_and_int() {
        let json = r#"{"uuid": "A", "typeName": "webforms.WebForm", "trashed": 1}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert!(item.trashed);

        let json = r#"{"uuid": "A", "typeName": "webforms.WebForm", "trashed": false}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert!(!item.trashed);
    }

    #[test]
    fn missing_security_level_defaults_to_sl5() {
        let json = r#"{"uuid": "A", "typeName": "system.Tombstone"}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.security_level, SecurityLevel::SL5);
        assert!(item.is_tombstone());
    }

    #[test]
    fn alias_lookup() {
        assert_eq!(type_for_alias("login"), Some("webforms.WebForm"));
        assert_eq!(type_for_alias("tombstone"), None);
        assert_eq!(type_display_name("webforms.WebForm"), "Login");
        assert_eq!(type_display_name("custom.Unknown"), "custom.Unknown");
    }
}
