//! The Agile Keychain vault: on-disk format, item model, and the
//! high-level API the CLI drives.

pub mod content;
pub mod format;
pub mod item;
pub mod store;

pub use content::{
    Address, FieldKind, FieldValue, ItemContent, ItemField, ItemSection, ItemUrl, WebFormField,
};
pub use format::IndexEntry;
pub use item::{new_item_uuid, type_display_name, type_for_alias, Item, OpenContents, ITEM_TYPES, TOMBSTONE_TYPE};
pub use store::{Vault, VaultStore};
