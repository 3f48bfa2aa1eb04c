//! `export` — write an item's decrypted content to a JSON file.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::cli::{open_unlocked_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::ItemContent;

/// The plain JSON envelope used by `export` and `import`.
#[derive(Debug, Serialize, Deserialize)]
pub struct ExportedItem {
    pub title: String,
    #[serde(rename = "type")]
    pub item_type: String,
    pub content: ItemContent,
}

/// Execute the `export` command.
pub fn execute(cli: &Cli, pattern: &str, file: &Path) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let vault = open_unlocked_vault(&path)?;

    let item = vault.lookup_single(pattern)?;
    let exported = ExportedItem {
        title: item.title.clone(),
        item_type: item.type_name.clone(),
        content: vault.content(&item)?,
    };

    let json = serde_json::to_string_pretty(&exported)
        .map_err(|e| VaultError::Serialization(e.to_string()))?;
    std::fs::write(file, json)?;

    output::success(&format!("Exported '{}' to {}", item.title, file.display()));
    Ok(())
}
