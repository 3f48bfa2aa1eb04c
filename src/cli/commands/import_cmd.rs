//! `import` — add an item from an exported JSON file.

use std::path::Path;

use crate::cli::commands::export::ExportedItem;
use crate::cli::{open_unlocked_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `import` command.
pub fn execute(cli: &Cli, file: &Path) -> Result<()> {
    let bytes = std::fs::read(file)?;
    let exported: ExportedItem = serde_json::from_slice(&bytes)
        .map_err(|e| VaultError::Serialization(format!("{}: {e}", file.display())))?;

    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_unlocked_vault(&path)?;

    let item = vault.add_item(&exported.title, &exported.item_type, &exported.content)?;
    output::success(&format!("Imported item '{}' ({})", item.title, item.uuid));
    Ok(())
}
