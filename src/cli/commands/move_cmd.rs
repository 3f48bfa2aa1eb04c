//! `move` — file items under a folder item (or under none).

use crate::cli::{open_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `move` command.
pub fn execute(cli: &Cli, item_pattern: &str, folder_pattern: Option<&str>) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_vault(&path)?;

    let folder_uuid = match folder_pattern {
        Some(p) => vault.lookup_single(p)?.uuid,
        None => String::new(),
    };

    let items = vault.lookup(item_pattern);
    if items.is_empty() {
        return Err(VaultError::NotFound(item_pattern.to_string()));
    }

    for item in items {
        let mut full = vault.load_item(&item.uuid)?;
        full.folder_uuid = folder_uuid.clone();
        vault.save(&full)?;
        output::success(&format!("Moved '{}'", full.title));
    }
    Ok(())
}
