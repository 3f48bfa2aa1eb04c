//! `list-folder` — list the items filed under a folder item.

use crate::cli::{open_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `list-folder` command.
pub fn execute(cli: &Cli, pattern: &str) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let vault = open_vault(&path)?;

    let folder = vault.lookup_single(pattern)?;
    let items: Vec<_> = vault
        .list_items()
        .into_iter()
        .filter(|item| item.folder_uuid == folder.uuid)
        .collect();

    output::info(&format!("Folder '{}'", folder.title));
    output::print_items_table(&items);
    Ok(())
}
