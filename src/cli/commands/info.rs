//! `info` — display facts about the configured vault.

use crate::cli::{open_vault, vault_path, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `info` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let vault = open_vault(&path)?;

    let items = vault.list_items();
    let trashed = items.iter().filter(|i| i.trashed).count();

    println!("Vault path: {}", path.display());
    println!("Items: {} ({} in trash)", items.len(), trashed);
    if let Some(hint) = vault.hint() {
        println!("Password hint: {}", hint.trim());
    }
    Ok(())
}
