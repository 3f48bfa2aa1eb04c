//! `remove` — permanently delete items.

use crate::cli::{confirm, open_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `remove` command.
pub fn execute(cli: &Cli, pattern: &str, force: bool) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_vault(&path)?;

    let items = vault.lookup(pattern);
    if items.is_empty() {
        return Err(VaultError::NotFound(pattern.to_string()));
    }

    for item in items {
        if !force && !confirm(&format!("Remove '{}'? This cannot be undone", item.title))? {
            continue;
        }
        vault.remove(&item)?;
        output::success(&format!("Removed '{}'", item.title));
    }
    Ok(())
}
