//! `restore` — un-trash items.

use crate::cli::{open_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `restore` command.
pub fn execute(cli: &Cli, pattern: &str) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_vault(&path)?;

    let items = vault.lookup(pattern);
    if items.is_empty() {
        return Err(VaultError::NotFound(pattern.to_string()));
    }

    for item in items {
        if !item.trashed {
            output::info(&format!("'{}' is not in the trash", item.title));
            continue;
        }
        // Work on the full item file, not the index view.
        let mut item = vault.load_item(&item.uuid)?;
        vault.restore(&mut item)?;
        output::success(&format!("Restored '{}'", item.title));
    }
    Ok(())
}
