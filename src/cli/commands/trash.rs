//! `trash` — tombstone items.
//!
//! Trashing is lossy by design: the encrypted content, the contents hash,
//! and the original type are all discarded.

use crate::cli::{confirm, open_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `trash` command.
pub fn execute(cli: &Cli, pattern: &str, force: bool) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_vault(&path)?;

    let items = vault.lookup(pattern);
    if items.is_empty() {
        return Err(VaultError::NotFound(pattern.to_string()));
    }

    for item in items {
        if item.trashed {
            output::info(&format!("'{}' is already in the trash", item.title));
            continue;
        }
        if !force
            && !confirm(&format!(
                "Send '{}' to the trash? Its content will be discarded",
                item.title
            ))?
        {
            continue;
        }
        // Work on the full item file, not the index view.
        let mut item = vault.load_item(&item.uuid)?;
        vault.trash(&mut item)?;
        output::success(&format!("Trashed '{}'", item.title));
    }
    Ok(())
}
