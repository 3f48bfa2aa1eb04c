//! `set-vault` — remember which vault the other commands operate on.

use std::path::Path;

use crate::cli::output;
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::VaultStore;

/// Execute the `set-vault` command.
pub fn execute(path: &Path) -> Result<()> {
    // Validate before persisting so a typo doesn't wedge the config.
    VaultStore::check_vault(path)?;

    let mut settings = Settings::load()?;
    settings.vault = Some(path.to_path_buf());
    settings.save()?;

    output::success(&format!("Using the vault at {}", path.display()));
    Ok(())
}
