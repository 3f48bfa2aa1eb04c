//! `new` — create a vault with fresh security-level keys.

use std::path::PathBuf;

use crate::cli::{output, prompt_new_password, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::format::VAULT_EXT;
use crate::vault::Vault;

/// Execute the `new` command.
pub fn execute(cli: &Cli, path: Option<&PathBuf>) -> Result<()> {
    let settings = Settings::load()?;

    let mut path = path
        .cloned()
        .or_else(|| cli.vault.clone())
        .ok_or_else(|| VaultError::CommandFailed("no vault path given".into()))?;
    if !path.to_string_lossy().ends_with(VAULT_EXT) {
        path = PathBuf::from(format!("{}{VAULT_EXT}", path.display()));
    }

    output::info(&format!("Creating new vault at {}", path.display()));
    let password = prompt_new_password("Master password")?;

    let vault = Vault::create(&path, &password, settings.pbkdf2_iterations)?;

    let hint = dialoguer::Input::<String>::new()
        .with_prompt("Password hint (leave empty for none)")
        .allow_empty(true)
        .interact_text()
        .map_err(|e| VaultError::CommandFailed(format!("hint prompt: {e}")))?;
    if !hint.is_empty() {
        vault.set_hint(&hint)?;
    }

    output::success(&format!("Vault created at {}", path.display()));
    output::tip("Run `set-vault <path>` to make it the default vault.");
    Ok(())
}
