//! `set-password` — change the vault's master password.
//!
//! Rewraps the level keys in place; item files are untouched, and a
//! running agent stays valid because the level keys themselves never
//! change.

use crate::cli::{open_vault, output, prompt_new_password, prompt_password, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `set-password` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_vault(&path)?;

    let old_password = prompt_password("Current master password")?;
    let new_password = prompt_new_password("New master password")?;

    match vault.set_master_password(&old_password, &new_password) {
        Ok(()) => {}
        Err(VaultError::DecryptError) => {
            output::error("Incorrect password");
            std::process::exit(1);
        }
        Err(e) => return Err(e),
    }

    output::success("Master password updated.");
    output::tip(
        "Other applications sharing this vault will expect the old password \
         until they next sync.",
    );
    Ok(())
}
