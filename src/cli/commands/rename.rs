//! `rename` — change an item's title.
//!
//! The contents hash covers the title, so renaming re-encrypts through
//! the agent to keep the hash in step.

use crate::cli::{open_unlocked_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `rename` command.
pub fn execute(cli: &Cli, pattern: &str, new_title: &str) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_unlocked_vault(&path)?;

    let mut item = vault.lookup_single(pattern)?;
    let old_title = item.title.clone();
    vault.rename(&mut item, new_title)?;

    output::success(&format!("Renamed '{old_title}' to '{new_title}'"));
    Ok(())
}
