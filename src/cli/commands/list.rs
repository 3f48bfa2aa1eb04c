//! `list` — list vault items, optionally filtered by a pattern.

use crate::cli::{open_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `list` command.
pub fn execute(cli: &Cli, pattern: Option<&str>) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let vault = open_vault(&path)?;

    let mut items = match pattern {
        Some(p) => vault.lookup(p),
        None => vault.list_items(),
    };
    items.sort_by(|a, b| a.title.to_lowercase().cmp(&b.title.to_lowercase()));

    output::print_items_table(&items);
    Ok(())
}
