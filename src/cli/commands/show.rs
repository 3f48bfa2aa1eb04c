//! `show` / `show-json` — display decrypted item details.

use crate::cli::{open_unlocked_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::Result;
use crate::vault::{Item, Vault};

/// Execute the `show` (or `show-json` when `as_json`) command.
pub fn execute(cli: &Cli, pattern: &str, as_json: bool) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let vault = open_unlocked_vault(&path)?;

    let items = vault.lookup(pattern);
    if items.is_empty() {
        output::warning("No matching items.");
        return Ok(());
    }

    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            println!();
        }
        if as_json {
            show_json(&vault, item)?;
        } else {
            show_item(&vault, item)?;
        }
    }
    Ok(())
}

fn show_item(vault: &Vault, item: &Item) -> Result<()> {
    println!("{} ({})", item.title, item.type_display_name());
    println!("  ID: {}", item.uuid);
    println!("  Updated: {}", output::format_time(item.display_time()));

    if !item.folder_uuid.is_empty() {
        // A dangling folder reference is worth a warning, never an error.
        match vault.load_item(&item.folder_uuid) {
            Ok(folder) => println!("  Folder: {}", folder.title),
            Err(_) => output::warning(&format!(
                "folder '{}' referenced by '{}' does not exist",
                item.folder_uuid, item.title
            )),
        }
    }

    println!();
    print!("{}", vault.content(item)?);
    Ok(())
}

fn show_json(vault: &Vault, item: &Item) -> Result<()> {
    println!("{}: {}: {}", item.title, item.uuid, item.contents_hash);
    println!("{}", vault.content_json(item)?);
    Ok(())
}
