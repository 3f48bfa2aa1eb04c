//! `copy` — copy a field value to the clipboard.
//!
//! The field pattern is matched against section fields, then web form
//! fields, then URL labels, the way item patterns match titles.

use crate::cli::{open_unlocked_vault, output, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};

/// Execute the `copy` command.
pub fn execute(cli: &Cli, pattern: &str, field_pattern: Option<&str>) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let vault = open_unlocked_vault(&path)?;

    let item = vault.lookup_single(pattern)?;
    let content = vault.content(&item)?;
    let field_pattern = field_pattern.unwrap_or("password");

    let (label, value) = if let Some(field) = content.field_by_pattern(field_pattern) {
        (field.title.clone(), field.value_string())
    } else if let Some(field) = content.form_field_by_pattern(field_pattern) {
        (field.name.clone(), field.value.clone())
    } else if let Some(url) = content.url_by_pattern(field_pattern) {
        (url.label.clone(), url.url.clone())
    } else {
        return Err(VaultError::NotFound(format!(
            "field matching '{field_pattern}' in '{}'",
            item.title
        )));
    };

    if value.is_empty() {
        return Err(VaultError::NotFound(format!(
            "non-empty field matching '{field_pattern}' in '{}'",
            item.title
        )));
    }

    let mut clipboard = arboard::Clipboard::new()
        .map_err(|e| VaultError::CommandFailed(format!("clipboard unavailable: {e}")))?;
    clipboard
        .set_text(value)
        .map_err(|e| VaultError::CommandFailed(format!("clipboard write: {e}")))?;

    output::success(&format!("Copied '{label}' to clipboard for '{}'", item.title));
    Ok(())
}
