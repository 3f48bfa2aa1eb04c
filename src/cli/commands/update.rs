//! `update` — walk an item's fields, prompting for new values.
//!
//! An empty answer keeps the current value; `x` clears it.

use crate::cli::{open_unlocked_vault, output, prompt_password, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::{FieldKind, FieldValue};

const CLEAR: &str = "x";

/// Execute the `update` command.
pub fn execute(cli: &Cli, pattern: &str) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_unlocked_vault(&path)?;

    let mut item = vault.lookup_single(pattern)?;
    let mut content = vault.content(&item)?;

    output::info(&format!(
        "Updating '{}'. Enter 'x' to clear a value, or leave blank to keep it.",
        item.title
    ));

    for section in &mut content.sections {
        for field in &mut section.fields {
            let answer = if field.kind == FieldKind::Concealed {
                prompt_password(&field.title)?.to_string()
            } else {
                prompt_text(&format!("{} ({})", field.title, field.kind.as_str()))?
            };
            match answer.as_str() {
                "" => {}
                CLEAR => field.value = None,
                _ => field.value = Some(FieldValue::from_input(field.kind, &answer)?),
            }
        }
    }

    for field in &mut content.form_fields {
        let answer = if field.field_type == "P" {
            prompt_password(&field.name)?.to_string()
        } else {
            prompt_text(&format!("{} ({})", field.name, field.field_type))?
        };
        match answer.as_str() {
            "" => {}
            CLEAR => field.value.clear(),
            _ => field.value = answer,
        }
    }

    for url in &mut content.urls {
        let answer = prompt_text(&format!("{} (URL)", url.label))?;
        match answer.as_str() {
            "" => {}
            CLEAR => url.url.clear(),
            _ => url.url = answer,
        }
    }

    vault.set_content(&mut item, &content)?;
    vault.save(&item)?;
    output::success(&format!("Updated '{}'", item.title));
    Ok(())
}

fn prompt_text(prompt: &str) -> Result<String> {
    dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| VaultError::CommandFailed(format!("prompt: {e}")))
}
