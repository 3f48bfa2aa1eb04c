//! `add` — create a new item from interactive prompts.

use crate::cli::commands::gen_password;
use crate::cli::{open_unlocked_vault, output, prompt_password, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::{type_for_alias, ItemContent, ItemUrl, WebFormField, ITEM_TYPES};

/// Execute the `add` command.
pub fn execute(cli: &Cli, type_alias: &str, title: &str) -> Result<()> {
    let type_name = type_for_alias(type_alias).ok_or_else(|| {
        let aliases: Vec<&str> = ITEM_TYPES.iter().map(|(_, _, a)| *a).collect();
        VaultError::CommandFailed(format!(
            "unknown item type '{type_alias}' (one of: {})",
            aliases.join(", ")
        ))
    })?;

    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_unlocked_vault(&path)?;

    let content = if type_name == "webforms.WebForm" {
        prompt_login_content()?
    } else {
        prompt_notes_content()?
    };

    let item = vault.add_item(title, type_name, &content)?;
    output::success(&format!("Added new item '{}' ({})", item.title, item.uuid));
    Ok(())
}

/// Username, password, and URL for a login item.  Entering `-` for the
/// password generates a random one.
fn prompt_login_content() -> Result<ItemContent> {
    let username = prompt_text("Username")?;
    let password = prompt_password("Password (or '-' for a random one)")?;
    let password = if *password == "-" {
        let generated = gen_password::generate(12);
        output::info("(random new password generated)");
        generated
    } else {
        password.to_string()
    };
    let url = prompt_text("Website URL")?;

    Ok(ItemContent {
        form_fields: vec![
            WebFormField {
                value: username,
                id: String::new(),
                name: "username".into(),
                field_type: "T".into(),
                designation: "username".into(),
            },
            WebFormField {
                value: password,
                id: String::new(),
                name: "password".into(),
                field_type: "P".into(),
                designation: "password".into(),
            },
        ],
        urls: if url.is_empty() {
            Vec::new()
        } else {
            vec![ItemUrl {
                label: "website".into(),
                url,
            }]
        },
        ..ItemContent::default()
    })
}

fn prompt_notes_content() -> Result<ItemContent> {
    Ok(ItemContent {
        notes: prompt_text("Notes (leave empty for none)")?,
        ..ItemContent::default()
    })
}

fn prompt_text(prompt: &str) -> Result<String> {
    dialoguer::Input::<String>::new()
        .with_prompt(prompt)
        .allow_empty(true)
        .interact_text()
        .map_err(|e| VaultError::CommandFailed(format!("prompt: {e}")))
}
