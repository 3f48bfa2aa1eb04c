//! `add-field` — add or update a field in an item's sections.

use crate::cli::{open_unlocked_vault, output, prompt_password, vault_path, Cli};
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::{FieldKind, FieldValue, ItemField, ItemSection};

/// Execute the `add-field` command.
pub fn execute(cli: &Cli, pattern: &str) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;
    let mut vault = open_unlocked_vault(&path)?;

    let mut item = vault.lookup_single(pattern)?;
    let mut content = vault.content(&item)?;

    // Pick or create a section.
    for (i, section) in content.sections.iter().enumerate() {
        println!("{} : {}", i + 1, section.title);
    }
    let answer = prompt_text("Section number (or title of a new section)")?;
    let section = match answer.parse::<usize>() {
        Ok(n) if n >= 1 && n <= content.sections.len() => &mut content.sections[n - 1],
        Ok(_) => return Err(VaultError::NotFound(format!("section {answer}"))),
        Err(_) => {
            content.sections.push(ItemSection {
                name: answer.clone(),
                title: answer,
                fields: Vec::new(),
            });
            content.sections.last_mut().expect("just pushed")
        }
    };

    // Pick or create a field within it.
    for (i, field) in section.fields.iter().enumerate() {
        println!("{} : {}", i + 1, field.title);
    }
    let answer = prompt_text("Field number (or title of a new field)")?;
    let field = match answer.parse::<usize>() {
        Ok(n) if n >= 1 && n <= section.fields.len() => &mut section.fields[n - 1],
        Ok(_) => return Err(VaultError::NotFound(format!("field {answer}"))),
        Err(_) => {
            section.fields.push(ItemField {
                name: answer.clone(),
                title: answer,
                kind: FieldKind::String,
                value: None,
            });
            section.fields.last_mut().expect("just pushed")
        }
    };

    let input = if field.kind == FieldKind::Concealed {
        prompt_password(&field.title)?.to_string()
    } else {
        prompt_text(&format!("{} ({})", field.title, field.kind.as_str()))?
    };
    field.value = Some(FieldValue::from_input(field.kind, &input)?);

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
