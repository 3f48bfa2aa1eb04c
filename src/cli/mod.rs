//! CLI module — Clap argument parser, output helpers, and command
//! implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;
use zeroize::Zeroizing;

use crate::agent::AgentClient;
use crate::config::Settings;
use crate::errors::{Result, VaultError};
use crate::vault::Vault;

/// AgileVault CLI: manage 1Password Agile Keychain vaults.
#[derive(Parser)]
#[command(
    name = "agilevault",
    about = "Manage encrypted Agile Keychain password vaults",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Vault path (overrides the one configured with set-vault)
    #[arg(long, global = true)]
    pub vault: Option<PathBuf>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Create a new vault
    New {
        /// Vault path (.agilekeychain is appended if missing)
        path: Option<PathBuf>,
    },

    /// Display info about the current vault
    Info,

    /// List items in the vault
    List {
        /// Match part of a title, a uuid prefix, or a type alias
        pattern: Option<String>,
    },

    /// List items in a folder
    #[command(name = "list-folder")]
    ListFolder {
        /// Folder pattern
        pattern: String,
    },

    /// Display the details of the given item
    Show {
        /// Item pattern
        pattern: String,
    },

    /// Show the raw decrypted JSON for the given item
    #[command(name = "show-json")]
    ShowJson {
        /// Item pattern
        pattern: String,
    },

    /// Add a new item to the vault
    Add {
        /// Item type alias (login, card, note, pass, folder, ...)
        #[arg(value_name = "type")]
        item_type: String,
        /// Item title
        title: String,
    },

    /// Add or update a field in an item
    #[command(name = "add-field")]
    AddField {
        /// Item pattern
        pattern: String,
    },

    /// Update an existing item in the vault
    Update {
        /// Item pattern
        pattern: String,
    },

    /// Remove items from the vault matching the given pattern
    Remove {
        /// Item pattern
        pattern: String,
        /// Skip confirmation prompts
        #[arg(short, long)]
        force: bool,
    },

    /// Move items to the trash
    Trash {
        /// Item pattern
        pattern: String,
        /// Skip confirmation prompts
        #[arg(short, long)]
        force: bool,
    },

    /// Restore items from the trash
    Restore {
        /// Item pattern
        pattern: String,
    },

    /// Rename an item in the vault
    Rename {
        /// Item pattern
        pattern: String,
        /// New title
        new_title: String,
    },

    /// Copy a field from the given item to the clipboard
    Copy {
        /// Item pattern
        pattern: String,
        /// Field pattern (defaults to 'password')
        field: Option<String>,
    },

    /// Move items to a folder
    #[command(name = "move")]
    Move {
        /// Item pattern
        item_pattern: String,
        /// Folder pattern (omit to move out of any folder)
        folder_pattern: Option<String>,
    },

    /// Import an item from a JSON file
    Import {
        /// Path to the file to import
        path: PathBuf,
    },

    /// Export an item to a JSON file
    Export {
        /// Item pattern
        pattern: String,
        /// Output path
        path: PathBuf,
    },

    /// Change the master password for the vault
    #[command(name = "set-password")]
    SetPassword,

    /// Set the path to the vault
    #[command(name = "set-vault")]
    SetVault {
        /// Vault path
        path: PathBuf,
    },

    /// Generate a new random password
    #[command(name = "gen-password")]
    GenPassword,

    /// Lock the vault agent, wiping its keys
    Lock,

    /// Run as the unlock agent for a vault (started automatically)
    #[command(hide = true)]
    Agent,
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Prompt for the master password.
///
/// Returns `Zeroizing<String>` so the password is wiped from memory on
/// drop.
pub fn prompt_password(prompt: &str) -> Result<Zeroizing<String>> {
    let pw = dialoguer::Password::new()
        .with_prompt(prompt)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
    Ok(Zeroizing::new(pw))
}

/// Prompt for a new password with confirmation.
pub fn prompt_new_password(prompt: &str) -> Result<Zeroizing<String>> {
    let first = prompt_password(prompt)?;
    let second = prompt_password(&format!("{prompt} (again)"))?;
    if *first != *second {
        return Err(VaultError::PasswordMismatch);
    }
    Ok(first)
}

/// Resolve the vault path: `--vault` wins, then the configured one.
pub fn vault_path(cli: &Cli, settings: &Settings) -> Result<PathBuf> {
    cli.vault
        .clone()
        .or_else(|| settings.vault.clone())
        .ok_or_else(|| {
            VaultError::CommandFailed(
                "no vault configured; run `set-vault <path>` or pass --vault".into(),
            )
        })
}

/// Open the vault and surface any reconciliation warnings.
pub fn open_vault(path: &std::path::Path) -> Result<Vault> {
    let vault = Vault::open(path)?;
    for warning in vault.warnings() {
        output::warning(warning);
    }
    Ok(vault)
}

/// Connect to the vault's agent, unlocking it if needed, and refresh its
/// idle timer.  The returned client is ready to decrypt.
pub fn connect_unlocked(vault: &Vault) -> Result<AgentClient> {
    let client = AgentClient::connect(vault.path())?;

    if client.is_locked()? {
        let password = prompt_password("Master password")?;
        match client.unlock(&password) {
            Ok(()) => {}
            Err(VaultError::DecryptError) => {
                output::error("Incorrect password");
                std::process::exit(1);
            }
            Err(e) => return Err(e),
        }
    }

    client.refresh_access()?;
    Ok(client)
}

/// Open the vault with an unlocked agent attached as its cryptor.
pub fn open_unlocked_vault(path: &std::path::Path) -> Result<Vault> {
    let mut vault = open_vault(path)?;
    let client = connect_unlocked(&vault)?;
    vault.set_cryptor(Box::new(client));
    Ok(vault)
}

/// Ask a yes/no question, defaulting to no.
pub fn confirm(prompt: &str) -> Result<bool> {
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .map_err(|e| VaultError::CommandFailed(format!("confirmation prompt: {e}")))
}
