//! `lock` — make the agent wipe its unwrapped keys.

use crate::cli::{output, vault_path, Cli};
use crate::agent::AgentClient;
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `lock` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;

    // Only talk to an agent that is already running; locking should never
    // spawn one.
    match AgentClient::dial(&path) {
        Ok(client) => {
            client.lock()?;
            output::success("Vault locked.");
        }
        Err(_) => output::info("No agent is running; the vault is already locked."),
    }
    Ok(())
}
