//! `agent` (hidden) — run as the unlock agent for a vault.
//!
//! Spawned by the client stub; not meant to be invoked by hand.

use std::time::Duration;

use crate::agent::Agent;
use crate::cli::{vault_path, Cli};
use crate::config::Settings;
use crate::errors::Result;

/// Execute the `agent` command.
pub fn execute(cli: &Cli) -> Result<()> {
    let settings = Settings::load()?;
    let path = vault_path(cli, &settings)?;

    Agent::new(&path)?
        .idle_lock_after(Duration::from_secs(settings.agent_idle_lock_secs))
        .serve()
}
