use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// User-level configuration, loaded from `$HOME/.1pass`.
///
/// Every field has a sensible default so the tool works with no config
/// file at all; `set-vault` creates the file on first use.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Path of the configured vault, if one has been set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vault: Option<PathBuf>,

    /// PBKDF2 iteration count for newly created vaults.
    #[serde(default = "default_pbkdf2_iterations")]
    pub pbkdf2_iterations: u32,

    /// Seconds of inactivity after which the agent relocks its keys.
    #[serde(default = "default_agent_idle_lock_secs")]
    pub agent_idle_lock_secs: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_pbkdf2_iterations() -> u32 {
    crate::crypto::keystore::DEFAULT_ITERATIONS
}

fn default_agent_idle_lock_secs() -> u64 {
    crate::agent::DEFAULT_IDLE_LOCK.as_secs()
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault: None,
            pbkdf2_iterations: default_pbkdf2_iterations(),
            agent_idle_lock_secs: default_agent_idle_lock_secs(),
        }
    }
}

impl Settings {
    /// Name of the config file in the user's home directory.
    const FILE_NAME: &'static str = ".1pass";

    /// The config file path: `$HOME/.1pass`.
    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| VaultError::Config("cannot determine home directory".into()))?;
        Ok(home.join(Self::FILE_NAME))
    }

    /// Load settings from the default location.
    ///
    /// A missing file yields defaults; a malformed one is an error.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load settings from an explicit path (used by tests).
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        toml::from_str(&contents)
            .map_err(|e| VaultError::Config(format!("failed to parse {}: {e}", path.display())))
    }

    /// Persist the settings to the default location.
    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        let contents = toml::to_string_pretty(self)
            .map_err(|e| VaultError::Config(format!("failed to serialize settings: {e}")))?;
        std::fs::write(path, contents)?;
        Ok(())
    }
}

// ── Tests ────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn default_settings_are_sensible() {
        let s = Settings::default();
        assert!(s.vault.is_none());
        assert_eq!(s.pbkdf2_iterations, 17_000);
        assert_eq!(s.agent_idle_lock_secs, 600);
    }

    #[test]
    fn load_returns_defaults_when_no_config_file() {
        let tmp = TempDir::new().unwrap();
        let settings = Settings::load_from(&tmp.path().join(".1pass")).unwrap();
        assert!(settings.vault.is_none());
    }

    #[test]
    fn save_and_load_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".1pass");

        let settings = Settings {
            vault: Some(PathBuf::from("/vaults/personal.agilekeychain")),
            pbkdf2_iterations: 25_000,
            agent_idle_lock_secs: 120,
        };
        settings.save_to(&path).unwrap();

        let loaded = Settings::load_from(&path).unwrap();
        assert_eq!(
            loaded.vault.as_deref(),
            Some(Path::new("/vaults/personal.agilekeychain"))
        );
        assert_eq!(loaded.pbkdf2_iterations, 25_000);
        assert_eq!(loaded.agent_idle_lock_secs, 120);
    }

    #[test]
    fn load_uses_defaults_for_missing_fields() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".1pass");
        fs::write(&path, "vault = \"/v/a.agilekeychain\"\n").unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert!(settings.vault.is_some());
        assert_eq!(settings.pbkdf2_iterations, 17_000);
    }

    #[test]
    fn load_errors_on_invalid_toml() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join(".1pass");
        fs::write(&path, "not valid {{toml").unwrap();

        assert!(Settings::load_from(&path).is_err());
    }
}
