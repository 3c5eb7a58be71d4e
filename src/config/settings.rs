use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};

/// Per-user configuration, loaded from `<data_dir>/config.toml`.
///
/// Every field has a sensible default so mfavault works out-of-the-box
/// without any config file at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Encrypted vault file (default: `<data_dir>/mfavault.vault`).
    #[serde(default)]
    pub vault_path: Option<PathBuf>,

    /// Agent socket (default: `<data_dir>/mfavault.sock`).
    #[serde(default)]
    pub socket_path: Option<PathBuf>,

    /// Skip the caching agent and open the vault directly.
    #[serde(default)]
    pub no_cache: bool,

    /// Where a spawned agent writes its log.
    #[serde(default)]
    pub server_log_file: Option<PathBuf>,

    /// How long to wait for a freshly spawned agent to accept connections.
    #[serde(default = "default_connect_timeout_ms")]
    pub connect_timeout_ms: u64,
}

// ── Serde default helpers ────────────────────────────────────────────

fn default_connect_timeout_ms() -> u64 {
    2_000
}

// ── Implementation ───────────────────────────────────────────────────

impl Default for Settings {
    fn default() -> Self {
        Self {
            vault_path: None,
            socket_path: None,
            no_cache: false,
            server_log_file: None,
            connect_timeout_ms: default_connect_timeout_ms(),
        }
    }
}

impl Settings {
    /// Name of the config file inside the data directory.
    const FILE_NAME: &'static str = "config.toml";

    /// Default vault file name.
    pub const VAULT_FILE: &'static str = "mfavault.vault";

    /// Default socket file name.
    pub const SOCKET_FILE: &'static str = "mfavault.sock";

    /// Load settings from `<data_dir>/config.toml`.
    ///
    /// If the file does not exist, sensible defaults are returned.
    /// If the file exists but cannot be parsed, an error is returned.
    pub fn load(data_dir: &Path) -> Result<Self> {
        let config_path = data_dir.join(Self::FILE_NAME);

        if !config_path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(&config_path)?;

        let settings: Settings = toml::from_str(&contents).map_err(|e| {
            VaultError::ConfigError(format!("Failed to parse {}: {e}", config_path.display()))
        })?;

        Ok(settings)
    }

    /// The configured vault path, or the default inside `data_dir`.
    pub fn vault_path(&self, data_dir: &Path) -> PathBuf {
        self.vault_path
            .clone()
            .unwrap_or_else(|| data_dir.join(Self::VAULT_FILE))
    }

    /// The configured socket path, or the default inside `data_dir`.
    pub fn socket_path(&self, data_dir: &Path) -> PathBuf {
        self.socket_path
            .clone()
            .unwrap_or_else(|| data_dir.join(Self::SOCKET_FILE))
    }
}

// ── Tests ────────────────────────────────────────────────────────────
