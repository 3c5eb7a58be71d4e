//! Configuration: the on-disk `Settings` file and the immutable `Config`
//! value that every component receives at construction time.

pub mod settings;

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::errors::{Result, VaultError};
use crate::password::PasswordSource;

pub use settings::Settings;

/// Environment variable that relocates the data directory.
pub const HOME_ENV: &str = "MFAVAULT_HOME";

/// Name of the per-user data directory under `$HOME`.
const DATA_DIR_NAME: &str = ".mfavault";

/// Everything one invocation needs to know, resolved once.
#[derive(Debug, Clone)]
pub struct Config {
    pub vault_path: PathBuf,
    pub socket_path: PathBuf,
    /// Open the vault in-process instead of going through the agent.
    pub no_cache: bool,
    pub server_log_file: Option<PathBuf>,
    /// Poll window for a freshly spawned agent.
    pub connect_timeout: Duration,
    pub password_source: PasswordSource,
}

impl Config {
    /// A config with default behaviour for the given vault and socket.
    pub fn new(vault_path: impl Into<PathBuf>, socket_path: impl Into<PathBuf>) -> Self {
        Self {
            vault_path: vault_path.into(),
            socket_path: socket_path.into(),
            no_cache: false,
            server_log_file: None,
            connect_timeout: Duration::from_millis(Settings::default().connect_timeout_ms),
            password_source: PasswordSource::default(),
        }
    }

    /// Build a config from settings, resolving default paths in `data_dir`.
    pub fn from_settings(settings: &Settings, data_dir: &Path) -> Self {
        Self {
            vault_path: settings.vault_path(data_dir),
            socket_path: settings.socket_path(data_dir),
            no_cache: settings.no_cache,
            server_log_file: settings.server_log_file.clone(),
            connect_timeout: Duration::from_millis(settings.connect_timeout_ms),
            password_source: PasswordSource::default(),
        }
    }
}

/// Resolve the data directory: `$MFAVAULT_HOME`, else `$HOME/.mfavault`.
pub fn data_dir() -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(HOME_ENV).filter(|d| !d.is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    dirs::home_dir()
        .map(|home| home.join(DATA_DIR_NAME))
        .ok_or_else(|| VaultError::ConfigError("cannot determine the home directory".into()))
}

/// Create the data directory (owner-only on Unix) if it is missing.
pub fn ensure_dir(dir: &Path) -> Result<()> {
    if dir.exists() {
        return Ok(());
    }
    std::fs::create_dir_all(dir)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(dir, std::fs::Permissions::from_mode(0o700))?;
    }

    Ok(())
}
