//! `mfavault start-server`, `stop-server` and the hidden `_run_server`.

use crate::agent::{server, ConnectionManager};
use crate::cli::output;
use crate::config::Config;
use crate::crypto::EncryptionKey;
use crate::errors::Result;
use crate::logging;

/// Execute the `start-server` command.
pub fn start(config: &Config) -> Result<()> {
    ConnectionManager::from_config(config)?.start_server()?;
    output::success(&format!(
        "Agent is serving {}",
        config.vault_path.display()
    ));
    Ok(())
}

/// Execute the `stop-server` command.  Does nothing if no agent runs.
pub fn stop(config: &Config) -> Result<()> {
    ConnectionManager::from_config(config)?.stop_server()
}

/// Read the vault key the launcher piped to the hidden `_run_server`.
pub fn read_key() -> Result<EncryptionKey> {
    server::read_key(std::io::stdin().lock())
}

/// Execute the hidden `_run_server` command: serve `key`'s vault until
/// stopped.
pub fn run(config: &Config, key: EncryptionKey) -> Result<()> {
    logging::init_agent(config.server_log_file.as_deref())?;
    server::run(&config.socket_path, &config.vault_path, key)
}
