//! `mfavault remove`: drop a client from the vault.

use crate::cli::output;
use crate::config::Config;
use crate::errors::Result;
use crate::vault::Vault;

/// Execute the `remove` command.  Removing an unknown client succeeds.
pub fn execute(config: &Config, client_id: &str) -> Result<()> {
    let mut vault = Vault::open(config, false)?;
    vault.remove_client(client_id)?;

    output::success(&format!("Removed client '{client_id}'"));
    Ok(())
}
