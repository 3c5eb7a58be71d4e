//! `mfavault rename`: give a client a new ID.

use crate::cli::output;
use crate::config::Config;
use crate::errors::Result;
use crate::vault::Vault;

/// Execute the `rename` command.
pub fn execute(config: &Config, old_id: &str, new_id: &str) -> Result<()> {
    let mut vault = Vault::open(config, false)?;
    vault.rename_client(old_id, new_id)?;

    output::success(&format!("Renamed client '{old_id}' to '{new_id}'"));
    Ok(())
}
