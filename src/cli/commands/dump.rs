//! `mfavault dump-secrets-unencrypted`: print the whole vault as JSON.

use crate::config::Config;
use crate::errors::{Result, VaultError};
use crate::vault::Vault;

/// Execute the `dump-secrets-unencrypted` command.
pub fn execute(config: &Config) -> Result<()> {
    let vault = Vault::open(config, false)?;
    let secrets = vault.get_secrets()?;

    let json = serde_json::to_string_pretty(&secrets)
        .map_err(|e| VaultError::SerializationError(format!("dump: {e}")))?;
    println!("{json}");
    Ok(())
}
