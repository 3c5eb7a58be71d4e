//! `mfavault add`: store a client's TOTP secret.

use crate::cli::output;
use crate::config::Config;
use crate::errors::{Result, VaultError};
use crate::password::read_client_secret;
use crate::totp;
use crate::vault::{secrets, Vault};

/// Execute the `add` command.
///
/// Creates the vault on first use.  An existing client ID is only replaced
/// with `overwrite`.
pub fn execute(
    config: &Config,
    client_id: &str,
    secret_spec: Option<&str>,
    overwrite: bool,
) -> Result<()> {
    secrets::validate_client_id(client_id)?;

    let mut vault = Vault::open(config, true)?;

    // Fail before asking for a secret the user would have to type for nothing.
    if !overwrite {
        match vault.get_secret(client_id) {
            Ok(_) => return Err(VaultError::ClientAlreadyExists(client_id.to_string())),
            Err(VaultError::ClientNotFound(_)) => {}
            Err(e) => return Err(e),
        }
    }

    let secret = read_client_secret(secret_spec, client_id)?;
    let secret = secret.trim();
    totp::decode_secret(secret)?;

    vault.add_client(client_id, secret, overwrite)?;

    output::success(&format!("Added client '{client_id}'"));
    Ok(())
}
