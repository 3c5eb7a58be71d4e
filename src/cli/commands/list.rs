//! `mfavault list`: print every client ID, one per line.

use crate::cli::output;
use crate::config::Config;
use crate::errors::Result;
use crate::vault::Vault;

/// Execute the `list` command.
pub fn execute(config: &Config) -> Result<()> {
    let vault = Vault::open(config, false)?;
    let clients = vault.list_clients()?;

    if clients.is_empty() {
        output::tip("No clients yet. Run `mfavault add <CLIENT_ID>` to add one.");
        return Ok(());
    }

    for client in clients {
        println!("{client}");
    }
    Ok(())
}
