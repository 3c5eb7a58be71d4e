//! Vault access through the caching agent.

use crate::agent::ConnectionManager;
use crate::errors::Result;

use super::secrets::SecretMap;

/// Same capabilities as [`LocalStore`](super::LocalStore), served by the
/// agent.
///
/// Each operation opens its own connection, respawning the agent if it
/// went away in between.
pub struct RemoteStore {
    manager: ConnectionManager,
}

impl RemoteStore {
    /// Make sure an agent is serving the configured vault.
    ///
    /// When `create` is set a missing vault is created (with a new
    /// password) before the agent starts.
    pub fn open(manager: ConnectionManager, create: bool) -> Result<Self> {
        manager.connect(create)?;
        Ok(Self { manager })
    }

    pub fn get_secrets(&self) -> Result<SecretMap> {
        self.manager.call_server(false, |conn| conn.get_secrets())
    }

    /// Fetch the map, apply `modify` locally and send the result back.
    ///
    /// Not atomic across clients: two concurrent callers can overwrite each
    /// other.  The single-client operations below run inside the agent and
    /// do not have this problem.
    pub fn modify_secrets<F, R>(&self, modify: F) -> Result<R>
    where
        F: FnOnce(&mut SecretMap) -> Result<R>,
    {
        self.manager.call_server(false, |conn| {
            let mut secrets = conn.get_secrets()?;
            let out = modify(&mut secrets)?;
            conn.store_secrets(&secrets)?;
            Ok(out)
        })
    }

    pub fn get_secret(&self, client_id: &str) -> Result<String> {
        self.manager
            .call_server(false, |conn| conn.get_secret(client_id))
    }

    pub fn list_clients(&self) -> Result<Vec<String>> {
        self.manager.call_server(false, |conn| conn.list_clients())
    }

    pub fn add_client(&self, client_id: &str, secret: &str, overwrite: bool) -> Result<()> {
        self.manager
            .call_server(false, |conn| conn.add_client(client_id, secret, overwrite))
    }

    pub fn remove_client(&self, client_id: &str) -> Result<()> {
        self.manager
            .call_server(false, |conn| conn.remove_client(client_id))
    }

    pub fn rename_client(&self, old_id: &str, new_id: &str) -> Result<()> {
        self.manager
            .call_server(false, |conn| conn.rename_client(old_id, new_id))
    }
}
