//! Vault module: the encrypted TOTP seed store.
//!
//! This module provides:
//! - `SecretMap` and the single-client rules on it (`secrets`)
//! - `LocalStore`, the in-process store over one vault file (`local`)
//! - `RemoteStore`, the same capabilities served by the agent (`remote`)
//! - `Vault`, which picks one of the two from the configuration

pub mod local;
pub mod remote;
pub mod secrets;

pub use local::LocalStore;
pub use remote::RemoteStore;
pub use secrets::SecretMap;

use crate::agent::ConnectionManager;
use crate::config::Config;
use crate::errors::Result;
use crate::password::reader_for;

/// A vault opened either directly or through the agent.
pub enum Vault {
    Local(LocalStore),
    Remote(RemoteStore),
}

impl Vault {
    /// Open the configured vault.
    ///
    /// `create` allows a missing vault file to be created with a new
    /// password.
    pub fn open(config: &Config, create: bool) -> Result<Self> {
        if config.no_cache {
            let reader = reader_for(&config.password_source);
            let store = LocalStore::open(&config.vault_path, &*reader, create)?;
            return Ok(Vault::Local(store));
        }
        let manager = ConnectionManager::from_config(config)?;
        Ok(Vault::Remote(RemoteStore::open(manager, create)?))
    }

    pub fn get_secrets(&self) -> Result<SecretMap> {
        match self {
            Vault::Local(store) => Ok(store.get_secrets()),
            Vault::Remote(store) => store.get_secrets(),
        }
    }

    pub fn modify_secrets<F, R>(&mut self, modify: F) -> Result<R>
    where
        F: FnOnce(&mut SecretMap) -> Result<R>,
    {
        match self {
            Vault::Local(store) => store.modify_secrets(modify),
            Vault::Remote(store) => store.modify_secrets(modify),
        }
    }

    pub fn get_secret(&self, client_id: &str) -> Result<String> {
        match self {
            Vault::Local(store) => store.get_secret(client_id),
            Vault::Remote(store) => store.get_secret(client_id),
        }
    }

    pub fn list_clients(&self) -> Result<Vec<String>> {
        match self {
            Vault::Local(store) => Ok(store.list_clients()),
            Vault::Remote(store) => store.list_clients(),
        }
    }

    pub fn add_client(&mut self, client_id: &str, secret: &str, overwrite: bool) -> Result<()> {
        match self {
            Vault::Local(store) => store.add_client(client_id, secret, overwrite),
            Vault::Remote(store) => store.add_client(client_id, secret, overwrite),
        }
    }

    pub fn remove_client(&mut self, client_id: &str) -> Result<()> {
        match self {
            Vault::Local(store) => store.remove_client(client_id),
            Vault::Remote(store) => store.remove_client(client_id),
        }
    }

    pub fn rename_client(&mut self, old_id: &str, new_id: &str) -> Result<()> {
        match self {
            Vault::Local(store) => store.rename_client(old_id, new_id),
            Vault::Remote(store) => store.rename_client(old_id, new_id),
        }
    }
}
