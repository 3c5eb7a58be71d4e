//! In-process vault store.
//!
//! `LocalStore` owns the decrypted secret map and the key for one vault
//! file.  CLI invocations with `--no-cache` use it directly; the agent
//! keeps exactly one of these alive for its whole lifetime.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::debug;

use crate::config;
use crate::crypto::{decrypt, derive_key, encrypt, EncryptionKey};
use crate::errors::{Result, VaultError};
use crate::password::{create_password, PasswordReader};

use super::secrets::{self, SecretMap};

/// The decrypted vault of one file.
pub struct LocalStore {
    /// Path to the vault file on disk.
    path: PathBuf,

    /// Last persisted map.
    secrets: SecretMap,

    /// Key the file is encrypted with (zeroized on drop).
    key: EncryptionKey,
}

impl LocalStore {
    // ------------------------------------------------------------------
    // Construction
    // ------------------------------------------------------------------

    /// Open the vault at `path`, asking `reader` for the password.
    ///
    /// A missing file is created with a new, confirmed password when
    /// `create` is set, and persisted before this returns.  A wrong
    /// password is asked for again until it is right or the user cancels.
    pub fn open(path: &Path, reader: &dyn PasswordReader, create: bool) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                if !create {
                    return Err(VaultError::VaultNotFound(path.to_path_buf()));
                }
                let password = create_password(reader)?;
                return Self::create(path, derive_key(password.as_bytes()));
            }
            Err(e) => return Err(e.into()),
        };

        let mut prompt = "Password";
        loop {
            let password = reader.read_password(prompt)?;
            let key = derive_key(password.as_bytes());
            match decrypt(&data, &key) {
                Ok(secrets) => {
                    debug!(path = %path.display(), clients = secrets.len(), "vault unlocked");
                    return Ok(Self {
                        path: path.to_path_buf(),
                        secrets,
                        key,
                    });
                }
                Err(e) if e.is_invalid_password() && reader.is_interactive() => {
                    prompt = "Invalid password. Try again";
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Create an empty vault at `path` encrypted with `key`.
    pub fn create(path: &Path, key: EncryptionKey) -> Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            config::ensure_dir(parent)?;
        }

        let store = Self {
            path: path.to_path_buf(),
            secrets: SecretMap::new(),
            key,
        };
        store.save()?;
        debug!(path = %path.display(), "created new vault");
        Ok(store)
    }

    /// Open an existing vault with an already-derived key.  Never prompts.
    pub fn open_with_key(path: &Path, key: EncryptionKey) -> Result<Self> {
        let data = match fs::read(path) {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(VaultError::VaultNotFound(path.to_path_buf()));
            }
            Err(e) => return Err(e.into()),
        };
        let secrets = decrypt(&data, &key)?;
        Ok(Self {
            path: path.to_path_buf(),
            secrets,
            key,
        })
    }

    // ------------------------------------------------------------------
    // Capability set
    // ------------------------------------------------------------------

    /// A copy of the whole map; changing it does not touch the store.
    pub fn get_secrets(&self) -> SecretMap {
        self.secrets.clone()
    }

    /// Apply `modify` to a scratch copy and persist it.
    ///
    /// If `modify` or the save fails, neither the file nor the in-memory
    /// map changes.
    pub fn modify_secrets<F, R>(&mut self, modify: F) -> Result<R>
    where
        F: FnOnce(&mut SecretMap) -> Result<R>,
    {
        let mut scratch = self.secrets.clone();
        let out = modify(&mut scratch)?;
        write_vault(&self.path, &scratch, &self.key)?;
        self.secrets = scratch;
        Ok(out)
    }

    /// Replace the whole map and persist it.
    pub fn store_secrets(&mut self, secrets: SecretMap) -> Result<()> {
        self.modify_secrets(|current| {
            *current = secrets;
            Ok(())
        })
    }

    /// Re-encrypt the full map and replace the vault file.
    pub fn save(&self) -> Result<()> {
        write_vault(&self.path, &self.secrets, &self.key)
    }

    // ------------------------------------------------------------------
    // Single-client operations
    // ------------------------------------------------------------------

    pub fn get_secret(&self, client_id: &str) -> Result<String> {
        secrets::get_secret(&self.secrets, client_id)
    }

    pub fn list_clients(&self) -> Vec<String> {
        secrets::list_clients(&self.secrets)
    }

    pub fn add_client(&mut self, client_id: &str, secret: &str, overwrite: bool) -> Result<()> {
        self.modify_secrets(|map| secrets::add_client(map, client_id, secret, overwrite))
    }

    /// Removing an absent client succeeds without rewriting the file.
    pub fn remove_client(&mut self, client_id: &str) -> Result<()> {
        if !self.secrets.contains_key(client_id) {
            return Ok(());
        }
        self.modify_secrets(|map| {
            secrets::remove_client(map, client_id);
            Ok(())
        })
    }

    pub fn rename_client(&mut self, old_id: &str, new_id: &str) -> Result<()> {
        self.modify_secrets(|map| secrets::rename_client(map, old_id, new_id))
    }

    // ------------------------------------------------------------------
    // Accessors
    // ------------------------------------------------------------------

    /// Returns the path to the vault file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the key the vault is encrypted with.
    pub fn key(&self) -> &EncryptionKey {
        &self.key
    }
}

/// Encrypt `secrets` and replace the file at `path`.
///
/// The blob goes to a sibling temp file (mode 0600) which is then renamed
/// over the target, so a reader never sees a half-written vault.
fn write_vault(path: &Path, secrets: &SecretMap, key: &EncryptionKey) -> Result<()> {
    let blob = encrypt(secrets, key)?;

    let parent = path.parent().unwrap_or(Path::new("."));
    let tmp_path = parent.join(format!(
        ".{}.tmp",
        path.file_name().unwrap_or_default().to_string_lossy()
    ));

    let mut options = fs::OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }

    let mut file = options.open(&tmp_path)?;
    file.write_all(&blob)?;
    file.sync_all()?;
    drop(file);

    fs::rename(&tmp_path, path)?;
    Ok(())
}
