//! Wire format between the CLI and the agent.
//!
//! Newline-delimited JSON over the Unix socket: the client writes one
//! [`Request`] per line and reads back exactly one [`Response`] line.  A
//! connection may carry any number of exchanges.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::errors::{Result, VaultError};
use crate::vault::SecretMap;

/// Operations the agent serves.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "op", content = "args", rename_all = "snake_case")]
pub enum Request {
    GetSecrets,
    StoreSecrets {
        secrets: SecretMap,
    },
    GetSecret {
        client_id: String,
    },
    AddClient {
        client_id: String,
        secret: String,
        overwrite: bool,
    },
    RemoveClient {
        client_id: String,
    },
    RenameClient {
        old_id: String,
        new_id: String,
    },
    ListClients,
    Stop,
}

impl Request {
    /// Operation name for logs.  Never includes arguments, which may
    /// carry secrets.
    pub fn name(&self) -> &'static str {
        match self {
            Request::GetSecrets => "get_secrets",
            Request::StoreSecrets { .. } => "store_secrets",
            Request::GetSecret { .. } => "get_secret",
            Request::AddClient { .. } => "add_client",
            Request::RemoveClient { .. } => "remove_client",
            Request::RenameClient { .. } => "rename_client",
            Request::ListClients => "list_clients",
            Request::Stop => "stop",
        }
    }

    /// Whether the request changes the vault.
    pub fn is_mutation(&self) -> bool {
        matches!(
            self,
            Request::StoreSecrets { .. }
                | Request::AddClient { .. }
                | Request::RemoveClient { .. }
                | Request::RenameClient { .. }
        )
    }
}

/// Agent replies.  Business errors are ordinary replies.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "data", rename_all = "snake_case")]
pub enum Response {
    Secrets { secrets: SecretMap },
    Secret { secret: String },
    Clients { clients: Vec<String> },
    Done,
    Error(RemoteError),
}

/// Error classes that survive the trip over the socket.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemoteErrorKind {
    ClientNotFound,
    ClientAlreadyExists,
    InvalidClientId,
    Protocol,
    Other,
}

/// An error reported by the agent.
///
/// For client errors `detail` is the offending client ID, otherwise it is
/// the human-readable message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteError {
    pub kind: RemoteErrorKind,
    pub detail: String,
}

impl From<&VaultError> for RemoteError {
    fn from(err: &VaultError) -> Self {
        let (kind, detail) = match err {
            VaultError::ClientNotFound(id) => (RemoteErrorKind::ClientNotFound, id.clone()),
            VaultError::ClientAlreadyExists(id) => {
                (RemoteErrorKind::ClientAlreadyExists, id.clone())
            }
            VaultError::InvalidClientId => (RemoteErrorKind::InvalidClientId, String::new()),
            VaultError::Protocol(msg) => (RemoteErrorKind::Protocol, msg.clone()),
            other => (RemoteErrorKind::Other, other.to_string()),
        };
        Self { kind, detail }
    }
}

impl From<RemoteError> for VaultError {
    fn from(err: RemoteError) -> Self {
        match err.kind {
            RemoteErrorKind::ClientNotFound => VaultError::ClientNotFound(err.detail),
            RemoteErrorKind::ClientAlreadyExists => VaultError::ClientAlreadyExists(err.detail),
            RemoteErrorKind::InvalidClientId => VaultError::InvalidClientId,
            RemoteErrorKind::Protocol => VaultError::Protocol(err.detail),
            RemoteErrorKind::Other => VaultError::Remote(err.detail),
        }
    }
}

/// Serialize one message as a JSON line.
pub fn encode_line<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let mut line = serde_json::to_vec(message)
        .map_err(|e| VaultError::SerializationError(format!("agent message: {e}")))?;
    line.push(b'\n');
    Ok(line)
}

/// Parse one JSON line (trailing newline optional).
pub fn decode_line<T: DeserializeOwned>(line: &str) -> Result<T> {
    serde_json::from_str(line.trim_end())
        .map_err(|e| VaultError::Protocol(format!("malformed message: {e}")))
}
