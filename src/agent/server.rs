//! The caching agent.
//!
//! Holds one unlocked [`LocalStore`] in memory and serves it over a Unix
//! socket.  Every request runs under a single lock, so concurrent clients
//! see their operations applied one after another.  The agent stops on
//! SIGINT, SIGTERM or a `stop` request and removes its socket on the way
//! out.

use std::io::Read;
use std::path::Path;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::{UnixListener, UnixStream};
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::crypto::{EncryptionKey, KEY_LEN};
use crate::errors::{Result, VaultError};
use crate::vault::LocalStore;

use super::protocol::{decode_line, encode_line, RemoteError, Request, Response};

/// Read the vault key the launcher wrote to our stdin.
pub fn read_key<R: Read>(mut input: R) -> Result<EncryptionKey> {
    let mut buf = zeroize::Zeroizing::new(Vec::with_capacity(KEY_LEN));
    input.read_to_end(&mut buf)?;
    EncryptionKey::from_slice(&buf)
}

/// Open the vault with `key` and serve it on `socket_path` until stopped.
///
/// Blocks the calling thread.  Fails without serving if the key does not
/// decrypt the vault or the socket cannot be bound.
pub fn run(socket_path: &Path, vault_path: &Path, key: EncryptionKey) -> Result<()> {
    let store = LocalStore::open_with_key(vault_path, key).map_err(|e| {
        error!(vault = %vault_path.display(), error = %e, "cannot open vault");
        e
    })?;

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;
    runtime.block_on(serve(socket_path, store, CancellationToken::new()))
}

/// Serve `store` on `socket_path` until `shutdown` is cancelled, a signal
/// arrives or a client sends `stop`.
pub async fn serve(socket_path: &Path, store: LocalStore, shutdown: CancellationToken) -> Result<()> {
    let listener = bind(socket_path)?;
    info!(socket = %socket_path.display(), vault = %store.path().display(), "agent listening");

    watch_signals(shutdown.clone())?;
    let store = Arc::new(Mutex::new(store));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            accepted = listener.accept() => match accepted {
                Ok((stream, _)) => {
                    let store = Arc::clone(&store);
                    let shutdown = shutdown.clone();
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(stream, store, shutdown).await {
                            debug!(error = %e, "connection ended with an error");
                        }
                    });
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
        }
    }

    drop(listener);
    match std::fs::remove_file(socket_path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => warn!(socket = %socket_path.display(), error = %e, "cannot remove socket"),
    }
    info!("agent stopped");
    Ok(())
}

fn bind(socket_path: &Path) -> Result<UnixListener> {
    let listener = UnixListener::bind(socket_path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::AddrInUse {
            error!(socket = %socket_path.display(), "another agent already serves this socket");
        } else {
            error!(socket = %socket_path.display(), error = %e, "cannot bind socket");
        }
        VaultError::SpawnFailed(format!("cannot bind {}: {e}", socket_path.display()))
    })?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(socket_path, std::fs::Permissions::from_mode(0o600))?;
    }

    Ok(listener)
}

fn watch_signals(shutdown: CancellationToken) -> Result<()> {
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    tokio::spawn(async move {
        tokio::select! {
            _ = sigint.recv() => info!("received SIGINT, shutting down"),
            _ = sigterm.recv() => info!("received SIGTERM, shutting down"),
            _ = shutdown.cancelled() => return,
        }
        shutdown.cancel();
    });
    Ok(())
}

async fn handle_connection(
    stream: UnixStream,
    store: Arc<Mutex<LocalStore>>,
    shutdown: CancellationToken,
) -> Result<()> {
    let (read_half, mut writer) = stream.into_split();
    let mut lines = BufReader::new(read_half).lines();

    while let Some(line) = lines.next_line().await? {
        let request: Request = match decode_line(&line) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "rejecting malformed request");
                let reply = Response::Error(RemoteError::from(&e));
                writer.write_all(&encode_line(&reply)?).await?;
                continue;
            }
        };

        let stop = matches!(request, Request::Stop);
        let reply = {
            let mut store = store.lock().await;
            dispatch(&mut store, request)
        };
        writer.write_all(&encode_line(&reply)?).await?;
        writer.flush().await?;

        if stop {
            info!("stop requested");
            shutdown.cancel();
            break;
        }
    }
    Ok(())
}

/// Apply one request to the store and build the reply.
pub fn dispatch(store: &mut LocalStore, request: Request) -> Response {
    let op = request.name();
    let mutation = request.is_mutation();

    let result = match request {
        Request::GetSecrets => Ok(Response::Secrets {
            secrets: store.get_secrets(),
        }),
        Request::StoreSecrets { secrets } => store.store_secrets(secrets).map(|()| Response::Done),
        Request::GetSecret { client_id } => store
            .get_secret(&client_id)
            .map(|secret| Response::Secret { secret }),
        Request::AddClient {
            client_id,
            secret,
            overwrite,
        } => store
            .add_client(&client_id, &secret, overwrite)
            .map(|()| Response::Done),
        Request::RemoveClient { client_id } => {
            store.remove_client(&client_id).map(|()| Response::Done)
        }
        Request::RenameClient { old_id, new_id } => store
            .rename_client(&old_id, &new_id)
            .map(|()| Response::Done),
        Request::ListClients => Ok(Response::Clients {
            clients: store.list_clients(),
        }),
        Request::Stop => Ok(Response::Done),
    };

    match result {
        Ok(reply) => {
            if mutation {
                info!(op, "vault updated");
            } else {
                debug!(op, "served");
            }
            reply
        }
        Err(e) => {
            debug!(op, error = %e, "request failed");
            Response::Error(RemoteError::from(&e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_key;
    use tempfile::TempDir;

    fn store(dir: &TempDir) -> LocalStore {
        LocalStore::create(&dir.path().join("v.vault"), derive_key(b"pw")).unwrap()
    }

    #[test]
    fn read_key_requires_exactly_32_bytes() {
        let key = derive_key(b"pw");
        let read = read_key(key.as_bytes().as_slice()).unwrap();
        assert_eq!(read.as_bytes(), key.as_bytes());

        assert!(matches!(
            read_key(&[0u8; 31][..]),
            Err(VaultError::InvalidKey(31))
        ));
        assert!(matches!(
            read_key(&[0u8; 33][..]),
            Err(VaultError::InvalidKey(33))
        ));
    }

    #[test]
    fn dispatch_applies_and_persists() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        let reply = dispatch(
            &mut store,
            Request::AddClient {
                client_id: "a".into(),
                secret: "AAAA".into(),
                overwrite: false,
            },
        );
        assert_eq!(reply, Response::Done);

        let reopened =
            LocalStore::open_with_key(&dir.path().join("v.vault"), derive_key(b"pw")).unwrap();
        assert_eq!(reopened.get_secret("a").unwrap(), "AAAA");
    }

    #[test]
    fn dispatch_reports_business_errors() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);

        let reply = dispatch(
            &mut store,
            Request::GetSecret {
                client_id: "ghost".into(),
            },
        );
        match reply {
            Response::Error(err) => assert!(matches!(
                VaultError::from(err),
                VaultError::ClientNotFound(id) if id == "ghost"
            )),
            other => panic!("unexpected reply {other:?}"),
        }
    }

    #[test]
    fn dispatch_lists_sorted_clients() {
        let dir = TempDir::new().unwrap();
        let mut store = store(&dir);
        store.add_client("zeta", "Z", false).unwrap();
        store.add_client("alpha", "A", false).unwrap();

        assert_eq!(
            dispatch(&mut store, Request::ListClients),
            Response::Clients {
                clients: vec!["alpha".into(), "zeta".into()]
            }
        );
    }
}
