//! Client side of the agent channel.
//!
//! [`ConnectionManager`] turns "I want to talk to the agent" into a live
//! [`Connection`], spawning a fresh agent when none is listening and
//! cleaning up a socket file left behind by one that died.

use std::io::{self, BufRead, BufReader, Write};
use std::os::unix::fs::FileTypeExt;
use std::os::unix::net::UnixStream;
use std::path::Path;
use std::thread;
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::config::{self, Config};
use crate::errors::{Result, VaultError};
use crate::password::{reader_for, PasswordReader};
use crate::vault::{LocalStore, SecretMap};

use super::launcher::{DaemonLauncher, SelfExecLauncher};
use super::protocol::{decode_line, encode_line, Request, Response};

/// Pause between connection attempts while an agent starts up.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

// ---------------------------------------------------------------------------
// Connection
// ---------------------------------------------------------------------------

/// One open connection to a running agent.
pub struct Connection {
    reader: BufReader<UnixStream>,
    writer: UnixStream,
}

impl Connection {
    /// Connect to the agent socket at `path`.
    pub fn open(path: &Path) -> io::Result<Self> {
        let stream = UnixStream::connect(path)?;
        let writer = stream.try_clone()?;
        Ok(Self {
            reader: BufReader::new(stream),
            writer,
        })
    }

    /// Send one request and wait for its reply.
    ///
    /// Error replies come back as `Err`.
    pub fn call(&mut self, request: &Request) -> Result<Response> {
        self.writer.write_all(&encode_line(request)?)?;
        self.writer.flush()?;

        let mut line = String::new();
        if self.reader.read_line(&mut line)? == 0 {
            return Err(VaultError::Protocol(
                "agent closed the connection".into(),
            ));
        }
        match decode_line(&line)? {
            Response::Error(err) => Err(err.into()),
            response => Ok(response),
        }
    }

    pub fn get_secrets(&mut self) -> Result<SecretMap> {
        match self.call(&Request::GetSecrets)? {
            Response::Secrets { secrets } => Ok(secrets),
            other => Err(unexpected("get_secrets", &other)),
        }
    }

    pub fn store_secrets(&mut self, secrets: &SecretMap) -> Result<()> {
        let request = Request::StoreSecrets {
            secrets: secrets.clone(),
        };
        self.expect_done(&request)
    }

    pub fn get_secret(&mut self, client_id: &str) -> Result<String> {
        let request = Request::GetSecret {
            client_id: client_id.to_string(),
        };
        match self.call(&request)? {
            Response::Secret { secret } => Ok(secret),
            other => Err(unexpected("get_secret", &other)),
        }
    }

    pub fn add_client(&mut self, client_id: &str, secret: &str, overwrite: bool) -> Result<()> {
        self.expect_done(&Request::AddClient {
            client_id: client_id.to_string(),
            secret: secret.to_string(),
            overwrite,
        })
    }

    pub fn remove_client(&mut self, client_id: &str) -> Result<()> {
        self.expect_done(&Request::RemoveClient {
            client_id: client_id.to_string(),
        })
    }

    pub fn rename_client(&mut self, old_id: &str, new_id: &str) -> Result<()> {
        self.expect_done(&Request::RenameClient {
            old_id: old_id.to_string(),
            new_id: new_id.to_string(),
        })
    }

    pub fn list_clients(&mut self) -> Result<Vec<String>> {
        match self.call(&Request::ListClients)? {
            Response::Clients { clients } => Ok(clients),
            other => Err(unexpected("list_clients", &other)),
        }
    }

    /// Ask the agent to shut down.
    pub fn stop(&mut self) -> Result<()> {
        self.expect_done(&Request::Stop)
    }

    fn expect_done(&mut self, request: &Request) -> Result<()> {
        match self.call(request)? {
            Response::Done => Ok(()),
            other => Err(unexpected(request.name(), &other)),
        }
    }
}

fn unexpected(op: &str, response: &Response) -> VaultError {
    let kind = match response {
        Response::Secrets { .. } => "secrets",
        Response::Secret { .. } => "secret",
        Response::Clients { .. } => "clients",
        Response::Done => "done",
        Response::Error(_) => "error",
    };
    VaultError::Protocol(format!("unexpected '{kind}' reply to {op}"))
}

// ---------------------------------------------------------------------------
// Connection manager
// ---------------------------------------------------------------------------

/// Obtains connections to the agent, starting one when needed.
pub struct ConnectionManager {
    config: Config,
    launcher: Box<dyn DaemonLauncher + Send + Sync>,
    passwords: Box<dyn PasswordReader + Send + Sync>,
}

impl ConnectionManager {
    pub fn new(
        config: Config,
        launcher: Box<dyn DaemonLauncher + Send + Sync>,
        passwords: Box<dyn PasswordReader + Send + Sync>,
    ) -> Self {
        Self {
            config,
            launcher,
            passwords,
        }
    }

    /// Manager that re-executes this binary and reads passwords from the
    /// configured source.
    pub fn from_config(config: &Config) -> Result<Self> {
        let launcher = SelfExecLauncher::new(config.server_log_file.clone())?;
        let passwords = reader_for(&config.password_source);
        Ok(Self::new(config.clone(), Box::new(launcher), passwords))
    }

    /// Connect to the agent, spawning one if nothing is listening.
    ///
    /// Spawning unlocks the vault in this process first (prompting for the
    /// password, or creating the vault when `create` is set) and hands the
    /// derived key to the new agent.
    pub fn connect(&self, create: bool) -> Result<Connection> {
        let socket = &self.config.socket_path;
        match Connection::open(socket) {
            Ok(conn) => return Ok(conn),
            Err(err) => prepare_respawn(socket, err)?,
        }
        // A racing client may have started an agent in the meantime.
        if let Ok(conn) = Connection::open(socket) {
            return Ok(conn);
        }

        self.spawn_agent(create)?;
        self.wait_for_agent()
    }

    /// Connect only if an agent is already listening.
    pub fn connect_existing(&self) -> Option<Connection> {
        match Connection::open(&self.config.socket_path) {
            Ok(conn) => Some(conn),
            Err(err) => {
                debug!(socket = %self.config.socket_path.display(), error = %err, "no agent listening");
                None
            }
        }
    }

    /// Run `f` against a connection obtained with [`connect`](Self::connect).
    pub fn call_server<T, F>(&self, create: bool, f: F) -> Result<T>
    where
        F: FnOnce(&mut Connection) -> Result<T>,
    {
        let mut conn = self.connect(create)?;
        f(&mut conn)
    }

    /// Make sure an agent is running, creating the vault if needed.
    pub fn start_server(&self) -> Result<()> {
        self.connect(true).map(drop)
    }

    /// Stop the agent if one is running, and wait for its socket to go away.
    pub fn stop_server(&self) -> Result<()> {
        let Some(mut conn) = self.connect_existing() else {
            return Ok(());
        };
        conn.stop()?;
        drop(conn);

        let deadline = Instant::now() + self.config.connect_timeout;
        while self.config.socket_path.exists() {
            if Instant::now() >= deadline {
                warn!(socket = %self.config.socket_path.display(), "agent acknowledged stop but its socket is still present");
                break;
            }
            thread::sleep(POLL_INTERVAL);
        }
        Ok(())
    }

    fn spawn_agent(&self, create: bool) -> Result<()> {
        let store = LocalStore::open(&self.config.vault_path, &*self.passwords, create)?;

        if let Some(parent) = self
            .config
            .socket_path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
        {
            config::ensure_dir(parent)?;
        }

        let pid = self
            .launcher
            .spawn(&self.config.socket_path, store.path(), store.key())?;
        debug!(pid, "waiting for agent");
        Ok(())
    }

    fn wait_for_agent(&self) -> Result<Connection> {
        let socket = &self.config.socket_path;
        let deadline = Instant::now() + self.config.connect_timeout;
        loop {
            match Connection::open(socket) {
                Ok(conn) => return Ok(conn),
                Err(err) if Instant::now() >= deadline => {
                    debug!(error = %err, "agent did not come up");
                    return Err(VaultError::ConnectTimeout(socket.clone()));
                }
                Err(_) => thread::sleep(POLL_INTERVAL),
            }
        }
    }
}

/// Decide whether a failed connect may be fixed by spawning a new agent.
///
/// A missing socket is fine.  A refused connection on a real socket file
/// means its agent died; the stale file is removed.  A refused connection
/// on anything other than a socket is left alone and reported.
///
/// Another client may be repairing the same socket at the same time: a
/// file that vanished under us counts as removed, and a socket that
/// answers again belongs to a fresh agent and is kept.
pub fn prepare_respawn(socket: &Path, err: io::Error) -> Result<()> {
    match err.kind() {
        io::ErrorKind::NotFound => Ok(()),
        io::ErrorKind::ConnectionRefused => {
            let meta = match std::fs::symlink_metadata(socket) {
                Ok(meta) => meta,
                Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(()),
                Err(e) => {
                    return Err(VaultError::ChannelUnreachable {
                        path: socket.to_path_buf(),
                        source: e,
                    })
                }
            };
            if !meta.file_type().is_socket() {
                return Err(VaultError::NotASocket(socket.to_path_buf()));
            }
            if Connection::open(socket).is_ok() {
                debug!(socket = %socket.display(), "agent came up meanwhile");
                return Ok(());
            }

            debug!(socket = %socket.display(), "removing orphaned agent socket");
            match std::fs::remove_file(socket) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(e) => Err(VaultError::ChannelUnreachable {
                    path: socket.to_path_buf(),
                    source: e,
                }),
            }
        }
        _ => Err(VaultError::ChannelUnreachable {
            path: socket.to_path_buf(),
            source: err,
        }),
    }
}
