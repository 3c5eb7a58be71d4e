//! Starting a detached agent process.

use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use tracing::debug;

use crate::crypto::EncryptionKey;
use crate::errors::{Result, VaultError};

/// Name of the hidden subcommand that runs the agent.
pub const RUN_SERVER_COMMAND: &str = "_run_server";

/// Starts an agent serving `vault_path` on `socket_path`.
///
/// Implementations must hand `key` to the agent without exposing it on a
/// command line or in the environment.
pub trait DaemonLauncher {
    /// Start the agent and return its process id.
    fn spawn(&self, socket_path: &Path, vault_path: &Path, key: &EncryptionKey) -> Result<u32>;
}

/// Re-executes the current binary with the hidden agent subcommand.
///
/// The child runs in its own session with stdout and stderr discarded, so
/// it outlives the invoking shell.  The key is written to its stdin pipe,
/// which is then closed.
pub struct SelfExecLauncher {
    program: PathBuf,
    log_file: Option<PathBuf>,
}

impl SelfExecLauncher {
    /// Launcher for the currently running executable.
    pub fn new(log_file: Option<PathBuf>) -> Result<Self> {
        let program = std::env::current_exe()
            .map_err(|e| VaultError::SpawnFailed(format!("cannot locate own executable: {e}")))?;
        Ok(Self::with_program(program, log_file))
    }

    /// Launcher for an explicit `mfavault` binary.
    pub fn with_program(program: PathBuf, log_file: Option<PathBuf>) -> Self {
        Self { program, log_file }
    }

    fn command(&self, socket_path: &Path, vault_path: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.arg(RUN_SERVER_COMMAND)
            .arg("--socket")
            .arg(socket_path)
            .arg("--vault")
            .arg(vault_path);
        if let Some(log_file) = &self.log_file {
            cmd.arg("--server-log-file").arg(log_file);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::null());

        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;

            // SAFETY: setsid is async-signal-safe and only affects the child.
            unsafe {
                cmd.pre_exec(|| {
                    if libc::setsid() == -1 {
                        return Err(std::io::Error::last_os_error());
                    }
                    Ok(())
                });
            }
        }

        cmd
    }
}

impl DaemonLauncher for SelfExecLauncher {
    fn spawn(&self, socket_path: &Path, vault_path: &Path, key: &EncryptionKey) -> Result<u32> {
        let mut child = self
            .command(socket_path, vault_path)
            .spawn()
            .map_err(|e| VaultError::SpawnFailed(format!("{}: {e}", self.program.display())))?;

        let pid = child.id();
        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| VaultError::SpawnFailed("agent stdin is not a pipe".into()))?;
        stdin
            .write_all(key.as_bytes())
            .map_err(|e| VaultError::SpawnFailed(format!("handing the key to the agent: {e}")))?;
        drop(stdin);

        debug!(pid, socket = %socket_path.display(), "spawned agent");
        Ok(pid)
    }
}
