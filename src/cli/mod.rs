//! CLI module: Clap argument parser, output helpers, and command implementations.

pub mod commands;
pub mod output;

use std::path::PathBuf;

use clap::Parser;

use crate::config::{self, Config, Settings};
use crate::errors::Result;
use crate::password::PasswordSource;

/// mfavault CLI: generate MFA TOTP codes from an encrypted seed vault.
#[derive(Parser)]
#[command(
    name = "mfavault",
    about = "Generate MFA TOTP codes from an encrypted seed vault",
    version,
    disable_version_flag = true
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Show version
    #[arg(short = 'v', long, action = clap::ArgAction::Version)]
    pub version: Option<bool>,

    /// Encrypted vault file (default: ~/.mfavault/mfavault.vault)
    #[arg(short = 'V', long, global = true, value_name = "PATH")]
    pub vault: Option<PathBuf>,

    /// Agent socket to bind (server) or connect to (client)
    #[arg(short = 'S', long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    /// Log file for a spawned agent
    #[arg(long, global = true, value_name = "PATH")]
    pub server_log_file: Option<PathBuf>,

    /// Open the vault directly instead of through the caching agent
    #[arg(long, global = true)]
    pub no_cache: bool,

    /// Vault password: pass:VALUE, file:PATH or env:NAME
    #[arg(
        long,
        global = true,
        env = "MFAVAULT_PASSWORD",
        hide_env_values = true,
        value_name = "SPEC"
    )]
    pub password: Option<String>,

    /// Command that prints the password; called with the prompt as its argument
    #[arg(long, global = true, value_name = "CMD")]
    pub password_command: Option<String>,
}

/// All available subcommands.
#[derive(clap::Subcommand)]
pub enum Commands {
    /// Add a client with its TOTP secret to the vault
    Add {
        /// Client ID
        client_id: String,
        /// Secret: pass:VALUE, file:PATH or env:NAME (omit for a prompt)
        #[arg(short, long, value_name = "SPEC")]
        secret: Option<String>,
        /// Replace the secret of an existing client ID
        #[arg(long)]
        overwrite: bool,
    },

    /// List all registered client IDs
    List,

    /// Remove a client from the vault
    Remove {
        /// Client ID
        client_id: String,
    },

    /// Rename a client
    Rename {
        /// Current client ID
        old_id: String,
        /// New client ID
        new_id: String,
    },

    /// Dump the secrets in un-encrypted form to stdout (e.g. for backups)
    DumpSecretsUnencrypted,

    /// Print the TOTP code to stdout
    Print {
        /// Client ID
        client_id: String,
        /// Append a newline
        #[arg(short, long)]
        newline: bool,
    },

    /// Copy the TOTP code to the clipboard
    Clipboard {
        /// Client ID
        client_id: String,
        /// Append a newline
        #[arg(short, long)]
        newline: bool,
    },

    /// Start the caching agent (creates the vault if needed)
    StartServer,

    /// Stop the caching agent if it is running
    StopServer,

    /// Run the caching agent in the foreground; the key is read from stdin
    #[command(name = "_run_server", hide = true)]
    RunServer,

    /// Generate shell completion scripts
    Completions {
        /// Shell to generate completions for
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

// ---------------------------------------------------------------------------
// Shared helpers used by multiple commands
// ---------------------------------------------------------------------------

/// Resolve the invocation's [`Config`]: flags and env vars override
/// `config.toml`, which overrides the defaults.
pub fn build_config(cli: &Cli) -> Result<Config> {
    let data_dir = config::data_dir()?;
    let settings = Settings::load(&data_dir)?;
    let mut config = Config::from_settings(&settings, &data_dir);

    if let Some(vault) = &cli.vault {
        config.vault_path = vault.clone();
    }
    if let Some(socket) = &cli.socket {
        config.socket_path = socket.clone();
    }
    if let Some(log_file) = &cli.server_log_file {
        config.server_log_file = Some(log_file.clone());
    }
    config.no_cache |= cli.no_cache;
    config.password_source = password_source(cli);

    Ok(config)
}

/// `--password-command` wins over `--password`; neither means a prompt.
fn password_source(cli: &Cli) -> PasswordSource {
    if let Some(cmd) = cli.password_command.as_deref().filter(|c| !c.is_empty()) {
        return PasswordSource::Command(cmd.to_string());
    }
    match cli.password.as_deref().filter(|p| !p.is_empty()) {
        Some(spec) => PasswordSource::Spec(spec.to_string()),
        None => PasswordSource::Terminal,
    }
}
