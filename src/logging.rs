//! Tracing setup for the CLI and the agent.
//!
//! Both honour `MFAVAULT_LOG` (an `EnvFilter` directive such as
//! `mfavault=debug`).  The CLI only reports warnings by default; the agent
//! logs at info, to its log file when one is configured.

use std::fs::OpenOptions;
use std::path::Path;
use std::sync::Mutex;

use tracing_subscriber::EnvFilter;

use crate::errors::Result;

/// Environment variable holding the log filter.
pub const LOG_ENV: &str = "MFAVAULT_LOG";

fn filter(default_level: &str) -> EnvFilter {
    EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(format!("mfavault={default_level},warn")))
}

/// Log to stderr for an ordinary CLI invocation.
pub fn init_cli() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter("warn"))
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

/// Log for the agent: appended to `log_file` if given, else stderr.
pub fn init_agent(log_file: Option<&Path>) -> Result<()> {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter("info"))
        .with_target(true);

    match log_file {
        Some(path) => {
            let file = OpenOptions::new().create(true).append(true).open(path)?;
            let _ = builder
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = builder.with_writer(std::io::stderr).try_init();
        }
    }
    Ok(())
}
