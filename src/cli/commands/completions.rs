//! `mfavault completions`: generate shell completion scripts.
//!
//! Usage:
//!   mfavault completions bash > ~/.bash_completion.d/mfavault
//!   mfavault completions zsh > "${fpath[1]}/_mfavault"

use std::io::{self, Write};

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::Cli;
use crate::errors::Result;

/// Execute the `completions` command.
pub fn execute(shell: Shell) -> Result<()> {
    let mut out = io::stdout().lock();
    write_completions(shell, &mut out)?;
    out.flush()?;
    Ok(())
}

/// Write the completion script for `shell` to `out`.
fn write_completions<W: Write>(shell: Shell, out: &mut W) -> Result<()> {
    let mut cmd = Cli::command();
    let name = cmd.get_name().to_string();
    generate(shell, &mut cmd, name, out);
    Ok(())
}
