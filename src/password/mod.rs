//! Password and secret acquisition.
//!
//! The vault core only ever asks a [`PasswordReader`] for a string.  Where
//! that string comes from is decided once, from the configuration:
//!
//! - the terminal (no-echo prompt, the default)
//! - a literal, file or environment value (`pass:`, `file:`, `env:`)
//! - an external command, run as `CMD PROMPT`, whose stdout is the password
//!
//! Empty input is always treated as the user cancelling.

use std::path::Path;
use std::process::Command;

use zeroize::Zeroizing;

use crate::errors::{Result, VaultError};

/// Where the vault password comes from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum PasswordSource {
    /// Interactive no-echo terminal prompt.
    #[default]
    Terminal,
    /// A `pass:`, `file:` or `env:` value spec.
    Spec(String),
    /// External command invoked with the prompt as its only argument.
    Command(String),
}

/// The single capability the vault needs for passwords.
pub trait PasswordReader {
    /// Read one password, showing `prompt` if the source is interactive.
    fn read_password(&self, prompt: &str) -> Result<Zeroizing<String>>;

    /// Whether asking again can yield a different answer.
    ///
    /// Fixed sources return `false`, so a wrong password fails at once
    /// instead of being retried forever.
    fn is_interactive(&self) -> bool {
        true
    }
}

/// Build the reader for a configured source.
///
/// Nothing is read here; a bad spec only fails once a password is needed.
pub fn reader_for(source: &PasswordSource) -> Box<dyn PasswordReader + Send + Sync> {
    match source {
        PasswordSource::Terminal => Box::new(TerminalPassword),
        PasswordSource::Spec(spec) => Box::new(SpecPassword::new(spec)),
        PasswordSource::Command(cmd) => Box::new(CommandPassword::new(cmd)),
    }
}

/// Ask for a brand-new password and repeat until the confirmation matches.
pub fn create_password(reader: &dyn PasswordReader) -> Result<Zeroizing<String>> {
    let password = reader.read_password("Set up a new password")?;

    let mut prompt = "Repeat the password";
    loop {
        let confirmation = reader.read_password(prompt)?;
        if confirmation.as_str() == password.as_str() {
            return Ok(password);
        }
        if !reader.is_interactive() {
            return Err(VaultError::CommandFailed(
                "password confirmation does not match".into(),
            ));
        }
        prompt = "Passwords don't match, try again";
    }
}

// ---------------------------------------------------------------------------
// Readers
// ---------------------------------------------------------------------------

/// Interactive no-echo prompt on the controlling terminal.
pub struct TerminalPassword;

impl PasswordReader for TerminalPassword {
    fn read_password(&self, prompt: &str) -> Result<Zeroizing<String>> {
        let pw = dialoguer::Password::new()
            .with_prompt(prompt)
            .allow_empty_password(true)
            .interact()
            .map_err(|e| VaultError::CommandFailed(format!("password prompt: {e}")))?;
        non_empty(Zeroizing::new(pw))
    }
}

/// A password fixed up front (literal, file contents or env var).
pub struct FixedPassword {
    value: Zeroizing<String>,
}

impl FixedPassword {
    pub fn new(value: Zeroizing<String>) -> Self {
        Self { value }
    }
}

impl PasswordReader for FixedPassword {
    fn read_password(&self, _prompt: &str) -> Result<Zeroizing<String>> {
        non_empty(self.value.clone())
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Resolves a `pass:`, `file:` or `env:` spec each time it is asked.
pub struct SpecPassword {
    spec: String,
}

impl SpecPassword {
    pub fn new(spec: &str) -> Self {
        Self {
            spec: spec.to_string(),
        }
    }
}

impl PasswordReader for SpecPassword {
    fn read_password(&self, _prompt: &str) -> Result<Zeroizing<String>> {
        non_empty(parse_value_spec(&self.spec)?)
    }

    fn is_interactive(&self) -> bool {
        false
    }
}

/// Runs an external helper (e.g. a pinentry wrapper) for every prompt.
///
/// Exit code 1 means the user cancelled.
pub struct CommandPassword {
    command: String,
}

impl CommandPassword {
    pub fn new(command: &str) -> Self {
        Self {
            command: command.to_string(),
        }
    }
}

impl PasswordReader for CommandPassword {
    fn read_password(&self, prompt: &str) -> Result<Zeroizing<String>> {
        let output = Command::new(&self.command)
            .arg(prompt)
            .output()
            .map_err(|e| {
                VaultError::CommandFailed(format!("reading password with {}: {e}", self.command))
            })?;

        if !output.status.success() {
            if output.status.code() == Some(1) {
                return Err(VaultError::Cancelled);
            }
            return Err(VaultError::CommandFailed(format!(
                "reading password with {}: {}",
                self.command, output.status
            )));
        }

        let mut stdout = Zeroizing::new(output.stdout);
        if stdout.last() == Some(&b'\n') {
            stdout.pop();
        }
        let text = std::str::from_utf8(&stdout)
            .map_err(|_| VaultError::CommandFailed("password is not valid UTF-8".into()))?;
        non_empty(Zeroizing::new(text.to_string()))
    }
}

fn non_empty(value: Zeroizing<String>) -> Result<Zeroizing<String>> {
    if value.is_empty() {
        return Err(VaultError::Cancelled);
    }
    Ok(value)
}

// ---------------------------------------------------------------------------
// Value specs (shared by --password and `add --secret`)
// ---------------------------------------------------------------------------

/// Resolve a `pass:VALUE`, `file:PATH` or `env:NAME` spec.
pub fn parse_value_spec(spec: &str) -> Result<Zeroizing<String>> {
    if let Some(value) = strip_prefix(spec, "pass:") {
        return Ok(Zeroizing::new(value.to_string()));
    }
    if let Some(path) = strip_prefix(spec, "file:") {
        let body = std::fs::read_to_string(Path::new(path)).map_err(|e| {
            VaultError::ConfigError(format!("cannot read secret file {path}: {e}"))
        })?;
        return Ok(Zeroizing::new(body));
    }
    if let Some(name) = strip_prefix(spec, "env:") {
        let value = std::env::var(name)
            .map_err(|_| VaultError::ConfigError(format!("secret env {name} is not set")))?;
        return Ok(Zeroizing::new(value));
    }
    Err(VaultError::ConfigError(format!(
        "invalid secret format '{spec}' (expected pass:VALUE, file:PATH or env:NAME)"
    )))
}

/// The prefix must be followed by at least one character.
fn strip_prefix<'a>(spec: &'a str, prefix: &str) -> Option<&'a str> {
    spec.strip_prefix(prefix).filter(|rest| !rest.is_empty())
}

/// Read a client secret for `add`: from a spec if given, otherwise prompt.
///
/// `otpauth://` URIs are reduced to their `secret` parameter.
pub fn read_client_secret(spec: Option<&str>, client_id: &str) -> Result<Zeroizing<String>> {
    let raw = match spec {
        Some(spec) => parse_value_spec(spec)?,
        None => TerminalPassword.read_password(&format!("Secret for {client_id}"))?,
    };
    Ok(Zeroizing::new(extract_otpauth_secret(&raw)))
}

/// Return the `secret` query parameter of an `otpauth://` URI, or the
/// input unchanged when it is not such a URI.
pub fn extract_otpauth_secret(raw: &str) -> String {
    let trimmed = raw.trim();
    if !trimmed.starts_with("otpauth://") {
        return raw.to_string();
    }

    let query = match trimmed.split_once('?') {
        Some((_, query)) => query,
        None => return raw.to_string(),
    };

    query
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, value)| *key == "secret" && !value.is_empty())
        .map_or_else(|| raw.to_string(), |(_, value)| value.to_string())
}
