//! `mfavault print` and `mfavault clipboard`: produce the current TOTP code.

use std::io::Write;

use crate::config::Config;
use crate::errors::{Result, VaultError};
use crate::totp;
use crate::vault::Vault;

/// Current code for `client_id`.
fn current_code(config: &Config, client_id: &str) -> Result<String> {
    let vault = Vault::open(config, false)?;
    let secret = vault.get_secret(client_id)?;
    totp::generate(&secret)
}

fn with_newline(mut code: String, newline: bool) -> String {
    if newline {
        code.push('\n');
    }
    code
}

/// Execute the `print` command.
pub fn print(config: &Config, client_id: &str, newline: bool) -> Result<()> {
    let code = with_newline(current_code(config, client_id)?, newline);

    let mut stdout = std::io::stdout().lock();
    stdout.write_all(code.as_bytes())?;
    stdout.flush()?;
    Ok(())
}

/// Execute the `clipboard` command.
pub fn clipboard(config: &Config, client_id: &str, newline: bool) -> Result<()> {
    let code = with_newline(current_code(config, client_id)?, newline);

    let mut clipboard =
        arboard::Clipboard::new().map_err(|e| VaultError::Clipboard(e.to_string()))?;
    clipboard
        .set_text(code)
        .map_err(|e| VaultError::Clipboard(e.to_string()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn newline_is_optional() {
        assert_eq!(with_newline("123456".into(), false), "123456");
        assert_eq!(with_newline("123456".into(), true), "123456\n");
    }
}
