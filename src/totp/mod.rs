//! Time-based one-time passwords (RFC 6238, HMAC-SHA1, 30 s steps, 6 digits).

use std::time::{SystemTime, UNIX_EPOCH};

use data_encoding::{Encoding, BASE32_NOPAD};
use hmac::{Hmac, Mac};
use sha1::Sha1;

use crate::errors::{Result, VaultError};

type HmacSha1 = Hmac<Sha1>;

/// Length of one time step in seconds.
pub const PERIOD: u64 = 30;

/// Number of digits in a code.
pub const DIGITS: u32 = 6;

/// Decode a base32 seed as users paste it: any case, with spaces or
/// trailing `=` padding.
pub fn decode_secret(secret: &str) -> Result<Vec<u8>> {
    let cleaned: String = secret
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '=')
        .map(|c| c.to_ascii_uppercase())
        .collect();
    if cleaned.is_empty() {
        return Err(VaultError::InvalidTotpSecret("secret is empty".into()));
    }

    lenient_base32()?
        .decode(cleaned.as_bytes())
        .map_err(|e| VaultError::InvalidTotpSecret(e.to_string()))
}

/// Base32 without padding that ignores non-zero trailing bits.
fn lenient_base32() -> Result<Encoding> {
    let mut spec = BASE32_NOPAD.specification();
    spec.check_trailing_bits = false;
    spec.encoding()
        .map_err(|e| VaultError::InvalidTotpSecret(e.to_string()))
}

/// The code for `secret` at `unix_time` (seconds since the epoch).
pub fn generate_at(secret: &str, unix_time: u64) -> Result<String> {
    let key = decode_secret(secret)?;
    let code = hotp(&key, unix_time / PERIOD)?;
    Ok(format!("{:0width$}", code, width = DIGITS as usize))
}

/// The code for `secret` right now.
pub fn generate(secret: &str) -> Result<String> {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| VaultError::CommandFailed(format!("system clock is before 1970: {e}")))?;
    generate_at(secret, now.as_secs())
}

/// RFC 4226 HOTP with dynamic truncation.
fn hotp(key: &[u8], counter: u64) -> Result<u32> {
    let mut mac = HmacSha1::new_from_slice(key)
        .map_err(|e| VaultError::InvalidTotpSecret(e.to_string()))?;
    mac.update(&counter.to_be_bytes());
    let digest = mac.finalize().into_bytes();

    let offset = (digest[digest.len() - 1] & 0x0f) as usize;
    let binary = u32::from_be_bytes([
        digest[offset] & 0x7f,
        digest[offset + 1],
        digest[offset + 2],
        digest[offset + 3],
    ]);
    Ok(binary % 10u32.pow(DIGITS))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Base32 of the RFC 6238 SHA-1 seed "12345678901234567890".
    const RFC_SECRET: &str = "GEZDGNBVGY3TQOJQGEZDGNBVGY3TQOJQ";

    #[test]
    fn rfc6238_vectors() {
        assert_eq!(generate_at(RFC_SECRET, 59).unwrap(), "287082");
        assert_eq!(generate_at(RFC_SECRET, 1_111_111_109).unwrap(), "081804");
        assert_eq!(generate_at(RFC_SECRET, 1_111_111_111).unwrap(), "050471");
        assert_eq!(generate_at(RFC_SECRET, 1_234_567_890).unwrap(), "005924");
        assert_eq!(generate_at(RFC_SECRET, 2_000_000_000).unwrap(), "279037");
    }

    #[test]
    fn secrets_are_normalized() {
        let messy = "gezd gnbv gy3t qojq gezd gnbv gy3t qojq====";
        assert_eq!(generate_at(messy, 59).unwrap(), "287082");
    }

    #[test]
    fn same_step_same_code() {
        assert_eq!(
            generate_at(RFC_SECRET, 60).unwrap(),
            generate_at(RFC_SECRET, 89).unwrap()
        );
    }

    #[test]
    fn invalid_secrets_are_rejected() {
        assert!(matches!(
            generate_at("not base32!", 0),
            Err(VaultError::InvalidTotpSecret(_))
        ));
        assert!(matches!(
            generate_at("   ", 0),
            Err(VaultError::InvalidTotpSecret(_))
        ));
    }
}
