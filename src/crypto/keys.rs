//! Password-derived encryption key.
//!
//! The key is a plain SHA-256 digest of the password.  It is never
//! written to disk; the only place it leaves process memory is the stdin
//! pipe used to hand it to a freshly spawned agent.

use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

use crate::errors::{Result, VaultError};

/// Length of the derived key in bytes (256 bits, for AES-256).
pub const KEY_LEN: usize = 32;

/// A 32-byte encryption key that zeroes its memory when dropped.
#[derive(Clone, Zeroize)]
#[zeroize(drop)]
pub struct EncryptionKey {
    bytes: [u8; KEY_LEN],
}

impl EncryptionKey {
    /// Wrap raw key bytes.
    pub fn new(bytes: [u8; KEY_LEN]) -> Self {
        Self { bytes }
    }

    /// Build a key from a slice, rejecting anything that is not 32 bytes.
    ///
    /// Used by the agent when reading the key from its stdin pipe.
    pub fn from_slice(bytes: &[u8]) -> Result<Self> {
        let array: [u8; KEY_LEN] = bytes
            .try_into()
            .map_err(|_| VaultError::InvalidKey(bytes.len()))?;
        Ok(Self::new(array))
    }

    /// Access the raw key bytes.
    pub fn as_bytes(&self) -> &[u8; KEY_LEN] {
        &self.bytes
    }

    /// Constant-time comparison against a candidate check block.
    pub fn matches(&self, candidate: &[u8]) -> bool {
        self.bytes.as_slice().ct_eq(candidate).into()
    }
}

impl std::fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("EncryptionKey(..)")
    }
}

/// Derive the vault key from a password.
///
/// Deterministic: the same password always yields the same key.
pub fn derive_key(password: &[u8]) -> EncryptionKey {
    let mut digest: [u8; KEY_LEN] = Sha256::digest(password).into();
    let key = EncryptionKey::new(digest);
    digest.zeroize();
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_is_deterministic() {
        let a = derive_key(b"hunter2");
        let b = derive_key(b"hunter2");
        assert_eq!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn derive_key_differs_per_password() {
        let a = derive_key(b"pw1");
        let b = derive_key(b"pw2");
        assert_ne!(a.as_bytes(), b.as_bytes());
    }

    #[test]
    fn derive_key_is_plain_sha256() {
        // sha256("abc")
        let key = derive_key(b"abc");
        assert_eq!(
            key.as_bytes()[..4],
            [0xba, 0x78, 0x16, 0xbf],
            "key must stay byte compatible with existing vault files"
        );
    }

    #[test]
    fn from_slice_rejects_wrong_length() {
        assert!(matches!(
            EncryptionKey::from_slice(&[0u8; 16]),
            Err(VaultError::InvalidKey(16))
        ));
        assert!(EncryptionKey::from_slice(&[7u8; 32]).is_ok());
    }

    #[test]
    fn matches_compares_full_key() {
        let key = EncryptionKey::new([0x42; KEY_LEN]);
        assert!(key.matches(&[0x42; KEY_LEN]));
        assert!(!key.matches(&[0x43; KEY_LEN]));
        assert!(!key.matches(&[0x42; 16]));
    }

    #[test]
    fn debug_does_not_leak_bytes() {
        let key = EncryptionKey::new([0xAB; KEY_LEN]);
        assert_eq!(format!("{key:?}"), "EncryptionKey(..)");
    }
}
