//! Cryptographic primitives for mfavault.
//!
//! This module provides:
//! - SHA-256 password-to-key derivation (`keys`)
//! - The AES-256-CBC vault codec with its embedded password check (`codec`)

pub mod codec;
pub mod keys;

// Re-export the most commonly used items so callers can write:
//   use crate::crypto::{encrypt, decrypt, derive_key, ...};
pub use codec::{decrypt, encrypt};
pub use keys::{derive_key, EncryptionKey, KEY_LEN};
