//! AES-256-CBC vault codec.
//!
//! Layout of an encrypted vault blob:
//!
//! ```text
//! [ 16-byte IV | CBC( PKCS#7( key (32 bytes) || JSON(secret map) ) ) ]
//! ```
//!
//! The key copy at the front of the plaintext is the check block: after
//! decryption it must equal the key used to decrypt, otherwise the
//! password was wrong.  This is a password check, not a MAC.

use aes::Aes256;
use cbc::cipher::block_padding::{NoPadding, Pkcs7, RawPadding};
use cbc::cipher::{BlockDecryptMut, BlockEncryptMut, KeyIvInit};
use rand::RngCore;
use zeroize::Zeroize;

use super::keys::{EncryptionKey, KEY_LEN};
use crate::errors::{Result, VaultError};
use crate::vault::SecretMap;

type Aes256CbcEnc = cbc::Encryptor<Aes256>;
type Aes256CbcDec = cbc::Decryptor<Aes256>;

/// AES block size; also the IV length.
pub const BLOCK_SIZE: usize = 16;

/// Encrypt `secrets` with `key`.
///
/// A fresh random IV is drawn on every call and prepended to the output.
pub fn encrypt(secrets: &SecretMap, key: &EncryptionKey) -> Result<Vec<u8>> {
    let json = serde_json::to_vec(secrets)
        .map_err(|e| VaultError::SerializationError(format!("secrets: {e}")))?;

    let mut plaintext = Vec::with_capacity(KEY_LEN + json.len());
    plaintext.extend_from_slice(key.as_bytes());
    plaintext.extend_from_slice(&json);

    let mut iv = [0u8; BLOCK_SIZE];
    rand::rng().fill_bytes(&mut iv);

    let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv)
        .map_err(|e| VaultError::EncryptionFailed(format!("cipher init: {e}")))?;
    let ciphertext = cipher.encrypt_padded_vec_mut::<Pkcs7>(&plaintext);
    plaintext.zeroize();

    let mut output = Vec::with_capacity(BLOCK_SIZE + ciphertext.len());
    output.extend_from_slice(&iv);
    output.extend_from_slice(&ciphertext);
    Ok(output)
}

/// Decrypt a blob produced by [`encrypt`].
///
/// The check block is compared before the padding is looked at, so a
/// wrong key always surfaces as `InvalidPassword` rather than as a
/// padding or JSON failure.
pub fn decrypt(blob: &[u8], key: &EncryptionKey) -> Result<SecretMap> {
    if blob.len() <= BLOCK_SIZE {
        return Err(VaultError::InvalidBlob);
    }

    let (iv, ciphertext) = blob.split_at(BLOCK_SIZE);
    if ciphertext.len() % BLOCK_SIZE != 0 || ciphertext.len() < KEY_LEN {
        return Err(VaultError::InvalidBlob);
    }

    let cipher = Aes256CbcDec::new_from_slices(key.as_bytes(), iv)
        .map_err(|_| VaultError::InvalidBlob)?;
    let mut plaintext = cipher
        .decrypt_padded_vec_mut::<NoPadding>(ciphertext)
        .map_err(|_| VaultError::InvalidBlob)?;

    let result = split_plaintext(&plaintext, key);
    plaintext.zeroize();
    result
}

fn split_plaintext(plaintext: &[u8], key: &EncryptionKey) -> Result<SecretMap> {
    let (check_block, padded) = plaintext.split_at(KEY_LEN);
    if !key.matches(check_block) {
        return Err(VaultError::InvalidPassword);
    }

    let json = unpad(padded)?;
    serde_json::from_slice(&json).map_err(|e| VaultError::CorruptData(format!("secrets JSON: {e}")))
}

/// Strip PKCS#7 padding, rejecting a zero or oversized pad length.
fn unpad(padded: &[u8]) -> Result<Vec<u8>> {
    if padded.len() < BLOCK_SIZE {
        return Err(VaultError::CorruptData("missing padding block".into()));
    }

    let (head, last_block) = padded.split_at(padded.len() - BLOCK_SIZE);
    let tail = Pkcs7::raw_unpad(last_block)
        .map_err(|_| VaultError::CorruptData("invalid padding".into()))?;

    let mut out = Vec::with_capacity(head.len() + tail.len());
    out.extend_from_slice(head);
    out.extend_from_slice(tail);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::derive_key;

    fn sample() -> SecretMap {
        let mut map = SecretMap::new();
        map.insert("github".into(), "JBSWY3DPEHPK3PXP".into());
        map.insert("aws-prod".into(), "GEZDGNBVGY3TQOJQ".into());
        map
    }

    /// Encrypt raw plaintext bytes the same way `encrypt` does, so the
    /// tests can build blobs with broken padding or broken JSON.
    fn encrypt_raw(key: &EncryptionKey, plaintext: &[u8]) -> Vec<u8> {
        let iv = [9u8; BLOCK_SIZE];
        let cipher = Aes256CbcEnc::new_from_slices(key.as_bytes(), &iv).unwrap();
        let ct = cipher.encrypt_padded_vec_mut::<NoPadding>(plaintext);
        [iv.as_slice(), ct.as_slice()].concat()
    }

    #[test]
    fn layout_is_iv_plus_block_aligned_ciphertext() {
        let key = derive_key(b"pw");
        let blob = encrypt(&SecretMap::new(), &key).unwrap();
        // "{}" is 2 bytes: 32 + 2 padded to 48, plus the IV.
        assert_eq!(blob.len(), BLOCK_SIZE + 48);
    }

    #[test]
    fn empty_map_roundtrip() {
        let key = derive_key(b"pw1");
        let blob = encrypt(&SecretMap::new(), &key).unwrap();
        assert!(decrypt(&blob, &key).unwrap().is_empty());
    }

    #[test]
    fn fresh_iv_per_call() {
        let key = derive_key(b"pw");
        let a = encrypt(&sample(), &key).unwrap();
        let b = encrypt(&sample(), &key).unwrap();
        assert_ne!(a[..BLOCK_SIZE], b[..BLOCK_SIZE]);
    }

    #[test]
    fn blob_of_one_block_is_invalid() {
        let key = derive_key(b"pw");
        assert!(matches!(
            decrypt(&[0u8; BLOCK_SIZE], &key),
            Err(VaultError::InvalidBlob)
        ));
        assert!(matches!(decrypt(&[], &key), Err(VaultError::InvalidBlob)));
    }

    #[test]
    fn misaligned_ciphertext_is_invalid() {
        let key = derive_key(b"pw");
        let mut blob = encrypt(&sample(), &key).unwrap();
        blob.push(0);
        assert!(matches!(decrypt(&blob, &key), Err(VaultError::InvalidBlob)));
    }

    #[test]
    fn zero_pad_length_is_corrupt() {
        let key = derive_key(b"pw");
        let mut plaintext = key.as_bytes().to_vec();
        plaintext.extend_from_slice(b"{}");
        plaintext.resize(KEY_LEN + BLOCK_SIZE, 0);
        let blob = encrypt_raw(&key, &plaintext);
        assert!(matches!(
            decrypt(&blob, &key),
            Err(VaultError::CorruptData(_))
        ));
    }

    #[test]
    fn oversized_pad_length_is_corrupt() {
        let key = derive_key(b"pw");
        let mut plaintext = key.as_bytes().to_vec();
        plaintext.extend_from_slice(b"{}");
        plaintext.resize(KEY_LEN + BLOCK_SIZE, 17);
        let blob = encrypt_raw(&key, &plaintext);
        assert!(matches!(
            decrypt(&blob, &key),
            Err(VaultError::CorruptData(_))
        ));
    }

    #[test]
    fn non_json_payload_is_corrupt() {
        let key = derive_key(b"pw");
        let mut plaintext = key.as_bytes().to_vec();
        plaintext.extend_from_slice(b"not json");
        plaintext.resize(KEY_LEN + BLOCK_SIZE, 8);
        let blob = encrypt_raw(&key, &plaintext);
        assert!(matches!(
            decrypt(&blob, &key),
            Err(VaultError::CorruptData(_))
        ));
    }
}
