//! Integration tests for the local store and the `Vault` facade.

use std::fs;
use std::sync::Mutex;

use mfavault::config::Config;
use mfavault::crypto::{decrypt, derive_key};
use mfavault::errors::{Result, VaultError};
use mfavault::password::{FixedPassword, PasswordReader, PasswordSource};
use mfavault::vault::{LocalStore, SecretMap, Vault};
use tempfile::TempDir;
use zeroize::Zeroizing;

/// Hands out scripted answers in order and records the prompts it saw.
struct Scripted {
    answers: Mutex<Vec<&'static str>>,
    prompts: Mutex<Vec<String>>,
}

impl Scripted {
    fn new(answers: &[&'static str]) -> Self {
        Self {
            answers: Mutex::new(answers.to_vec()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    fn prompts(&self) -> Vec<String> {
        self.prompts.lock().unwrap().clone()
    }
}

impl PasswordReader for Scripted {
    fn read_password(&self, prompt: &str) -> Result<Zeroizing<String>> {
        self.prompts.lock().unwrap().push(prompt.to_string());
        let next = self.answers.lock().unwrap().remove(0);
        if next.is_empty() {
            return Err(VaultError::Cancelled);
        }
        Ok(Zeroizing::new(next.to_string()))
    }
}

fn fixed(pw: &str) -> FixedPassword {
    FixedPassword::new(Zeroizing::new(pw.to_string()))
}

/// Helper: a temp dir and a vault path inside it.
fn vault_path() -> (TempDir, std::path::PathBuf) {
    let dir = TempDir::new().expect("create temp dir");
    let path = dir.path().join("test.vault");
    (dir, path)
}

// ---------------------------------------------------------------------------
// Creating and opening
// ---------------------------------------------------------------------------

#[test]
fn fresh_vault_is_created_with_confirmed_password() {
    let (_dir, path) = vault_path();
    let reader = Scripted::new(&["pw1", "pw1"]);

    let store = LocalStore::open(&path, &reader, true).unwrap();
    assert!(store.get_secrets().is_empty());
    assert_eq!(
        reader.prompts(),
        vec!["Set up a new password", "Repeat the password"]
    );

    let on_disk = decrypt(&fs::read(&path).unwrap(), &derive_key(b"pw1")).unwrap();
    assert_eq!(on_disk, SecretMap::new());
}

#[test]
fn mismatched_confirmation_is_asked_again() {
    let (_dir, path) = vault_path();
    let reader = Scripted::new(&["pw1", "pw2", "pw1"]);

    LocalStore::open(&path, &reader, true).unwrap();
    assert_eq!(reader.prompts()[2], "Passwords don't match, try again");
}

#[test]
fn missing_vault_without_create_is_not_found() {
    let (_dir, path) = vault_path();
    let reader = Scripted::new(&[]);

    assert!(matches!(
        LocalStore::open(&path, &reader, false),
        Err(VaultError::VaultNotFound(p)) if p == path
    ));
    assert!(!path.exists());
}

#[test]
fn wrong_password_is_retried_interactively() {
    let (_dir, path) = vault_path();
    LocalStore::create(&path, derive_key(b"right")).unwrap();

    let reader = Scripted::new(&["wrong", "right"]);
    LocalStore::open(&path, &reader, false).unwrap();
    assert_eq!(
        reader.prompts(),
        vec!["Password", "Invalid password. Try again"]
    );
}

#[test]
fn wrong_fixed_password_fails_at_once() {
    let (_dir, path) = vault_path();
    LocalStore::create(&path, derive_key(b"right")).unwrap();

    assert!(matches!(
        LocalStore::open(&path, &fixed("wrong"), false),
        Err(VaultError::InvalidPassword)
    ));
}

#[test]
fn cancelling_the_prompt_is_an_error() {
    let (_dir, path) = vault_path();
    LocalStore::create(&path, derive_key(b"right")).unwrap();

    let reader = Scripted::new(&[""]);
    assert!(matches!(
        LocalStore::open(&path, &reader, false),
        Err(VaultError::Cancelled)
    ));
}

// ---------------------------------------------------------------------------
// Client operations
// ---------------------------------------------------------------------------

#[test]
fn changes_survive_reopening() {
    let (_dir, path) = vault_path();
    let mut store = LocalStore::create(&path, derive_key(b"pw")).unwrap();
    store.add_client("github", "JBSWY3DPEHPK3PXP", false).unwrap();
    store.add_client("aws", "GEZDGNBVGY3TQOJQ", false).unwrap();
    store.rename_client("aws", "aws-prod").unwrap();

    let reopened = LocalStore::open(&path, &fixed("pw"), false).unwrap();
    assert_eq!(reopened.list_clients(), vec!["aws-prod", "github"]);
    assert_eq!(reopened.get_secret("aws-prod").unwrap(), "GEZDGNBVGY3TQOJQ");
}

#[test]
fn add_refuses_to_overwrite_unless_asked() {
    let (_dir, path) = vault_path();
    let mut store = LocalStore::create(&path, derive_key(b"pw")).unwrap();
    store.add_client("a", "AAAA", false).unwrap();

    assert!(matches!(
        store.add_client("a", "BBBB", false),
        Err(VaultError::ClientAlreadyExists(_))
    ));
    store.add_client("a", "BBBB", true).unwrap();
    assert_eq!(store.get_secret("a").unwrap(), "BBBB");
}

#[test]
fn remove_is_idempotent_and_skips_the_write() {
    let (_dir, path) = vault_path();
    let mut store = LocalStore::create(&path, derive_key(b"pw")).unwrap();
    store.add_client("a", "AAAA", false).unwrap();

    store.remove_client("a").unwrap();
    let after_first = fs::read(&path).unwrap();

    store.remove_client("a").unwrap();
    // Each write uses a fresh IV, so equal bytes mean no write happened.
    assert_eq!(fs::read(&path).unwrap(), after_first);
    assert!(store.list_clients().is_empty());
}

#[test]
fn rename_onto_existing_client_changes_nothing() {
    let (_dir, path) = vault_path();
    let mut store = LocalStore::create(&path, derive_key(b"pw")).unwrap();
    store.add_client("a", "AAAA", false).unwrap();
    store.add_client("b", "BBBB", false).unwrap();

    assert!(matches!(
        store.rename_client("a", "b"),
        Err(VaultError::ClientAlreadyExists(id)) if id == "b"
    ));
    assert_eq!(store.get_secret("a").unwrap(), "AAAA");
    assert_eq!(store.get_secret("b").unwrap(), "BBBB");
}

#[test]
fn rename_of_unknown_client_is_not_found() {
    let (_dir, path) = vault_path();
    let mut store = LocalStore::create(&path, derive_key(b"pw")).unwrap();

    assert!(matches!(
        store.rename_client("ghost", "b"),
        Err(VaultError::ClientNotFound(id)) if id == "ghost"
    ));
}

#[test]
fn empty_client_id_is_rejected() {
    let (_dir, path) = vault_path();
    let mut store = LocalStore::create(&path, derive_key(b"pw")).unwrap();

    assert!(matches!(
        store.add_client("", "AAAA", false),
        Err(VaultError::InvalidClientId)
    ));
}

// ---------------------------------------------------------------------------
// Vault facade without the agent
// ---------------------------------------------------------------------------

#[test]
fn no_cache_vault_is_local() {
    let dir = TempDir::new().unwrap();
    let mut config = Config::new(dir.path().join("v.vault"), dir.path().join("s"));
    config.no_cache = true;
    config.password_source = PasswordSource::Spec("pass:pw".into());

    let mut vault = Vault::open(&config, true).unwrap();
    assert!(matches!(vault, Vault::Local(_)));

    vault
        .modify_secrets(|map| {
            map.insert("x".into(), "XXXX".into());
            Ok(())
        })
        .unwrap();
    assert_eq!(vault.get_secret("x").unwrap(), "XXXX");

    // Nothing talked to an agent.
    assert!(!dir.path().join("s").exists());
}
