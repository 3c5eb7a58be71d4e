//! The client-id to secret map and the single-client operations on it.
//!
//! These functions are the only place the add/remove/rename rules live.
//! `LocalStore` runs them through `modify_secrets`, and the agent runs
//! them under its store lock, so both paths enforce the same rules.

use std::collections::BTreeMap;

use crate::errors::{Result, VaultError};

/// Client identifier -> shared secret (usually a base32 TOTP seed).
pub type SecretMap = BTreeMap<String, String>;

/// Client IDs must be non-empty; anything else is compared byte for byte.
pub fn validate_client_id(client_id: &str) -> Result<()> {
    if client_id.is_empty() {
        return Err(VaultError::InvalidClientId);
    }
    Ok(())
}

/// Look up the secret for `client_id`.
pub fn get_secret(secrets: &SecretMap, client_id: &str) -> Result<String> {
    secrets
        .get(client_id)
        .cloned()
        .ok_or_else(|| VaultError::ClientNotFound(client_id.to_string()))
}

/// Insert a client.  An existing ID is only replaced when `overwrite` is set.
pub fn add_client(
    secrets: &mut SecretMap,
    client_id: &str,
    secret: &str,
    overwrite: bool,
) -> Result<()> {
    validate_client_id(client_id)?;
    if !overwrite && secrets.contains_key(client_id) {
        return Err(VaultError::ClientAlreadyExists(client_id.to_string()));
    }
    secrets.insert(client_id.to_string(), secret.to_string());
    Ok(())
}

/// Remove a client.  Removing an absent ID is a no-op.
///
/// Returns whether anything was removed.
pub fn remove_client(secrets: &mut SecretMap, client_id: &str) -> bool {
    secrets.remove(client_id).is_some()
}

/// Move the secret of `old_id` under `new_id`.
///
/// Fails without touching the map when `old_id` is missing or `new_id`
/// is already taken.  Renaming a client to itself is a no-op.
pub fn rename_client(secrets: &mut SecretMap, old_id: &str, new_id: &str) -> Result<()> {
    validate_client_id(new_id)?;
    if !secrets.contains_key(old_id) {
        return Err(VaultError::ClientNotFound(old_id.to_string()));
    }
    if old_id == new_id {
        return Ok(());
    }
    if secrets.contains_key(new_id) {
        return Err(VaultError::ClientAlreadyExists(new_id.to_string()));
    }

    if let Some(secret) = secrets.remove(old_id) {
        secrets.insert(new_id.to_string(), secret);
    }
    Ok(())
}

/// All client IDs, sorted.
pub fn list_clients(secrets: &SecretMap) -> Vec<String> {
    secrets.keys().cloned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn map(pairs: &[(&str, &str)]) -> SecretMap {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn add_rejects_existing_without_overwrite() {
        let mut secrets = map(&[("svc1", "AAAA")]);
        let err = add_client(&mut secrets, "svc1", "BBBB", false).unwrap_err();
        assert!(matches!(err, VaultError::ClientAlreadyExists(ref id) if id == "svc1"));
        assert_eq!(secrets["svc1"], "AAAA");
    }

    #[test]
    fn add_with_overwrite_replaces() {
        let mut secrets = map(&[("svc1", "AAAA")]);
        add_client(&mut secrets, "svc1", "BBBB", true).unwrap();
        assert_eq!(secrets["svc1"], "BBBB");
    }

    #[test]
    fn add_rejects_empty_id() {
        let mut secrets = SecretMap::new();
        assert!(matches!(
            add_client(&mut secrets, "", "AAAA", true),
            Err(VaultError::InvalidClientId)
        ));
    }

    #[test]
    fn remove_is_idempotent() {
        let mut secrets = map(&[("a", "1")]);
        assert!(remove_client(&mut secrets, "a"));
        assert!(!remove_client(&mut secrets, "a"));
        assert!(secrets.is_empty());
    }

    #[test]
    fn rename_moves_secret() {
        let mut secrets = map(&[("a", "1")]);
        rename_client(&mut secrets, "a", "b").unwrap();
        assert_eq!(secrets, map(&[("b", "1")]));
    }

    #[test]
    fn rename_onto_existing_leaves_both() {
        let mut secrets = map(&[("a", "1"), ("b", "2")]);
        let err = rename_client(&mut secrets, "a", "b").unwrap_err();
        assert!(matches!(err, VaultError::ClientAlreadyExists(ref id) if id == "b"));
        assert_eq!(secrets, map(&[("a", "1"), ("b", "2")]));
    }

    #[test]
    fn rename_missing_source_fails() {
        let mut secrets = map(&[("b", "2")]);
        assert!(matches!(
            rename_client(&mut secrets, "a", "c"),
            Err(VaultError::ClientNotFound(_))
        ));
    }

    #[test]
    fn rename_to_self_is_noop() {
        let mut secrets = map(&[("a", "1")]);
        rename_client(&mut secrets, "a", "a").unwrap();
        assert_eq!(secrets, map(&[("a", "1")]));
    }

    #[test]
    fn ids_compare_by_exact_bytes() {
        let mut secrets = map(&[("GitHub", "1")]);
        add_client(&mut secrets, "github", "2", false).unwrap();
        assert_eq!(list_clients(&secrets), vec!["GitHub", "github"]);
    }
}
