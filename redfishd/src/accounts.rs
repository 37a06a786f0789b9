//! The local account store.
//!
//! The seam between the HTTP surface and whatever credential backend the
//! BMC uses. This implementation keeps argon2 password hashes in memory and
//! backs both session login and Basic authentication. TOTP secret keys are
//! generated here and handed to the client exactly once.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use rand::Rng;
use tracing::warn;

use redfishd_core::CredentialVerifier;

/// Default bootstrap credentials, replaced on first password change.
const DEFAULT_USERNAME: &str = "root";
const DEFAULT_PASSWORD: &str = "0penBmc";

struct Account {
    role: String,
    enabled: bool,
    password_hash: String,
    secret_key: Option<String>,
}

/// Read-only view of an account for resource documents.
#[derive(Debug, Clone)]
pub struct AccountView {
    pub username: String,
    pub role: String,
    pub enabled: bool,
}

#[derive(Debug, PartialEq, Eq)]
pub enum AccountError {
    AlreadyExists,
    NotFound,
    HashFailure,
}

pub struct AccountStore {
    accounts: Mutex<HashMap<String, Account>>,
}

impl AccountStore {
    pub fn new() -> AccountStore {
        AccountStore {
            accounts: Mutex::new(HashMap::new()),
        }
    }

    /// A store seeded with the factory-default administrator.
    pub fn with_defaults() -> AccountStore {
        let store = AccountStore::new();
        if let Err(e) = store.add(DEFAULT_USERNAME, DEFAULT_PASSWORD, "Administrator") {
            warn!(?e, "failed to seed the default account");
        }
        store
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, Account>> {
        self.accounts.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn hash(password: &str) -> Result<String, AccountError> {
        let salt = SaltString::generate(&mut OsRng);
        Argon2::default()
            .hash_password(password.as_bytes(), &salt)
            .map(|h| h.to_string())
            .map_err(|_| AccountError::HashFailure)
    }

    pub fn add(&self, username: &str, password: &str, role: &str) -> Result<(), AccountError> {
        let hash = Self::hash(password)?;
        let mut accounts = self.lock();
        if accounts.contains_key(username) {
            return Err(AccountError::AlreadyExists);
        }
        accounts.insert(
            username.to_string(),
            Account {
                role: role.to_string(),
                enabled: true,
                password_hash: hash,
                secret_key: None,
            },
        );
        Ok(())
    }

    pub fn remove(&self, username: &str) -> Result<(), AccountError> {
        self.lock()
            .remove(username)
            .map(|_| ())
            .ok_or(AccountError::NotFound)
    }

    /// Verify credentials; a disabled account never authenticates.
    pub fn verify(&self, username: &str, password: &str) -> Option<String> {
        let accounts = self.lock();
        let account = accounts.get(username)?;
        if !account.enabled {
            return None;
        }
        let parsed = PasswordHash::new(&account.password_hash).ok()?;
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .ok()?;
        Some(account.role.clone())
    }

    pub fn set_password(&self, username: &str, password: &str) -> Result<(), AccountError> {
        let hash = Self::hash(password)?;
        let mut accounts = self.lock();
        let account = accounts.get_mut(username).ok_or(AccountError::NotFound)?;
        account.password_hash = hash;
        Ok(())
    }

    pub fn set_role(&self, username: &str, role: &str) -> Result<(), AccountError> {
        let mut accounts = self.lock();
        let account = accounts.get_mut(username).ok_or(AccountError::NotFound)?;
        account.role = role.to_string();
        Ok(())
    }

    pub fn get(&self, username: &str) -> Option<AccountView> {
        let accounts = self.lock();
        accounts.get(username).map(|a| AccountView {
            username: username.to_string(),
            role: a.role.clone(),
            enabled: a.enabled,
        })
    }

    pub fn usernames(&self) -> Vec<String> {
        let mut names: Vec<String> = self.lock().keys().cloned().collect();
        names.sort();
        names
    }

    /// Generate and store a fresh TOTP secret key. The caller sees the key
    /// this one time; afterwards only its presence is observable.
    pub fn generate_secret_key(&self, username: &str) -> Result<String, AccountError> {
        // RFC 4648 base32 alphabet, 160 bits of seed.
        const ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ234567";
        let mut rng = rand::thread_rng();
        let key: String = (0..32)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        let mut accounts = self.lock();
        let account = accounts.get_mut(username).ok_or(AccountError::NotFound)?;
        account.secret_key = Some(key.clone());
        Ok(key)
    }

    pub fn has_secret_key(&self, username: &str) -> bool {
        self.lock()
            .get(username)
            .map(|a| a.secret_key.is_some())
            .unwrap_or(false)
    }
}

impl Default for AccountStore {
    fn default() -> Self {
        AccountStore::new()
    }
}

/// [`CredentialVerifier`] adapter handing Basic auth to the store.
pub struct AccountVerifier(pub Arc<AccountStore>);

impl CredentialVerifier for AccountVerifier {
    fn verify(&self, username: &str, password: &str) -> Option<String> {
        self.0.verify(username, password)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn verify_round_trip() {
        let store = AccountStore::new();
        store.add("alice", "correct horse", "ReadOnly").unwrap();
        assert_eq!(store.verify("alice", "correct horse").as_deref(), Some("ReadOnly"));
        assert_eq!(store.verify("alice", "wrong"), None);
        assert_eq!(store.verify("nobody", "correct horse"), None);
    }

    #[test]
    fn duplicate_accounts_are_rejected() {
        let store = AccountStore::new();
        store.add("alice", "pw1", "ReadOnly").unwrap();
        assert_eq!(
            store.add("alice", "pw2", "Operator"),
            Err(AccountError::AlreadyExists)
        );
    }

    #[test]
    fn password_change_invalidates_the_old_one() {
        let store = AccountStore::new();
        store.add("alice", "old", "ReadOnly").unwrap();
        store.set_password("alice", "new").unwrap();
        assert!(store.verify("alice", "old").is_none());
        assert!(store.verify("alice", "new").is_some());
    }

    #[test]
    fn secret_keys_are_base32_and_sticky() {
        let store = AccountStore::new();
        store.add("alice", "pw", "ReadOnly").unwrap();
        assert!(!store.has_secret_key("alice"));
        let key = store.generate_secret_key("alice").unwrap();
        assert_eq!(key.len(), 32);
        assert!(key
            .chars()
            .all(|c| c.is_ascii_uppercase() || ('2'..='7').contains(&c)));
        assert!(store.has_secret_key("alice"));
        assert_eq!(
            store.generate_secret_key("nobody"),
            Err(AccountError::NotFound)
        );
    }

    #[test]
    fn defaults_seed_the_factory_account() {
        let store = AccountStore::with_defaults();
        assert_eq!(
            store.verify("root", "0penBmc").as_deref(),
            Some("Administrator")
        );
    }
}
