//! User accounts over the key-value port: registration, the admin approval
//! queue, and the idempotent admin bootstrap.
//!
//! This gates access to the app, nothing more — password handling is a plain
//! digest and hardening is explicitly out of scope.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{info, warn};

use crate::kv::KeyValueStore;

pub const ADMIN_USERNAME: &str = "admin";
const DEFAULT_ADMIN_PASSWORD: &str = "admin1234";
const ACCOUNT_PREFIX: &str = "account/";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("username already taken: {0}")]
    AlreadyExists(String),
    #[error("no such account: {0}")]
    NotFound(String),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserAccount {
    pub username: String,
    pub password_digest: String,
    /// Approved and allowed to sign in.
    pub active: bool,
    /// Waiting in the admin approval queue.
    pub pending: bool,
    pub paid: bool,
    pub admin: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug)]
pub enum LoginOutcome {
    Success(UserAccount),
    /// Credentials are right but the account awaits approval.
    PendingApproval,
    Invalid,
}

pub struct AccountStore {
    kv: Arc<dyn KeyValueStore>,
}

impl AccountStore {
    /// Open the account store and run the admin bootstrap. Safe to call on
    /// every process start; an existing admin record is left untouched.
    pub fn open(kv: Arc<dyn KeyValueStore>) -> Self {
        let store = Self { kv };
        store.ensure_admin();
        store
    }

    fn ensure_admin(&self) {
        if self.load(ADMIN_USERNAME).is_some() {
            return;
        }
        info!("bootstrapping admin account");
        let admin = UserAccount {
            username: ADMIN_USERNAME.to_string(),
            password_digest: digest(DEFAULT_ADMIN_PASSWORD),
            active: true,
            pending: false,
            paid: true,
            admin: true,
            created_at: Utc::now(),
        };
        self.save(&admin);
    }

    fn key(username: &str) -> String {
        format!("{ACCOUNT_PREFIX}{username}")
    }

    fn load(&self, username: &str) -> Option<UserAccount> {
        let raw = self.kv.get(&Self::key(username))?;
        match serde_json::from_str(&raw) {
            Ok(account) => Some(account),
            Err(err) => {
                warn!(username, error = %err, "stored account record unreadable");
                None
            }
        }
    }

    fn save(&self, account: &UserAccount) {
        match serde_json::to_string(account) {
            Ok(raw) => self.kv.set(&Self::key(&account.username), raw),
            Err(err) => warn!(username = %account.username, error = %err, "account serialize failed"),
        }
    }

    /// Register a new account into the approval queue.
    pub fn register(&self, username: &str, password: &str) -> Result<UserAccount, StoreError> {
        if self.load(username).is_some() {
            return Err(StoreError::AlreadyExists(username.to_string()));
        }
        let account = UserAccount {
            username: username.to_string(),
            password_digest: digest(password),
            active: false,
            pending: true,
            paid: false,
            admin: false,
            created_at: Utc::now(),
        };
        self.save(&account);
        info!(username, "account registered, awaiting approval");
        Ok(account)
    }

    pub fn login(&self, username: &str, password: &str) -> LoginOutcome {
        let Some(account) = self.load(username) else {
            return LoginOutcome::Invalid;
        };
        if account.password_digest != digest(password) {
            return LoginOutcome::Invalid;
        }
        if account.pending || !account.active {
            return LoginOutcome::PendingApproval;
        }
        LoginOutcome::Success(account)
    }

    /// Admin approval: pending → active.
    pub fn approve(&self, username: &str) -> Result<(), StoreError> {
        let mut account = self
            .load(username)
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;
        account.pending = false;
        account.active = true;
        self.save(&account);
        info!(username, "account approved");
        Ok(())
    }

    pub fn set_paid(&self, username: &str, paid: bool) -> Result<(), StoreError> {
        let mut account = self
            .load(username)
            .ok_or_else(|| StoreError::NotFound(username.to_string()))?;
        account.paid = paid;
        self.save(&account);
        Ok(())
    }

    pub fn pending_accounts(&self) -> Vec<UserAccount> {
        self.accounts().into_iter().filter(|a| a.pending).collect()
    }

    pub fn accounts(&self) -> Vec<UserAccount> {
        self.kv
            .list(ACCOUNT_PREFIX)
            .into_iter()
            .filter_map(|(_, raw)| serde_json::from_str(&raw).ok())
            .collect()
    }
}

fn digest(password: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(password.as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kv::MemoryStore;

    fn store() -> AccountStore {
        AccountStore::open(Arc::new(MemoryStore::new()))
    }

    #[test]
    fn ensure_admin_is_idempotent() {
        let kv = Arc::new(MemoryStore::new());
        let first = AccountStore::open(kv.clone());
        assert!(first.set_paid(ADMIN_USERNAME, false).is_ok());
        // Re-opening must not reset the existing admin record.
        let second = AccountStore::open(kv);
        let admin = second
            .accounts()
            .into_iter()
            .find(|a| a.username == ADMIN_USERNAME)
            .unwrap();
        assert!(!admin.paid);
        assert!(admin.admin);
    }

    #[test]
    fn registration_enters_the_approval_queue() {
        let store = store();
        store.register("mina", "secret").unwrap();
        assert!(matches!(store.login("mina", "secret"), LoginOutcome::PendingApproval));
        assert_eq!(store.pending_accounts().len(), 1);

        store.approve("mina").unwrap();
        assert!(matches!(store.login("mina", "secret"), LoginOutcome::Success(_)));
        assert!(store.pending_accounts().is_empty());
    }

    #[test]
    fn duplicate_registration_is_rejected() {
        let store = store();
        store.register("mina", "secret").unwrap();
        assert!(matches!(
            store.register("mina", "other"),
            Err(StoreError::AlreadyExists(_))
        ));
    }

    #[test]
    fn wrong_password_is_invalid() {
        let store = store();
        store.register("mina", "secret").unwrap();
        store.approve("mina").unwrap();
        assert!(matches!(store.login("mina", "wrong"), LoginOutcome::Invalid));
        assert!(matches!(store.login("ghost", "secret"), LoginOutcome::Invalid));
    }

    #[test]
    fn admin_can_sign_in_with_bootstrap_credentials() {
        let store = store();
        assert!(matches!(
            store.login(ADMIN_USERNAME, "admin1234"),
            LoginOutcome::Success(a) if a.admin
        ));
    }
}
