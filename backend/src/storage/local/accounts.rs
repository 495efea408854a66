//! Local-auth account service.
//!
//! Accounts live in a single JSON file keyed by email, with uuid
//! account ids and the locally remembered password. This is the
//! local-only variant; a hosted auth service would implement the same
//! trait.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};
use uuid::Uuid;

use crate::storage::traits::{AccountService, AuthError};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct AccountRecord {
    id: String,
    email: String,
    password: String,
}

pub struct LocalAccountService {
    path: PathBuf,
    accounts: Mutex<HashMap<String, AccountRecord>>,
}

impl LocalAccountService {
    /// Open (or create) the account file at `path`.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let accounts = if path.exists() {
            let raw = fs::read_to_string(&path)?;
            match serde_json::from_str(&raw) {
                Ok(accounts) => accounts,
                Err(e) => {
                    warn!("Account file {} unreadable, starting fresh: {}", path.display(), e);
                    HashMap::new()
                }
            }
        } else {
            HashMap::new()
        };

        Ok(Self {
            path,
            accounts: Mutex::new(accounts),
        })
    }

    fn persist(&self, accounts: &HashMap<String, AccountRecord>) -> Result<(), AuthError> {
        let write = || -> Result<()> {
            if let Some(parent) = self.path.parent() {
                fs::create_dir_all(parent)?;
            }
            let temp_path = self.path.with_extension("tmp");
            fs::write(&temp_path, serde_json::to_string_pretty(accounts)?)?;
            fs::rename(&temp_path, &self.path)?;
            Ok(())
        };
        write().map_err(|e| AuthError::Backend(e.to_string()))
    }

    fn validate(email: &str, password: &str) -> Result<(), AuthError> {
        if email.trim().is_empty() || password.is_empty() || !email.contains('@') {
            return Err(AuthError::MalformedCredentials);
        }
        Ok(())
    }
}

#[async_trait]
impl AccountService for LocalAccountService {
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AuthError> {
        Self::validate(email, password)?;

        let mut accounts = self.accounts.lock().unwrap();
        if accounts.contains_key(email) {
            return Err(AuthError::EmailTaken);
        }

        let record = AccountRecord {
            id: Uuid::new_v4().to_string(),
            email: email.to_string(),
            password: password.to_string(),
        };
        let id = record.id.clone();
        accounts.insert(email.to_string(), record);
        self.persist(&accounts)?;

        info!("Created account for {}", email);
        Ok(id)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError> {
        let accounts = self.accounts.lock().unwrap();
        match accounts.get(email) {
            Some(record) if record.password == password => Ok(record.id.clone()),
            _ => Err(AuthError::InvalidCredentials),
        }
    }

    async fn sign_out(&self) -> Result<(), AuthError> {
        // Nothing server-side to tear down in the local variant.
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_service() -> (LocalAccountService, TempDir) {
        let dir = TempDir::new().unwrap();
        let service = LocalAccountService::open(dir.path().join("accounts.json")).unwrap();
        (service, dir)
    }

    #[tokio::test]
    async fn test_sign_up_then_sign_in() {
        let (service, _dir) = test_service();

        let id = service.sign_up("a@b.com", "hunter2").await.unwrap();
        assert!(!id.is_empty());

        let same = service.sign_in("a@b.com", "hunter2").await.unwrap();
        assert_eq!(id, same);
    }

    #[tokio::test]
    async fn test_duplicate_email_rejected() {
        let (service, _dir) = test_service();

        service.sign_up("a@b.com", "hunter2").await.unwrap();
        assert!(matches!(
            service.sign_up("a@b.com", "other").await,
            Err(AuthError::EmailTaken)
        ));
    }

    #[tokio::test]
    async fn test_malformed_credentials_rejected() {
        let (service, _dir) = test_service();

        assert!(matches!(
            service.sign_up("no-at-sign", "pw").await,
            Err(AuthError::MalformedCredentials)
        ));
        assert!(matches!(
            service.sign_up("", "pw").await,
            Err(AuthError::MalformedCredentials)
        ));
        assert!(matches!(
            service.sign_up("a@b.com", "").await,
            Err(AuthError::MalformedCredentials)
        ));
    }

    #[tokio::test]
    async fn test_wrong_password_rejected() {
        let (service, _dir) = test_service();

        service.sign_up("a@b.com", "hunter2").await.unwrap();
        assert!(matches!(
            service.sign_in("a@b.com", "wrong").await,
            Err(AuthError::InvalidCredentials)
        ));
        assert!(matches!(
            service.sign_in("nobody@b.com", "hunter2").await,
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_accounts_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("accounts.json");

        let id = {
            let service = LocalAccountService::open(&path).unwrap();
            service.sign_up("a@b.com", "hunter2").await.unwrap()
        };

        let reopened = LocalAccountService::open(&path).unwrap();
        assert_eq!(reopened.sign_in("a@b.com", "hunter2").await.unwrap(), id);
    }
}
