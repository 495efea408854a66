//! # Storage Traits
//!
//! Abstractions over the external collaborators: the remote collection
//! store, the account service, and the key-value preference store. The
//! domain layer works against these traits so the file-backed and the
//! listener-based backends stay interchangeable.

use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast;

/// Build the collection path for a user's todos.
pub fn todos_path(account_id: &str) -> String {
    format!("users/{}/todos", account_id)
}

/// Trait defining the interface for the remote mutable collection.
///
/// A `write` replaces the whole value at `path` in one shot and is
/// re-delivered to every subscriber of that path, including the writer
/// itself (self-echo). Snapshots carry raw JSON; defensive record
/// parsing is the listener's job.
#[async_trait]
pub trait CollectionStore: Send + Sync {
    /// Replace the value stored at `path`.
    async fn write(&self, path: &str, value: Value) -> Result<()>;

    /// Read the current value at `path` once. Missing paths read as
    /// an empty collection, not an error.
    async fn read_once(&self, path: &str) -> Result<Value>;

    /// Subscribe to snapshot notifications for `path`. Every write to
    /// the path is delivered as the full current value.
    async fn subscribe(&self, path: &str) -> Result<broadcast::Receiver<Value>>;

    /// Tear down the subscription channel for `path`. Outstanding
    /// receivers observe a closed channel.
    async fn unsubscribe(&self, path: &str) -> Result<()>;
}

/// Authentication failures surfaced to the user. The message is all the
/// structure there is; callers display it and move on.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("An account with this email already exists")]
    EmailTaken,
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("Email and password must not be blank and email must contain '@'")]
    MalformedCredentials,
    #[error("Account service failure: {0}")]
    Backend(String),
}

/// Trait defining the interface for the account service.
#[async_trait]
pub trait AccountService: Send + Sync {
    /// Create an account and return its backend-assigned id.
    async fn sign_up(&self, email: &str, password: &str) -> Result<String, AuthError>;

    /// Authenticate and return the account id.
    async fn sign_in(&self, email: &str, password: &str) -> Result<String, AuthError>;

    /// End the authenticated session.
    async fn sign_out(&self) -> Result<(), AuthError>;
}

/// Trait defining the interface for the local key-value preference
/// store (first-launch flag, remembered credentials).
pub trait PreferenceStore: Send + Sync {
    fn get_string(&self, key: &str) -> Option<String>;
    fn put_string(&self, key: &str, value: &str) -> Result<()>;
    fn get_bool(&self, key: &str) -> Option<bool>;
    fn put_bool(&self, key: &str, value: bool) -> Result<()>;
    fn remove(&self, key: &str) -> Result<()>;
}

/// Well-known preference keys.
pub mod pref_keys {
    pub const FIRST_LAUNCH: &str = "firstLaunch";
    pub const REMEMBERED_EMAIL: &str = "rememberedEmail";
    pub const REMEMBERED_PASSWORD: &str = "rememberedPassword";
}
