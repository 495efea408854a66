//! Session and authentication orchestration.
//!
//! Exactly one user is current at a time. Signing in attaches the sync
//! reconciler's listener for that user (detaching any prior one);
//! logging out detaches it so stale-user data never reaches a new
//! session.

use std::sync::{Arc, Mutex};

use tracing::{info, warn};

use shared::User;

use crate::storage::traits::pref_keys;
use crate::storage::{AccountService, AuthError, PreferenceStore};
use crate::sync::SyncReconciler;

#[derive(Clone)]
struct Identity {
    id: String,
    email: String,
}

pub struct SessionService {
    accounts: Arc<dyn AccountService>,
    prefs: Arc<dyn PreferenceStore>,
    reconciler: Arc<SyncReconciler>,
    current: Mutex<Option<Identity>>,
}

impl SessionService {
    pub fn new(
        accounts: Arc<dyn AccountService>,
        prefs: Arc<dyn PreferenceStore>,
        reconciler: Arc<SyncReconciler>,
    ) -> Self {
        Self {
            accounts,
            prefs,
            reconciler,
            current: Mutex::new(None),
        }
    }

    /// Create an account, seed its empty todo collection, and start the
    /// session.
    pub async fn sign_up(&self, email: &str, password: &str, remember: bool) -> Result<User, AuthError> {
        let account_id = self.accounts.sign_up(email, password).await?;
        info!("Signed up {} as {}", email, account_id);

        self.start_session(&account_id, email, remember, password).await?;
        // New accounts start with an explicitly empty collection.
        self.reconciler.propose(Vec::new());

        Ok(User {
            id: account_id,
            email: email.to_string(),
            todos: Vec::new(),
        })
    }

    /// Authenticate and start the session; todos arrive through the
    /// listener.
    pub async fn sign_in(&self, email: &str, password: &str, remember: bool) -> Result<User, AuthError> {
        let account_id = self.accounts.sign_in(email, password).await?;
        info!("Signed in {} as {}", email, account_id);

        self.start_session(&account_id, email, remember, password).await?;

        Ok(User {
            id: account_id,
            email: email.to_string(),
            todos: self.reconciler.current(),
        })
    }

    async fn start_session(
        &self,
        account_id: &str,
        email: &str,
        remember: bool,
        password: &str,
    ) -> Result<(), AuthError> {
        self.reconciler
            .attach(account_id)
            .await
            .map_err(|e| AuthError::Backend(e.to_string()))?;

        if remember {
            // Remembering is best-effort; a failed preference write
            // must not fail the sign-in.
            if let Err(e) = self
                .prefs
                .put_string(pref_keys::REMEMBERED_EMAIL, email)
                .and_then(|_| self.prefs.put_string(pref_keys::REMEMBERED_PASSWORD, password))
            {
                warn!("Failed to remember credentials: {}", e);
            }
        }

        *self.current.lock().unwrap() = Some(Identity {
            id: account_id.to_string(),
            email: email.to_string(),
        });
        Ok(())
    }

    /// Auto sign-in from remembered credentials, if any. Failures are
    /// logged and reported as "nobody remembered" rather than errors.
    pub async fn restore_remembered(&self) -> Option<User> {
        let email = self.prefs.get_string(pref_keys::REMEMBERED_EMAIL)?;
        let password = self.prefs.get_string(pref_keys::REMEMBERED_PASSWORD)?;

        match self.sign_in(&email, &password, false).await {
            Ok(user) => Some(user),
            Err(e) => {
                warn!("Remembered sign-in for {} failed: {}", email, e);
                None
            }
        }
    }

    /// End the session: abandon any pending push, detach the listener,
    /// forget credentials.
    pub async fn logout(&self) {
        self.reconciler.detach().await;

        if let Err(e) = self.accounts.sign_out().await {
            warn!("Sign-out reported an error: {}", e);
        }

        for key in [pref_keys::REMEMBERED_EMAIL, pref_keys::REMEMBERED_PASSWORD] {
            if let Err(e) = self.prefs.remove(key) {
                warn!("Failed to clear preference {}: {}", key, e);
            }
        }

        *self.current.lock().unwrap() = None;
        info!("User logged out and listener detached");
    }

    /// The current user with the latest todo snapshot, if signed in.
    pub fn current_user(&self) -> Option<User> {
        let identity = self.current.lock().unwrap().clone()?;
        Some(User {
            id: identity.id,
            email: identity.email,
            todos: self.reconciler.current(),
        })
    }

    /// First-launch tutorial flag; defaults to true until marked seen.
    pub fn is_first_launch(&self) -> bool {
        self.prefs.get_bool(pref_keys::FIRST_LAUNCH).unwrap_or(true)
    }

    pub fn mark_tutorial_seen(&self) {
        if let Err(e) = self.prefs.put_bool(pref_keys::FIRST_LAUNCH, false) {
            warn!("Failed to persist first-launch flag: {}", e);
        }
    }
}
