//! Session manager: the single source of truth for "who is logged in".
//!
//! State lives in a `watch` channel. Every transition publishes one whole
//! `SessionState`, so subscribers never observe a half-applied change. The
//! authorization header on the shared `ApiClient` is always written before a
//! user becomes visible and cleared as soon as the user is withdrawn.

use super::error::SessionError;
use super::profile::{ProfileUpdate, SessionToken, UserProfile};
use crate::api::{ApiClient, SignUpRequest};
use crate::store::{self, CredentialStore, PersistedSession};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tokio::sync::watch;

/// Snapshot of the session as seen by consumers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionState {
    pub user: Option<UserProfile>,
    /// True while stored credentials are being checked at startup or
    /// cleared during sign-out.
    pub is_restoring: bool,
}

impl SessionState {
    fn initial() -> Self {
        Self {
            user: None,
            is_restoring: true,
        }
    }

    pub fn phase(&self) -> SessionPhase {
        match (&self.user, self.is_restoring) {
            (Some(_), _) => SessionPhase::Authenticated,
            (None, true) => SessionPhase::Restoring,
            (None, false) => SessionPhase::Unauthenticated,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    Restoring,
    Authenticated,
    Unauthenticated,
}

pub struct SessionManager {
    store: Arc<dyn CredentialStore>,
    api: ApiClient,
    state: watch::Sender<SessionState>,
    restore_started: AtomicBool,
}

impl SessionManager {
    /// New manager in the `Restoring` state. Call [`restore`](Self::restore)
    /// once at startup.
    pub fn new(store: Arc<dyn CredentialStore>, api: ApiClient) -> Self {
        let (state, _) = watch::channel(SessionState::initial());
        Self {
            store,
            api,
            state,
            restore_started: AtomicBool::new(false),
        }
    }

    /// API client carrying this session's authorization.
    pub fn api(&self) -> &ApiClient {
        &self.api
    }

    /// Where credentials are persisted (for status output).
    pub fn storage_info(&self) -> String {
        self.store.describe()
    }

    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    pub fn current_user(&self) -> Option<UserProfile> {
        self.state.borrow().user.clone()
    }

    pub fn is_restoring(&self) -> bool {
        self.state.borrow().is_restoring
    }

    /// Receiver notified on every state transition.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Rebuild the session from stored credentials.
    ///
    /// Runs once per manager; later calls return the current state without
    /// touching storage. Storage failures leave the session signed out.
    pub async fn restore(&self) -> SessionState {
        if self.restore_started.swap(true, Ordering::SeqCst) {
            tracing::warn!("Session restore already ran, ignoring");
            return self.state();
        }

        tracing::debug!("Restoring session from {}", self.store.describe());

        let persisted = match store::load_pair(self.store.as_ref()) {
            Ok(persisted) => persisted,
            Err(e) => {
                tracing::warn!("Failed to read stored credentials, starting signed out: {}", e);
                None
            }
        };

        let user = persisted.and_then(|PersistedSession { profile, token }| {
            match ApiClient::bearer_value(&token) {
                Ok(value) => {
                    self.api.set_authorization(value);
                    Some(profile)
                }
                Err(e) => {
                    tracing::warn!("Stored token is unusable, starting signed out: {}", e);
                    None
                }
            }
        });

        match &user {
            Some(profile) => tracing::info!("Restored session for {}", profile.email),
            None => tracing::info!("No stored session"),
        }

        self.publish(user, false);
        self.state()
    }

    /// Authenticate against the API and persist the new session.
    ///
    /// On any failure the in-memory state, the authorization header and the
    /// stored credentials are left as they were.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<UserProfile, SessionError> {
        tracing::debug!("Signing in {}", email);

        let response = self.api.sign_in(email, password).await.inspect_err(|e| {
            tracing::warn!("Sign-in request failed: {}", e);
        })?;

        let profile = response.user.ok_or(SessionError::MissingField("profile"))?;
        let token = response
            .token
            .and_then(SessionToken::new)
            .ok_or(SessionError::MissingField("token"))?;
        let header = ApiClient::bearer_value(&token)?;

        // The header changes only after the pair is persisted
        store::save_pair(self.store.as_ref(), &profile, &token).inspect_err(|e| {
            tracing::error!("Failed to persist session, sign-in aborted: {}", e);
        })?;

        self.api.set_authorization(header);
        self.publish(Some(profile.clone()), false);

        tracing::info!("Signed in as {}", profile.email);
        Ok(profile)
    }

    /// Register a new account and sign straight into it.
    pub async fn sign_up(
        &self,
        name: &str,
        email: &str,
        password: &str,
    ) -> Result<UserProfile, SessionError> {
        let account = SignUpRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        account.validate().map_err(SessionError::Validation)?;

        self.api.sign_up(&account).await?;
        tracing::info!("Account created for {}", account.email);

        self.sign_in(&account.email, password).await
    }

    /// End the session.
    ///
    /// The user is withdrawn and the authorization header cleared before
    /// storage is touched. A storage failure is logged and returned, but the
    /// session is signed out either way.
    pub async fn sign_out(&self) -> Result<(), SessionError> {
        let previous = self.current_user();

        self.publish(None, true);
        self.api.clear_authorization();

        let cleanup = store::clear_pair(self.store.as_ref());
        if let Err(e) = &cleanup {
            tracing::warn!("Failed to remove stored credentials: {}", e);
        }

        self.publish(None, false);

        match previous {
            Some(profile) => tracing::info!("Signed out {}", profile.email),
            None => tracing::debug!("Sign-out without an active session"),
        }

        cleanup.map_err(SessionError::from)
    }

    /// Replace the in-memory user wholesale. Does not persist.
    ///
    /// Ignored when nobody is signed in.
    pub fn update_profile(&self, profile: UserProfile) {
        let replaced = self.state.send_if_modified(|state| {
            if state.user.is_none() {
                return false;
            }
            let changed = state.user.as_ref() != Some(&profile);
            state.user = Some(profile);
            changed
        });

        if !replaced && self.current_user().is_none() {
            tracing::warn!("Profile update ignored: no active session");
        }
    }

    /// Send a profile update to the API, then refresh the session and the
    /// cached profile with the new name.
    pub async fn save_profile(&self, update: ProfileUpdate) -> Result<UserProfile, SessionError> {
        let current = self.current_user().ok_or(SessionError::NotAuthenticated)?;

        let update = update.normalized();
        update.validate().map_err(SessionError::Validation)?;

        self.api.update_profile(&update).await?;

        let updated = UserProfile {
            name: update.name,
            ..current
        };
        self.update_profile(updated.clone());

        // The session may have ended while the request was in flight
        if self.current_user().as_ref() == Some(&updated)
            && let Err(e) = store::save_profile(self.store.as_ref(), &updated)
        {
            tracing::warn!("Profile updated but cached copy not refreshed: {}", e);
        }

        tracing::info!("Profile updated for {}", updated.email);
        Ok(updated)
    }

    fn publish(&self, user: Option<UserProfile>, is_restoring: bool) {
        self.state.send_replace(SessionState { user, is_restoring });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MemoryStore, StoreKey};

    fn manager_with(store: Arc<MemoryStore>) -> SessionManager {
        let api = ApiClient::new("http://localhost:3333").unwrap();
        SessionManager::new(store, api)
    }

    fn lucas() -> UserProfile {
        UserProfile {
            id: "1".to_string(),
            name: "Lucas".to_string(),
            email: "lucass.mark@gmail.com".to_string(),
            avatar: None,
        }
    }

    #[test]
    fn test_phase_mapping() {
        assert_eq!(SessionState::initial().phase(), SessionPhase::Restoring);
        let signed_in = SessionState {
            user: Some(lucas()),
            is_restoring: false,
        };
        assert_eq!(signed_in.phase(), SessionPhase::Authenticated);
        let signed_out = SessionState {
            user: None,
            is_restoring: false,
        };
        assert_eq!(signed_out.phase(), SessionPhase::Unauthenticated);
    }

    #[tokio::test]
    async fn test_restore_runs_once() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store.clone());

        let first = manager.restore().await;
        assert_eq!(first.phase(), SessionPhase::Unauthenticated);

        // Credentials written afterwards are not picked up by a second call
        store::save_pair(&*store, &lucas(), &SessionToken::new("abc123").unwrap()).unwrap();
        let second = manager.restore().await;
        assert_eq!(second, first);
        assert_eq!(manager.api().authorization(), None);
    }

    #[tokio::test]
    async fn test_update_profile_requires_session() {
        let store = Arc::new(MemoryStore::new());
        let manager = manager_with(store);
        manager.restore().await;

        manager.update_profile(lucas());
        assert_eq!(manager.current_user(), None);
    }

    #[tokio::test]
    async fn test_update_profile_replaces_user_without_persisting() {
        let store = Arc::new(MemoryStore::new());
        store::save_pair(&*store, &lucas(), &SessionToken::new("abc123").unwrap()).unwrap();
        let manager = manager_with(store.clone());
        manager.restore().await;

        let renamed = UserProfile {
            name: "Lucas Mark".to_string(),
            ..lucas()
        };
        manager.update_profile(renamed.clone());
        assert_eq!(manager.current_user(), Some(renamed));

        let cached: UserProfile =
            serde_json::from_str(&store.get(StoreKey::Profile).unwrap().unwrap()).unwrap();
        assert_eq!(cached, lucas());
    }

    #[tokio::test]
    async fn test_save_profile_requires_session() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        manager.restore().await;

        let err = manager
            .save_profile(ProfileUpdate::rename("Lucas"))
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_sign_up_validates_before_calling_api() {
        let manager = manager_with(Arc::new(MemoryStore::new()));
        manager.restore().await;

        let err = manager.sign_up("", "a@b.com", "123456").await.unwrap_err();
        assert!(matches!(err, SessionError::Validation(_)));
        assert_eq!(manager.current_user(), None);
    }
}
