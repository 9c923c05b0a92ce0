//! Credential storage with platform keyring and file-based fallback.
//!
//! Two logical keys are kept: the serialized user profile and the raw
//! bearer token. Backends only know about single keys; the pair helpers at
//! the bottom of this module treat profile and token as one unit.
//!
//! Storage priority when the keyring backend is selected:
//! 1. Platform keyring (if `keyring-storage` feature enabled and available)
//! 2. File-based storage in the gymtrack config directory

mod file;
#[cfg(feature = "keyring-storage")]
mod keychain;
mod memory;

pub use file::FileStore;
#[cfg(feature = "keyring-storage")]
pub use keychain::KeyringStore;
pub use memory::MemoryStore;

use crate::auth::{SessionToken, UserProfile};
use crate::config::{ClientConfig, StorageBackend};
use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Logical entries held by a credential store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreKey {
    /// Serialized `UserProfile` (JSON)
    Profile,
    /// Raw bearer token
    Token,
}

impl StoreKey {
    /// Namespaced name of the entry.
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKey::Profile => "gymtrack.user",
            StoreKey::Token => "gymtrack.token",
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("credential storage unavailable: {0}")]
    Unavailable(String),

    #[error("credential storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("corrupt {key} entry: {reason}")]
    Corrupt { key: StoreKey, reason: String },
}

/// Durable key/value persistence for session credentials.
///
/// Implementations never drop a write silently: a failed `save` or
/// `remove` is returned to the caller. Removing an absent key succeeds.
pub trait CredentialStore: Send + Sync {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError>;

    fn save(&self, key: StoreKey, value: &str) -> Result<(), StoreError>;

    fn remove(&self, key: StoreKey) -> Result<(), StoreError>;

    /// Human-readable description of where entries live.
    fn describe(&self) -> String;
}

/// Open the credential store selected by the configuration.
pub fn open_store(config: &ClientConfig) -> Result<Arc<dyn CredentialStore>, StoreError> {
    let store: Arc<dyn CredentialStore> = match config.storage {
        StorageBackend::Memory => Arc::new(MemoryStore::new()),
        StorageBackend::File => Arc::new(file_store(config)?),
        StorageBackend::Keyring => keyring_or_file(file_store(config)?),
    };
    tracing::debug!("Credential storage: {}", store.describe());
    Ok(store)
}

fn file_store(config: &ClientConfig) -> Result<FileStore, StoreError> {
    match &config.storage_dir {
        Some(dir) => Ok(FileStore::new(dir.clone())),
        None => FileStore::default_location(),
    }
}

#[cfg(feature = "keyring-storage")]
fn keyring_or_file(fallback: FileStore) -> Arc<dyn CredentialStore> {
    Arc::new(KeyringStore::new(fallback))
}

#[cfg(not(feature = "keyring-storage"))]
fn keyring_or_file(fallback: FileStore) -> Arc<dyn CredentialStore> {
    tracing::warn!("Keyring storage not compiled in, using file storage");
    Arc::new(fallback)
}

// ============================================================================
// Profile + token pair
// ============================================================================

/// A profile and token that were persisted together.
#[derive(Debug, Clone, PartialEq)]
pub struct PersistedSession {
    pub profile: UserProfile,
    pub token: SessionToken,
}

/// Read the persisted pair.
///
/// Returns `None` unless both entries exist. An orphaned entry (profile
/// without token or the reverse) is removed and reported as absent.
pub fn load_pair(store: &dyn CredentialStore) -> Result<Option<PersistedSession>, StoreError> {
    let profile_raw = store.get(StoreKey::Profile)?;
    let token_raw = store.get(StoreKey::Token)?;

    match (profile_raw, token_raw) {
        (Some(profile_raw), Some(token_raw)) => {
            let profile: UserProfile =
                serde_json::from_str(&profile_raw).map_err(|e| StoreError::Corrupt {
                    key: StoreKey::Profile,
                    reason: e.to_string(),
                })?;
            let token = SessionToken::new(token_raw).ok_or(StoreError::Corrupt {
                key: StoreKey::Token,
                reason: "empty token".to_string(),
            })?;
            Ok(Some(PersistedSession { profile, token }))
        }
        (None, None) => Ok(None),
        (Some(_), None) => {
            tracing::warn!("Stored profile has no matching token, discarding it");
            discard(store, StoreKey::Profile);
            Ok(None)
        }
        (None, Some(_)) => {
            tracing::warn!("Stored token has no matching profile, discarding it");
            discard(store, StoreKey::Token);
            Ok(None)
        }
    }
}

/// Persist a profile and token as one unit.
///
/// Both writes are attempted. If either fails, the entries that were stored
/// before the call are put back and the error is returned.
pub fn save_pair(
    store: &dyn CredentialStore,
    profile: &UserProfile,
    token: &SessionToken,
) -> Result<(), StoreError> {
    let json = serialize_profile(profile)?;

    let previous_profile = store.get(StoreKey::Profile)?;
    let previous_token = store.get(StoreKey::Token)?;

    let written = store
        .save(StoreKey::Profile, &json)
        .and_then(|()| store.save(StoreKey::Token, token.as_str()));

    if let Err(e) = written {
        tracing::warn!("Failed to persist session, restoring previous entries: {}", e);
        restore_entry(store, StoreKey::Profile, previous_profile.as_deref());
        restore_entry(store, StoreKey::Token, previous_token.as_deref());
        return Err(e);
    }

    tracing::debug!("Session persisted for user {}", profile.id);
    Ok(())
}

/// Overwrite only the cached profile, keeping the stored token.
pub fn save_profile(store: &dyn CredentialStore, profile: &UserProfile) -> Result<(), StoreError> {
    let json = serialize_profile(profile)?;
    store.save(StoreKey::Profile, &json)
}

/// Remove both entries. Both removals are attempted; the first error wins.
pub fn clear_pair(store: &dyn CredentialStore) -> Result<(), StoreError> {
    let profile = store.remove(StoreKey::Profile);
    let token = store.remove(StoreKey::Token);
    profile.and(token)
}

fn serialize_profile(profile: &UserProfile) -> Result<String, StoreError> {
    serde_json::to_string(profile).map_err(|e| StoreError::Corrupt {
        key: StoreKey::Profile,
        reason: e.to_string(),
    })
}

fn restore_entry(store: &dyn CredentialStore, key: StoreKey, previous: Option<&str>) {
    let result = match previous {
        Some(value) => store.save(key, value),
        None => store.remove(key),
    };
    if let Err(e) = result {
        tracing::error!("Failed to restore previous {} entry: {}", key, e);
    }
}

fn discard(store: &dyn CredentialStore, key: StoreKey) {
    if let Err(e) = store.remove(key) {
        tracing::warn!("Failed to discard orphaned {} entry: {}", key, e);
    }
}
