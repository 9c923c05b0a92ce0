//! Keyring-based credential storage (optional, platform-specific).
//!
//! Every key maps to one keyring entry under the `gymtrack` service. The
//! file store is used whenever the keyring cannot be reached, and keeps a
//! backup copy after a verified keyring write.
//!
//! Reads prefer the keyring, so a write that ends up in the file only must
//! not leave an older keyring value behind.

use super::{CredentialStore, FileStore, StoreError, StoreKey};
use keyring::Entry;
use std::fmt;
use std::sync::Arc;

/// Service name used for keyring storage
const KEYRING_SERVICE: &str = "gymtrack";

/// Raw keyring operations for one key.
trait Vault: Send + Sync + fmt::Debug {
    fn get(&self, key: StoreKey) -> keyring::Result<String>;
    fn set(&self, key: StoreKey, value: &str) -> keyring::Result<()>;
    fn delete(&self, key: StoreKey) -> keyring::Result<()>;
}

/// The platform keychain.
#[derive(Debug)]
struct PlatformVault;

impl PlatformVault {
    fn entry(key: StoreKey) -> keyring::Result<Entry> {
        tracing::trace!(
            "Creating keyring entry for service='{}', user='{}'",
            KEYRING_SERVICE,
            key
        );

        Entry::new(KEYRING_SERVICE, key.as_str()).inspect_err(|e| {
            tracing::error!(
                "Failed to create keyring entry (service='{}', user='{}'): {}",
                KEYRING_SERVICE,
                key,
                e
            );
        })
    }
}

impl Vault for PlatformVault {
    fn get(&self, key: StoreKey) -> keyring::Result<String> {
        Self::entry(key)?.get_password()
    }

    fn set(&self, key: StoreKey, value: &str) -> keyring::Result<()> {
        Self::entry(key)?.set_password(value)
    }

    fn delete(&self, key: StoreKey) -> keyring::Result<()> {
        Self::entry(key)?.delete_credential()
    }
}

#[derive(Debug, Clone)]
pub struct KeyringStore {
    vault: Arc<dyn Vault>,
    fallback: FileStore,
}

impl KeyringStore {
    pub fn new(fallback: FileStore) -> Self {
        Self {
            vault: Arc::new(PlatformVault),
            fallback,
        }
    }

    /// Write `value` to the file store as the only copy.
    fn save_to_file(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        self.evict(key)?;
        self.fallback.save(key, value)
    }

    /// Remove the keyring copy of `key` so reads fall through to the file.
    fn evict(&self, key: StoreKey) -> Result<(), StoreError> {
        let err = match self.vault.delete(key) {
            Ok(()) | Err(keyring::Error::NoEntry) => return Ok(()),
            Err(e) => e,
        };

        // A keyring that cannot be read either is never preferred over the file
        match self.vault.get(key) {
            Ok(_) => Err(StoreError::Unavailable(format!(
                "failed to clear outdated {} from keyring: {}",
                key, err
            ))),
            Err(_) => {
                tracing::debug!("Keyring unreachable for {}, file copy is authoritative", key);
                Ok(())
            }
        }
    }
}

impl CredentialStore for KeyringStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        match self.vault.get(key) {
            Ok(value) => {
                tracing::debug!("Loaded {} from keyring", key);
                Ok(Some(value))
            }
            Err(keyring::Error::NoEntry) => {
                tracing::debug!("No {} in keyring, trying file fallback", key);
                self.fallback.get(key)
            }
            Err(e) => {
                tracing::warn!(
                    "Failed to load {} from keyring: {}, trying file fallback",
                    key,
                    e
                );
                self.fallback.get(key)
            }
        }
    }

    fn save(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        if let Err(e) = self.vault.set(key, value) {
            tracing::warn!("Failed to save {} to keyring: {}, using file storage", key, e);
            return self.save_to_file(key, value);
        }

        // Verify the save worked
        match self.vault.get(key) {
            Ok(stored) if stored == value => {
                tracing::debug!("{} verified in keyring after save", key);
                // Also save to file as backup
                if let Err(e) = self.fallback.save(key, value) {
                    tracing::debug!("Failed to save backup {} to file: {}", key, e);
                }
                Ok(())
            }
            Ok(_) => {
                tracing::warn!("{} mismatch after save, using file storage as primary", key);
                self.save_to_file(key, value)
            }
            Err(keyring::Error::NoEntry) => {
                tracing::warn!("{} not found after save, falling back to file storage", key);
                self.fallback.save(key, value)
            }
            Err(e) => {
                tracing::warn!("Could not verify {} after save: {}", key, e);
                if let Err(e) = self.fallback.save(key, value) {
                    tracing::warn!("Failed to save backup {} to file: {}", key, e);
                }
                Ok(())
            }
        }
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        // Always delete from file as well
        let file_result = self.fallback.remove(key);

        match self.vault.delete(key) {
            Ok(()) | Err(keyring::Error::NoEntry) => file_result,
            Err(e) => Err(StoreError::Unavailable(format!(
                "failed to delete {} from keyring: {}",
                key, e
            ))),
        }
    }

    fn describe(&self) -> String {
        let platform = if cfg!(target_os = "windows") {
            "Windows Credential Manager"
        } else if cfg!(target_os = "macos") {
            "macOS Keychain"
        } else {
            "Linux Secret Service (GNOME Keyring/KWallet)"
        };
        format!(
            "{} (with file fallback in {})",
            platform,
            self.fallback.dir().display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{SessionToken, UserProfile};
    use crate::store::{load_pair, save_pair};
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};

    /// In-memory keyring with switchable failures.
    #[derive(Debug, Default)]
    struct FakeVault {
        entries: Mutex<HashMap<StoreKey, String>>,
        /// Key whose writes are rejected
        reject_writes: Mutex<Option<StoreKey>>,
        /// Writes succeed but store something else
        corrupt_writes: AtomicBool,
        fail_deletes: AtomicBool,
        /// Every operation fails, as with no secret service running
        offline: AtomicBool,
    }

    fn locked() -> keyring::Error {
        keyring::Error::PlatformFailure("keychain locked".into())
    }

    impl Vault for FakeVault {
        fn get(&self, key: StoreKey) -> keyring::Result<String> {
            if self.offline.load(Ordering::SeqCst) {
                return Err(locked());
            }
            self.entries
                .lock()
                .unwrap()
                .get(&key)
                .cloned()
                .ok_or(keyring::Error::NoEntry)
        }

        fn set(&self, key: StoreKey, value: &str) -> keyring::Result<()> {
            if self.offline.load(Ordering::SeqCst) || *self.reject_writes.lock().unwrap() == Some(key)
            {
                return Err(locked());
            }
            let value = if self.corrupt_writes.load(Ordering::SeqCst) {
                format!("{}-garbled", value)
            } else {
                value.to_string()
            };
            self.entries.lock().unwrap().insert(key, value);
            Ok(())
        }

        fn delete(&self, key: StoreKey) -> keyring::Result<()> {
            if self.offline.load(Ordering::SeqCst) || self.fail_deletes.load(Ordering::SeqCst) {
                return Err(locked());
            }
            self.entries
                .lock()
                .unwrap()
                .remove(&key)
                .map(|_| ())
                .ok_or(keyring::Error::NoEntry)
        }
    }

    fn store_with(vault: Arc<FakeVault>, dir: &tempfile::TempDir) -> KeyringStore {
        KeyringStore {
            vault,
            fallback: FileStore::new(dir.path()),
        }
    }

    fn profile(id: &str, name: &str) -> UserProfile {
        UserProfile {
            id: id.to_string(),
            name: name.to_string(),
            email: format!("{}@example.com", name.to_lowercase()),
            avatar: None,
        }
    }

    #[test]
    fn test_verified_save_keeps_file_backup() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FakeVault::default());
        let store = store_with(vault.clone(), &dir);

        store.save(StoreKey::Token, "abc123").unwrap();
        assert_eq!(vault.get(StoreKey::Token).unwrap(), "abc123");
        assert_eq!(
            store.fallback.get(StoreKey::Token).unwrap().as_deref(),
            Some("abc123")
        );
        assert_eq!(store.get(StoreKey::Token).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_rejected_write_does_not_leave_old_value_readable() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FakeVault::default());
        let store = store_with(vault.clone(), &dir);
        store.save(StoreKey::Token, "old-token").unwrap();

        *vault.reject_writes.lock().unwrap() = Some(StoreKey::Token);
        store.save(StoreKey::Token, "new-token").unwrap();

        assert!(matches!(vault.get(StoreKey::Token), Err(keyring::Error::NoEntry)));
        assert_eq!(store.get(StoreKey::Token).unwrap().as_deref(), Some("new-token"));
    }

    #[test]
    fn test_mismatched_write_falls_back_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FakeVault::default());
        let store = store_with(vault.clone(), &dir);

        vault.corrupt_writes.store(true, Ordering::SeqCst);
        store.save(StoreKey::Token, "abc123").unwrap();

        assert_eq!(store.get(StoreKey::Token).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_offline_keyring_uses_file_only() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FakeVault::default());
        vault.offline.store(true, Ordering::SeqCst);
        let store = store_with(vault, &dir);

        store.save(StoreKey::Token, "abc123").unwrap();
        assert_eq!(store.get(StoreKey::Token).unwrap().as_deref(), Some("abc123"));
    }

    #[test]
    fn test_undeletable_old_value_fails_the_save() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FakeVault::default());
        let store = store_with(vault.clone(), &dir);
        store.save(StoreKey::Token, "old-token").unwrap();

        *vault.reject_writes.lock().unwrap() = Some(StoreKey::Token);
        vault.fail_deletes.store(true, Ordering::SeqCst);

        assert!(matches!(
            store.save(StoreKey::Token, "new-token"),
            Err(StoreError::Unavailable(_))
        ));
        assert_eq!(store.get(StoreKey::Token).unwrap().as_deref(), Some("old-token"));
    }

    #[test]
    fn test_pair_stays_matched_when_token_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FakeVault::default());
        let store = store_with(vault.clone(), &dir);

        let token_a = SessionToken::new("token-a").unwrap();
        save_pair(&store, &profile("1", "Ana"), &token_a).unwrap();

        *vault.reject_writes.lock().unwrap() = Some(StoreKey::Token);
        let token_b = SessionToken::new("token-b").unwrap();
        save_pair(&store, &profile("2", "Bruno"), &token_b).unwrap();

        let loaded = load_pair(&store).unwrap().unwrap();
        assert_eq!(loaded.profile.id, "2");
        assert_eq!(loaded.token.as_str(), "token-b");
    }

    #[test]
    fn test_remove_clears_keyring_and_file() {
        let dir = tempfile::tempdir().unwrap();
        let vault = Arc::new(FakeVault::default());
        let store = store_with(vault.clone(), &dir);

        store.save(StoreKey::Profile, "{}").unwrap();
        store.remove(StoreKey::Profile).unwrap();

        assert_eq!(store.get(StoreKey::Profile).unwrap(), None);
        store.remove(StoreKey::Profile).unwrap();
    }
}
