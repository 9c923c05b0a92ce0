//! File-based credential storage (always available).

use super::{CredentialStore, StoreError, StoreKey};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// One owner-only file per key inside `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Store inside the gymtrack config directory.
    pub fn default_location() -> Result<Self, StoreError> {
        crate::config::config_dir()
            .map(Self::new)
            .ok_or_else(|| StoreError::Unavailable("failed to find config directory".to_string()))
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: StoreKey) -> PathBuf {
        self.dir.join(key.as_str())
    }
}

impl CredentialStore for FileStore {
    fn get(&self, key: StoreKey) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(self.path(key)) {
            Ok(content) => {
                tracing::trace!("Loaded {} from file", key);
                Ok(Some(content))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn save(&self, key: StoreKey, value: &str) -> Result<(), StoreError> {
        if !self.dir.exists() {
            fs::create_dir_all(&self.dir)?;
        }
        let path = self.path(key);

        // Set restrictive permissions on Unix before writing
        #[cfg(unix)]
        {
            use std::io::Write;
            use std::os::unix::fs::OpenOptionsExt;
            let mut file = fs::OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .mode(0o600) // Owner read/write only
                .open(&path)?;
            file.write_all(value.as_bytes())?;
            file.sync_all()?;
        }

        #[cfg(not(unix))]
        {
            fs::write(&path, value)?;
        }

        tracing::debug!("Saved {} to file: {:?}", key, path);
        Ok(())
    }

    fn remove(&self, key: StoreKey) -> Result<(), StoreError> {
        match fs::remove_file(self.path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        format!("File-based storage: {}", self.dir.display())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_get_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested"));

        assert_eq!(store.get(StoreKey::Token).unwrap(), None);
        store.save(StoreKey::Token, "abc123").unwrap();
        assert_eq!(store.get(StoreKey::Token).unwrap().as_deref(), Some("abc123"));

        // Overwrite truncates the previous value
        store.save(StoreKey::Token, "x").unwrap();
        assert_eq!(store.get(StoreKey::Token).unwrap().as_deref(), Some("x"));

        store.remove(StoreKey::Token).unwrap();
        assert_eq!(store.get(StoreKey::Token).unwrap(), None);
        store.remove(StoreKey::Token).unwrap();
    }

    #[test]
    fn test_keys_are_independent() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());

        store.save(StoreKey::Profile, "{}").unwrap();
        store.save(StoreKey::Token, "abc123").unwrap();
        store.remove(StoreKey::Profile).unwrap();

        assert_eq!(store.get(StoreKey::Profile).unwrap(), None);
        assert_eq!(store.get(StoreKey::Token).unwrap().as_deref(), Some("abc123"));
    }

    #[cfg(unix)]
    #[test]
    fn test_files_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path());
        store.save(StoreKey::Token, "abc123").unwrap();

        let mode = fs::metadata(dir.path().join(StoreKey::Token.as_str()))
            .unwrap()
            .permissions()
            .mode();
        assert_eq!(mode & 0o777, 0o600);
    }
}
