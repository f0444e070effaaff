//! Local durable key-value storage.
//!
//! Holds the guest cart and the bearer tokens between runs. The interface is
//! synchronous and string-valued, the same shape as browser `localStorage`.
//!
//! - [`FileStorage`] keeps one file per key under the data directory.
//! - [`MemoryStorage`] keeps entries in memory (tests, ephemeral sessions).

use std::collections::HashMap;
use std::fs;
use std::io::{self, Write};
#[cfg(unix)]
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use thiserror::Error;

/// Well-known storage keys.
pub mod keys {
    /// Serialized guest cart line items.
    pub const CART: &str = "zodiaco-cart";

    /// Bearer access token.
    pub const ACCESS_TOKEN: &str = "access_token";

    /// Refresh token used by `POST /auth/refresh`.
    pub const REFRESH_TOKEN: &str = "refresh_token";
}

/// Errors that can occur reading or writing local storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Key contains characters that cannot be used as a file name.
    #[error("invalid storage key: {0}")]
    InvalidKey(String),

    /// Filesystem operation failed.
    #[error("storage I/O error for '{key}': {source}")]
    Io {
        key: String,
        #[source]
        source: io::Error,
    },
}

/// Key-value storage that survives process restarts.
pub trait LocalStorage: Send + Sync {
    /// Read the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be read.
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Store `value` under `key`, replacing any previous value.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Delete the entry for `key`. Deleting a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing store cannot be written.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

/// Shared handle to a storage backend.
pub type SharedStorage = Arc<dyn LocalStorage>;

// =============================================================================
// FileStorage
// =============================================================================

/// File-backed storage: one file per key inside a directory.
///
/// Writes go to a temporary file that is then renamed over the target, so a
/// crash mid-write never leaves a truncated entry behind. On Unix entries are
/// readable by the owner only, since two of them are bearer tokens.
///
/// Every call does blocking filesystem I/O. Async callers should go through
/// `tokio::task::spawn_blocking`.
#[derive(Debug, Clone)]
pub struct FileStorage {
    dir: PathBuf,
}

impl FileStorage {
    /// Create a store rooted at `dir`. The directory is created lazily on
    /// first write.
    #[must_use]
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the entries.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'))
            && !key.starts_with('.');
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(key))
    }
}

fn io_error(key: &str) -> impl FnOnce(io::Error) -> StorageError + '_ {
    move |source| StorageError::Io {
        key: key.to_string(),
        source,
    }
}

impl LocalStorage for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let path = self.path_for(key)?;
        match fs::read_to_string(&path) {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(io_error(key)(e)),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        fs::create_dir_all(&self.dir).map_err(io_error(key))?;

        let tmp = self.dir.join(format!(".{key}.tmp"));
        // A leftover temp file would keep its old mode.
        match fs::remove_file(&tmp) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => return Err(io_error(key)(e)),
        }

        let mut options = fs::OpenOptions::new();
        options.write(true).create_new(true);
        #[cfg(unix)]
        options.mode(0o600);
        let mut file = options.open(&tmp).map_err(io_error(key))?;
        file.write_all(value.as_bytes()).map_err(io_error(key))?;
        file.sync_all().map_err(io_error(key))?;
        fs::rename(&tmp, &path).map_err(io_error(key))
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(io_error(key)(e)),
        }
    }
}

// =============================================================================
// MemoryStorage
// =============================================================================

/// In-memory storage. Entries vanish with the process.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    /// Create an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether an entry exists for `key`.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains_key(key)
    }
}

impl LocalStorage for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self
            .entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(key)
            .cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join(format!(
            "zodiaco-storage-{name}-{}",
            std::process::id()
        ));
        let _ = fs::remove_dir_all(&dir);
        dir
    }

    #[test]
    fn test_file_storage_round_trip() {
        let dir = temp_dir("round-trip");
        let store = FileStorage::new(&dir);

        assert_eq!(store.get(keys::CART).unwrap(), None);
        store.set(keys::CART, "[1,2,3]").unwrap();
        assert_eq!(store.get(keys::CART).unwrap().as_deref(), Some("[1,2,3]"));

        store.set(keys::CART, "[]").unwrap();
        assert_eq!(store.get(keys::CART).unwrap().as_deref(), Some("[]"));

        store.remove(keys::CART).unwrap();
        assert_eq!(store.get(keys::CART).unwrap(), None);
        assert!(!dir.join(keys::CART).exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[cfg(unix)]
    #[test]
    fn test_file_storage_entries_are_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = temp_dir("mode");
        let store = FileStorage::new(&dir);
        fs::create_dir_all(&dir).unwrap();
        // Stale temp file from an interrupted write, world-readable.
        let stale = dir.join(format!(".{}.tmp", keys::ACCESS_TOKEN));
        fs::write(&stale, "old").unwrap();
        fs::set_permissions(&stale, fs::Permissions::from_mode(0o644)).unwrap();

        store.set(keys::ACCESS_TOKEN, "tok").unwrap();
        store.set(keys::REFRESH_TOKEN, "ref").unwrap();

        for key in [keys::ACCESS_TOKEN, keys::REFRESH_TOKEN] {
            let mode = fs::metadata(dir.join(key)).unwrap().permissions().mode();
            assert_eq!(mode & 0o777, 0o600, "{key}");
        }
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("tok"));
        assert!(!stale.exists());

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_file_storage_remove_missing_is_ok() {
        let dir = temp_dir("remove-missing");
        let store = FileStorage::new(&dir);
        assert!(store.remove(keys::ACCESS_TOKEN).is_ok());
    }

    #[test]
    fn test_file_storage_rejects_path_like_keys() {
        let store = FileStorage::new(temp_dir("keys"));
        assert!(matches!(
            store.set("../escape", "x"),
            Err(StorageError::InvalidKey(_))
        ));
        assert!(matches!(store.get(".hidden"), Err(StorageError::InvalidKey(_))));
        assert!(matches!(store.remove(""), Err(StorageError::InvalidKey(_))));
    }

    #[test]
    fn test_memory_storage() {
        let store = MemoryStorage::new();
        store.set(keys::ACCESS_TOKEN, "tok").unwrap();
        assert!(store.contains(keys::ACCESS_TOKEN));
        assert_eq!(store.get(keys::ACCESS_TOKEN).unwrap().as_deref(), Some("tok"));
        store.remove(keys::ACCESS_TOKEN).unwrap();
        assert!(!store.contains(keys::ACCESS_TOKEN));
    }
}
