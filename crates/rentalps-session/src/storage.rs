//! The persisted session store: a durable key-value slot that mirrors the
//! committed session across restarts.
//!
//! The store is passive. It is read once at hydration, written on every
//! commit and erased on every clear, always by the session manager and never
//! on its own. Storage trouble is never fatal: a corrupt slot reads as
//! "no session", and failed writes are logged and dropped.

use std::collections::HashMap;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, PoisonError};

use rentalps_protocol::{Codec, JsonCodec};
use tracing::{debug, warn};

use crate::Session;

// ---------------------------------------------------------------------------
// KeyValueStore
// ---------------------------------------------------------------------------

/// Errors from a [`KeyValueStore`] backend.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    #[error("storage io failed: {0}")]
    Io(#[from] std::io::Error),

    /// Keys become file names, so they are restricted to
    /// `[A-Za-z0-9._-]`.
    #[error("invalid storage key: {0:?}")]
    InvalidKey(String),
}

/// A synchronous string key-value store (the `localStorage` contract).
pub trait KeyValueStore: Send + Sync + 'static {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;

    /// Removing an absent key is not an error.
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<S: KeyValueStore> KeyValueStore for Arc<S> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-memory store. Clones share the same entries, which is how tests
/// simulate an application reload.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> std::sync::MutexGuard<'_, HashMap<String, String>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.entries().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        self.entries().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries().remove(key);
        Ok(())
    }
}

/// File-backed store: one `<key>.json` file per key inside a directory.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Creates the directory if needed.
    pub fn open(dir: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let dir = dir.into();
        fs::create_dir_all(&dir)?;
        debug!(dir = %dir.display(), "file session store opened");
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf, StorageError> {
        let valid = !key.is_empty()
            && !key.starts_with('.')
            && key
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'));
        if !valid {
            return Err(StorageError::InvalidKey(key.to_string()));
        }
        Ok(self.dir.join(format!("{key}.json")))
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match fs::read_to_string(self.path_for(key)?) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key)?;
        // Write-then-rename so a crash mid-write leaves the old slot intact.
        let tmp = path.with_extension("json.tmp");
        fs::write(&tmp, value)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        match fs::remove_file(self.path_for(key)?) {
            Err(e) if e.kind() != ErrorKind::NotFound => Err(e.into()),
            _ => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionStorage
// ---------------------------------------------------------------------------

/// The session slot: a [`Session`] serialized under one fixed key.
#[derive(Debug, Clone)]
pub struct SessionStorage<K, C = JsonCodec> {
    store: K,
    codec: C,
    key: String,
}

impl<K: KeyValueStore> SessionStorage<K> {
    pub fn new(store: K, key: impl Into<String>) -> Self {
        Self {
            store,
            codec: JsonCodec,
            key: key.into(),
        }
    }
}

impl<K: KeyValueStore, C: Codec> SessionStorage<K, C> {
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn store(&self) -> &K {
        &self.store
    }

    /// Reads the stored session. Missing, unreadable, or corrupt data all
    /// come back as `None`.
    pub fn read(&self) -> Option<Session> {
        let raw = match self.store.get(&self.key) {
            Ok(Some(raw)) => raw,
            Ok(None) => return None,
            Err(e) => {
                warn!(key = %self.key, error = %e, "failed to read stored session");
                return None;
            }
        };

        let session: Session = match self.codec.decode(raw.as_bytes()) {
            Ok(session) => session,
            Err(e) => {
                warn!(key = %self.key, error = %e, "stored session is corrupt, ignoring");
                return None;
            }
        };

        if session.has_access && session.access_token.is_none() {
            warn!(key = %self.key, "stored session has access but no token, ignoring");
            return None;
        }
        Some(session)
    }

    /// Writes the session slice. Failures are logged, not returned.
    pub fn write(&self, session: &Session) {
        let result = self
            .codec
            .encode(session)
            .map_err(|e| e.to_string())
            .and_then(|bytes| String::from_utf8(bytes).map_err(|e| e.to_string()))
            .and_then(|raw| self.store.set(&self.key, &raw).map_err(|e| e.to_string()));
        if let Err(error) = result {
            warn!(key = %self.key, %error, "failed to persist session");
        }
    }

    /// Erases the slot. Failures are logged, not returned.
    pub fn erase(&self) {
        if let Err(e) = self.store.remove(&self.key) {
            warn!(key = %self.key, error = %e, "failed to erase stored session");
        }
    }
}
