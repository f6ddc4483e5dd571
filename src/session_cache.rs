//! Persistent session cache (browser local-storage analogue).
//!
//! Mirrors the live session so a restart restores it without a new login.
//!
//! Key properties:
//! - Exactly two keys: the serialized token and the serialized identity
//! - Both keys are written together and removed together
//! - Never the source of truth while running; read only at startup

use std::collections::{BTreeMap, HashMap};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use crate::auth::SessionToken;
use crate::models::Identity;

/// Storage key for the serialized credential.
pub const TOKEN_KEY: &str = "pawscare.session.token";
/// Storage key for the serialized identity snapshot.
pub const IDENTITY_KEY: &str = "pawscare.session.identity";
/// Value written over both keys when they cannot be removed.
const CLEARED: &str = "null";

// ═══════════════════════════════════════════════════════════
// Error type
// ═══════════════════════════════════════════════════════════

/// Errors from session cache operations.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),
    #[error("Cached session is incomplete (token and identity must be stored together)")]
    Incomplete,
    #[error("Cache lock poisoned")]
    LockPoisoned,
}

// ═══════════════════════════════════════════════════════════
// Key/value backends
// ═══════════════════════════════════════════════════════════

/// Synchronous key/value storage scoped to this device.
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError>;

    /// Write every entry in one step.
    fn set_all(&self, entries: &[(&str, String)]) -> Result<(), CacheError>;

    /// Remove every key in one step. Missing keys are not an error.
    fn remove_all(&self, keys: &[&str]) -> Result<(), CacheError>;
}

/// In-memory store. Clones share the same entries, which lets tests
/// simulate a restart by building a second gate over the same store.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    entries: Arc<Mutex<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set_all(&self, items: &[(&str, String)]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        for (key, value) in items {
            entries.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), CacheError> {
        let mut entries = self.entries.lock().map_err(|_| CacheError::LockPoisoned)?;
        for key in keys {
            entries.remove(*key);
        }
        Ok(())
    }
}

/// JSON object on disk. Every write replaces the file atomically
/// (temp file in the same directory, then rename).
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, String>, CacheError> {
        match std::fs::read_to_string(&self.path) {
            Ok(raw) if raw.trim().is_empty() => Ok(BTreeMap::new()),
            Ok(raw) => Ok(serde_json::from_str(&raw)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, String>) -> Result<(), CacheError> {
        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        std::fs::create_dir_all(&dir)?;

        let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
        tmp.write_all(serde_json::to_string_pretty(map)?.as_bytes())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| CacheError::Io(e.error))?;
        Ok(())
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::LockPoisoned)?;
        Ok(self.read_map()?.remove(key))
    }

    fn set_all(&self, entries: &[(&str, String)]) -> Result<(), CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::LockPoisoned)?;
        let mut map = self.read_map().unwrap_or_else(|e| {
            tracing::warn!(error = %e, "Session cache file unreadable, overwriting");
            BTreeMap::new()
        });
        for (key, value) in entries {
            map.insert((*key).to_string(), value.clone());
        }
        self.write_map(&map)
    }

    fn remove_all(&self, keys: &[&str]) -> Result<(), CacheError> {
        let _guard = self.lock.lock().map_err(|_| CacheError::LockPoisoned)?;
        let mut map = match self.read_map() {
            Ok(map) => map,
            // Unreadable file: drop it entirely rather than keep half a session.
            Err(_) => {
                return match std::fs::remove_file(&self.path) {
                    Ok(()) => Ok(()),
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
                    Err(e) => Err(e.into()),
                };
            }
        };
        let before = map.len();
        for key in keys {
            map.remove(*key);
        }
        if map.len() == before {
            return Ok(());
        }
        self.write_map(&map)
    }
}

// ═══════════════════════════════════════════════════════════
// PersistentSessionCache: the (token, identity) pair
// ═══════════════════════════════════════════════════════════

/// Write-through mirror of the current session.
pub struct PersistentSessionCache {
    store: Box<dyn KeyValueStore>,
}

impl PersistentSessionCache {
    pub fn new(store: impl KeyValueStore + 'static) -> Self {
        Self {
            store: Box::new(store),
        }
    }

    /// Read the cached pair.
    ///
    /// `Ok(None)` when nothing is cached. A lone token or lone identity is
    /// `CacheError::Incomplete`; the caller is expected to clear it.
    pub fn load(&self) -> Result<Option<(SessionToken, Identity)>, CacheError> {
        let token = self.store.get(TOKEN_KEY)?.filter(|v| v != CLEARED);
        let identity = self.store.get(IDENTITY_KEY)?.filter(|v| v != CLEARED);
        match (token, identity) {
            (None, None) => Ok(None),
            (Some(token), Some(identity)) => {
                let token: SessionToken = serde_json::from_str(&token)?;
                let identity: Identity = serde_json::from_str(&identity)?;
                Ok(Some((token, identity)))
            }
            _ => Err(CacheError::Incomplete),
        }
    }

    /// Write both keys together.
    pub fn store(&self, token: &SessionToken, identity: &Identity) -> Result<(), CacheError> {
        let entries = [
            (TOKEN_KEY, serde_json::to_string(token)?),
            (IDENTITY_KEY, serde_json::to_string(identity)?),
        ];
        self.store.set_all(&entries)
    }

    /// Remove both keys together. If the backend refuses the removal, both
    /// keys are overwritten with a cleared marker instead, so a later
    /// `load` still finds nothing to restore.
    pub fn clear(&self) -> Result<(), CacheError> {
        let Err(e) = self.store.remove_all(&[TOKEN_KEY, IDENTITY_KEY]) else {
            return Ok(());
        };
        tracing::warn!(error = %e, "Session cache removal failed; overwriting entries");
        self.store
            .set_all(&[(TOKEN_KEY, CLEARED.to_string()), (IDENTITY_KEY, CLEARED.to_string())])
            .map_err(|_| e)
    }
}

// ═══════════════════════════════════════════════════════════
// Tests
// ═══════════════════════════════════════════════════════════

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Role;

    fn identity() -> Identity {
        Identity::new("usr-staff", "staff@pawscare.com", "Sam Rivera", Role::Staff)
    }

    #[test]
    fn empty_cache_loads_none() {
        let cache = PersistentSessionCache::new(MemoryStore::new());
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn store_then_load_round_trip() {
        let cache = PersistentSessionCache::new(MemoryStore::new());
        let token = SessionToken::new("tok-1");
        cache.store(&token, &identity()).unwrap();

        let (t, i) = cache.load().unwrap().unwrap();
        assert_eq!(t, token);
        assert_eq!(i, identity());
    }

    #[test]
    fn clear_removes_both_keys() {
        let store = MemoryStore::new();
        let cache = PersistentSessionCache::new(store.clone());
        cache.store(&SessionToken::new("tok-1"), &identity()).unwrap();
        assert_eq!(store.len(), 2);

        cache.clear().unwrap();
        assert!(store.is_empty());
        assert!(cache.load().unwrap().is_none());
    }

    /// Removal always fails; writes go to the shared inner store.
    struct StickyStore(MemoryStore);

    impl KeyValueStore for StickyStore {
        fn get(&self, key: &str) -> Result<Option<String>, CacheError> {
            self.0.get(key)
        }
        fn set_all(&self, entries: &[(&str, String)]) -> Result<(), CacheError> {
            self.0.set_all(entries)
        }
        fn remove_all(&self, _keys: &[&str]) -> Result<(), CacheError> {
            Err(CacheError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "locked",
            )))
        }
    }

    #[test]
    fn clear_overwrites_when_removal_fails() {
        let inner = MemoryStore::new();
        let cache = PersistentSessionCache::new(StickyStore(inner.clone()));
        cache.store(&SessionToken::new("tok-1"), &identity()).unwrap();

        cache.clear().unwrap();
        assert!(cache.load().unwrap().is_none());

        // A fresh cache over the same entries finds nothing either
        let reopened = PersistentSessionCache::new(inner);
        assert!(reopened.load().unwrap().is_none());
    }

    #[test]
    fn cleared_entries_can_be_replaced() {
        let inner = MemoryStore::new();
        let cache = PersistentSessionCache::new(StickyStore(inner));
        cache.store(&SessionToken::new("tok-1"), &identity()).unwrap();
        cache.clear().unwrap();

        cache.store(&SessionToken::new("tok-2"), &identity()).unwrap();
        let (token, _) = cache.load().unwrap().unwrap();
        assert_eq!(token.as_str(), "tok-2");
    }

    #[test]
    fn lone_token_is_incomplete() {
        let store = MemoryStore::new();
        store.set_all(&[(TOKEN_KEY, "\"tok-1\"".to_string())]).unwrap();
        let cache = PersistentSessionCache::new(store);
        assert!(matches!(cache.load(), Err(CacheError::Incomplete)));
    }

    #[test]
    fn lone_identity_is_incomplete() {
        let store = MemoryStore::new();
        store
            .set_all(&[(IDENTITY_KEY, serde_json::to_string(&identity()).unwrap())])
            .unwrap();
        let cache = PersistentSessionCache::new(store);
        assert!(matches!(cache.load(), Err(CacheError::Incomplete)));
    }

    #[test]
    fn garbage_identity_is_serde_error() {
        let store = MemoryStore::new();
        store
            .set_all(&[
                (TOKEN_KEY, "\"tok-1\"".to_string()),
                (IDENTITY_KEY, "{\"role\":\"wizard\"}".to_string()),
            ])
            .unwrap();
        let cache = PersistentSessionCache::new(store);
        assert!(matches!(cache.load(), Err(CacheError::Serde(_))));
    }

    #[test]
    fn file_store_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let cache = PersistentSessionCache::new(FileStore::new(&path));
        cache.store(&SessionToken::new("tok-9"), &identity()).unwrap();
        drop(cache);

        let reopened = PersistentSessionCache::new(FileStore::new(&path));
        let (token, who) = reopened.load().unwrap().unwrap();
        assert_eq!(token.as_str(), "tok-9");
        assert_eq!(who.role, Role::Staff);
    }

    #[test]
    fn file_store_clear_on_missing_file_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let cache = PersistentSessionCache::new(FileStore::new(dir.path().join("session.json")));
        cache.clear().unwrap();
    }

    #[test]
    fn file_store_clear_on_corrupt_file_removes_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let cache = PersistentSessionCache::new(FileStore::new(&path));
        assert!(cache.load().is_err());
        cache.clear().unwrap();
        assert!(!path.exists());
        assert!(cache.load().unwrap().is_none());
    }

    #[test]
    fn file_store_keeps_unrelated_keys() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("session.json"));
        store.set_all(&[("theme", "dark".to_string())]).unwrap();

        let cache = PersistentSessionCache::new(store);
        cache.store(&SessionToken::new("tok-1"), &identity()).unwrap();
        cache.clear().unwrap();

        let store = FileStore::new(dir.path().join("session.json"));
        assert_eq!(store.get("theme").unwrap().as_deref(), Some("dark"));
        assert!(store.get(TOKEN_KEY).unwrap().is_none());
    }
}
