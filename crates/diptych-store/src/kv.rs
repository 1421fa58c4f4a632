//! Key-value store port plus the two shipped implementations.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::warn;

pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<String>;
    fn set(&self, key: &str, value: String);
    fn remove(&self, key: &str);
    /// All entries whose key starts with `prefix`, in key order.
    fn list(&self, prefix: &str) -> Vec<(String, String)>;
}

// ── In-memory ─────────────────────────────────────────────────────────────────

#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<String, String>> {
        self.entries.write().unwrap_or_else(|e| e.into_inner())
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        self.write().insert(key.to_string(), value);
    }

    fn remove(&self, key: &str) {
        self.write().remove(key);
    }

    fn list(&self, prefix: &str) -> Vec<(String, String)> {
        self.read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

// ── JSON file ─────────────────────────────────────────────────────────────────

/// File-backed store: one JSON object on disk, loaded at open, rewritten on
/// every mutation. Write failures are logged, not fatal — the in-memory view
/// stays authoritative for the session.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: RwLock<BTreeMap<String, String>>,
}

impl JsonFileStore {
    pub fn open(path: impl Into<PathBuf>) -> std::io::Result<Self> {
        let path = path.into();
        let entries = match std::fs::read_to_string(&path) {
            Ok(content) => serde_json::from_str(&content).unwrap_or_else(|err| {
                warn!(path = %path.display(), error = %err, "store file unreadable, starting empty");
                BTreeMap::new()
            }),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => return Err(err),
        };
        Ok(Self { path, entries: RwLock::new(entries) })
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<String, String>> {
        self.entries.read().unwrap_or_else(|e| e.into_inner())
    }

    fn persist(&self, entries: &BTreeMap<String, String>) {
        let json = match serde_json::to_string_pretty(entries) {
            Ok(json) => json,
            Err(err) => {
                warn!(error = %err, "store serialization failed");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, json) {
            warn!(path = %self.path.display(), error = %err, "store write failed");
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<String> {
        self.read().get(key).cloned()
    }

    fn set(&self, key: &str, value: String) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.insert(key.to_string(), value);
        self.persist(&entries);
    }

    fn remove(&self, key: &str) {
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.remove(key);
        self.persist(&entries);
    }

    fn list(&self, prefix: &str) -> Vec<(String, String)> {
        self.read()
            .range(prefix.to_string()..)
            .take_while(|(k, _)| k.starts_with(prefix))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set("a/1", "one".into());
        store.set("a/2", "two".into());
        store.set("b/1", "other".into());
        assert_eq!(store.get("a/1").as_deref(), Some("one"));
        assert_eq!(store.list("a/").len(), 2);
        store.remove("a/1");
        assert!(store.get("a/1").is_none());
    }

    #[test]
    fn json_file_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        {
            let store = JsonFileStore::open(&path).unwrap();
            store.set("account/jo", "{}".into());
        }
        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("account/jo").as_deref(), Some("{}"));
    }

    #[test]
    fn json_file_store_starts_empty_when_missing() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::open(dir.path().join("new.json")).unwrap();
        assert!(store.list("").is_empty());
    }
}
