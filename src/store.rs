//! The persisted defaults store shared by every window.
//!
//! Hosts hand the command layer an implementation of [`KeyValueStore`];
//! nothing else in the crate touches persistence directly. The store is
//! loaded on every access and mutations are read-modify-write round trips;
//! there is no cross-key transaction, and no locking around sequences of
//! calls. Concurrent mutations from two windows are last-writer-wins, which
//! is accepted for a low-contention interactive tool.

use serde_json::Value;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Mutex;

/// Process-wide, user-scoped key-value storage.
///
/// Mirrors the defaults databases terminal hosts keep their settings in:
/// infallible from the caller's point of view (I/O problems are logged and
/// swallowed, reads of missing or corrupt data yield `None`).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Option<Value>;
    fn set(&self, key: &str, value: Value);
    fn remove(&self, key: &str);

    /// Boolean flags default to false when absent or of the wrong shape.
    fn get_bool(&self, key: &str) -> bool {
        matches!(self.get(key), Some(Value::Bool(true)))
    }

    fn get_string(&self, key: &str) -> Option<String> {
        match self.get(key) {
            Some(Value::String(s)) => Some(s),
            _ => None,
        }
    }

    fn get_f32(&self, key: &str) -> Option<f32> {
        self.get(key)?.as_f64().map(|v| v as f32)
    }
}

/// JSON-file-backed store.
///
/// Every operation re-reads the file, so independently running windows see
/// each other's writes on their next access. The two bookmark mappings live
/// under separate keys and are written by separate `set` calls; a crash
/// between the two leaves them inconsistent. That window is accepted by
/// design and not actively detected.
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    fn load(&self) -> HashMap<String, Value> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(_) => return HashMap::new(),
        };
        match serde_json::from_str(&contents) {
            Ok(map) => map,
            Err(err) => {
                tracing::warn!("unreadable defaults store {}: {err}", self.path.display());
                HashMap::new()
            }
        }
    }

    fn save(&self, map: &HashMap<String, Value>) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = std::fs::create_dir_all(parent) {
                tracing::error!("could not create {}: {err}", parent.display());
                return;
            }
        }
        let contents = match serde_json::to_string_pretty(map) {
            Ok(contents) => contents,
            Err(err) => {
                tracing::error!("could not encode defaults store: {err}");
                return;
            }
        };
        if let Err(err) = std::fs::write(&self.path, contents) {
            tracing::error!("could not write {}: {err}", self.path.display());
        }
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.load().remove(key)
    }

    fn set(&self, key: &str, value: Value) {
        let mut map = self.load();
        map.insert(key.to_string(), value);
        self.save(&map);
    }

    fn remove(&self, key: &str) {
        let mut map = self.load();
        if map.remove(key).is_some() {
            self.save(&map);
        }
    }
}

/// In-memory store for tests and embedded hosts that persist elsewhere.
#[derive(Default)]
pub struct MemoryStore {
    values: Mutex<HashMap<String, Value>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Value> {
        self.values.lock().ok()?.get(key).cloned()
    }

    fn set(&self, key: &str, value: Value) {
        if let Ok(mut values) = self.values.lock() {
            values.insert(key.to_string(), value);
        }
    }

    fn remove(&self, key: &str) {
        if let Ok(mut values) = self.values.lock() {
            values.remove(key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;

    fn file_store(temp: &TempDir) -> JsonFileStore {
        JsonFileStore::new(temp.path().join("defaults.json"))
    }

    #[test]
    fn missing_file_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let store = file_store(&temp);
        assert_eq!(store.get("anything"), None);
        assert!(!store.get_bool("anything"));
    }

    #[test]
    fn set_get_remove_round_trip() {
        let temp = TempDir::new().unwrap();
        let store = file_store(&temp);

        store.set("fontSize", json!(13.0));
        assert_eq!(store.get_f32("fontSize"), Some(13.0));

        store.remove("fontSize");
        assert_eq!(store.get("fontSize"), None);
    }

    #[test]
    fn every_access_reloads_from_disk() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("defaults.json");
        let store = JsonFileStore::new(&path);
        store.set("a", json!(1));

        // A second handle writing the same file is visible immediately.
        let other = JsonFileStore::new(&path);
        other.set("b", json!(2));
        assert_eq!(store.get("a"), Some(json!(1)));
        assert_eq!(store.get("b"), Some(json!(2)));
    }

    #[test]
    fn corrupt_file_reads_as_empty() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("defaults.json");
        std::fs::write(&path, "not json").unwrap();
        let store = JsonFileStore::new(&path);
        assert_eq!(store.get("a"), None);
    }

    #[test]
    fn memory_store_round_trip() {
        let store = MemoryStore::new();
        store.set("flag", json!(true));
        assert!(store.get_bool("flag"));
        store.remove("flag");
        assert!(!store.get_bool("flag"));
    }
}
