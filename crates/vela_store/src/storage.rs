//! Storage backends for persisted store fields
//!
//! A backend is a flat string key/value surface. Stores write serialized
//! field values through on every committed write and read them back at
//! construction. Persistence is best-effort: backends log failures and
//! carry on, they never surface errors into store operations.

use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use rustc_hash::FxHashMap;

/// A flat key/value store for serialized field values.
///
/// Implementations must tolerate failure: `set` has no error channel on
/// purpose. Log and drop.
pub trait StorageBackend: Send + Sync {
    /// Fetch the serialized value stored under `key`, if any
    fn get(&self, key: &str) -> Option<String>;

    /// Persist `value` under `key`
    fn set(&self, key: &str, value: &str);
}

/// Lets one backend be shared between several stores
impl<B: StorageBackend + ?Sized> StorageBackend for Arc<B> {
    fn get(&self, key: &str) -> Option<String> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) {
        (**self).set(key, value)
    }
}

/// In-memory backend for tests and ephemeral hosts
#[derive(Default)]
pub struct MemoryBackend {
    entries: Mutex<FxHashMap<String, String>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.lock().unwrap().is_empty()
    }
}

impl StorageBackend for MemoryBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        self.entries
            .lock()
            .unwrap()
            .insert(key.to_string(), value.to_string());
    }
}

/// File-backed storage: one JSON object per file holding the key/value map.
///
/// The file is read once at open and rewritten on every `set`. IO and
/// decode problems degrade to an empty map or a skipped write, with a
/// warning in the log.
pub struct FileBackend {
    path: PathBuf,
    entries: Mutex<FxHashMap<String, String>>,
}

impl FileBackend {
    /// Open a backend at `path`, loading any entries already on disk. A
    /// missing file starts empty; an undecodable one is ignored.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str::<FxHashMap<String, String>>(&raw) {
                Ok(entries) => entries,
                Err(e) => {
                    tracing::warn!("Ignoring undecodable storage file {:?}: {}", path, e);
                    FxHashMap::default()
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => FxHashMap::default(),
            Err(e) => {
                tracing::warn!("Failed to read storage file {:?}: {}", path, e);
                FxHashMap::default()
            }
        };
        Self {
            path,
            entries: Mutex::new(entries),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn write_out(&self, entries: &FxHashMap<String, String>) {
        let json = match serde_json::to_string_pretty(entries) {
            Ok(json) => json,
            Err(e) => {
                tracing::warn!("Failed to encode storage file {:?}: {}", self.path, e);
                return;
            }
        };
        if let Err(e) = fs::write(&self.path, json) {
            tracing::warn!("Failed to write storage file {:?}: {}", self.path, e);
        }
    }
}

impl StorageBackend for FileBackend {
    fn get(&self, key: &str) -> Option<String> {
        self.entries.lock().unwrap().get(key).cloned()
    }

    fn set(&self, key: &str, value: &str) {
        let mut entries = self.entries.lock().unwrap();
        entries.insert(key.to_string(), value.to_string());
        self.write_out(&entries);
    }
}
