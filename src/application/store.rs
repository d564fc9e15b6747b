//! # Keyed State Store
//!
//! Generic JSON-backed datasets, one file per logical dataset.
//! Loading fails open: a missing, unreadable or malformed file yields empty state and a
//! logged warning. Saving overwrites the whole file and swallows (logs) write errors.

use serde::Serialize;
use serde::de::DeserializeOwned;
use std::collections::BTreeMap;
use std::collections::btree_map;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Reads and parses `path`. Returns `None` (after logging) if the file is absent or invalid.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Option<T> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => return None,
        Err(e) => {
            tracing::warn!("Failed to read {}: {}. Starting empty.", path.display(), e);
            return None;
        }
    };

    match serde_json::from_str(&content) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::warn!("Corrupt state in {}: {}. Starting empty.", path.display(), e);
            None
        }
    }
}

/// Loads a dataset, falling back to its default (empty) value.
pub fn load_json<T: DeserializeOwned + Default>(path: &Path) -> T {
    read_json(path).unwrap_or_default()
}

/// Writes `value` to `path` as pretty JSON, creating parent directories.
/// Returns whether the write succeeded; failures are logged, never raised.
pub fn save_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> bool {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
        && let Err(e) = fs::create_dir_all(parent)
    {
        tracing::error!("Failed to create {}: {}", parent.display(), e);
        return false;
    }

    let content = match serde_json::to_string_pretty(value) {
        Ok(content) => content,
        Err(e) => {
            tracing::error!("Failed to serialize {}: {}", path.display(), e);
            return false;
        }
    };

    match fs::write(path, content) {
        Ok(()) => true,
        Err(e) => {
            tracing::error!("Failed to save {}: {}", path.display(), e);
            false
        }
    }
}

/// A string-keyed dataset bound to one file.
#[derive(Debug, Clone)]
pub struct KeyedStore<V> {
    path: PathBuf,
    entries: BTreeMap<String, V>,
}

impl<V> KeyedStore<V>
where
    V: Serialize + DeserializeOwned,
{
    /// Loads the dataset at `path` (empty if absent or corrupt).
    pub fn load(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let entries = load_json(&path);
        Self { path, entries }
    }

    /// Binds already-decoded entries to `path` without touching the disk.
    pub fn from_entries(path: impl Into<PathBuf>, entries: BTreeMap<String, V>) -> Self {
        Self {
            path: path.into(),
            entries,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.get(key)
    }

    pub fn get_mut(&mut self, key: &str) -> Option<&mut V> {
        self.entries.get_mut(key)
    }

    pub fn get_or_insert_with(&mut self, key: &str, default: impl FnOnce() -> V) -> &mut V {
        self.entries.entry(key.to_string()).or_insert_with(default)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: V) -> Option<V> {
        self.entries.insert(key.into(), value)
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        self.entries.remove(key)
    }

    /// Keeps only the entries matching `keep`. Returns the number removed.
    pub fn retain(&mut self, mut keep: impl FnMut(&str, &V) -> bool) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, v| keep(k, v));
        before - self.entries.len()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> btree_map::Iter<'_, String, V> {
        self.entries.iter()
    }

    /// Writes the full dataset to its file.
    pub fn persist(&self) -> bool {
        save_json(&self.path, &self.entries)
    }
}
