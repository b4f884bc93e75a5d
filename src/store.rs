//! File-backed key-value store for application state.
//!
//! State snapshots are serialized under fixed string keys in one JSON object.
//! There is exactly one writer; semantics are last-write-wins with a flush on
//! every mutation. A missing or unreadable file is never fatal: callers fall
//! back to built-in defaults.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use log::{debug, warn};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Prefix shared by every key, kept to avoid colliding with other tools that
/// may share the store file.
pub const KEY_PREFIX: &str = "qfa_";

pub const FLOW_STATE_KEY: &str = "qfa_state";
pub const PIVOT_STATE_KEY: &str = "qfa_pivot_state";

/// Default store location, relative to the working directory.
pub const DEFAULT_STORE_PATH: &str = ".pivot_confluence.json";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to serialize value for key '{key}'")]
    Serialize {
        key: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("failed to write store file {path:?}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

pub struct KvStore {
    path: PathBuf,
    entries: BTreeMap<String, serde_json::Value>,
}

impl KvStore {
    /// Open the store at `path`, reading any existing snapshot. Corrupt or
    /// missing content degrades to an empty store with a logged warning.
    pub fn open<P: AsRef<Path>>(path: P) -> Self {
        let path = path.as_ref().to_path_buf();
        let entries = match fs::read_to_string(&path) {
            Ok(raw) => match serde_json::from_str(&raw) {
                Ok(map) => map,
                Err(err) => {
                    warn!("store file {path:?} is corrupt ({err}); starting from defaults");
                    BTreeMap::new()
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(err) => {
                warn!("could not read store file {path:?} ({err}); starting from defaults");
                BTreeMap::new()
            }
        };
        debug!("opened store {path:?} with {} keys", entries.len());
        Self { path, entries }
    }

    /// Deserialize the value stored under `key`. Returns `None` when the key
    /// is absent or its stored shape no longer matches `T`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.entries.get(key)?;
        match serde_json::from_value(value.clone()) {
            Ok(parsed) => Some(parsed),
            Err(err) => {
                warn!("stored value under '{key}' does not deserialize ({err}); ignoring");
                None
            }
        }
    }

    pub fn set<T: Serialize>(&mut self, key: &str, value: &T) -> Result<(), StoreError> {
        let encoded = serde_json::to_value(value).map_err(|source| StoreError::Serialize {
            key: key.to_string(),
            source,
        })?;
        self.entries.insert(key.to_string(), encoded);
        Ok(())
    }

    pub fn remove(&mut self, key: &str) {
        self.entries.remove(key);
    }

    /// Write the whole snapshot back to disk.
    pub fn flush(&self) -> Result<(), StoreError> {
        let raw = serde_json::to_string_pretty(&self.entries).map_err(|source| {
            StoreError::Serialize {
                key: "<snapshot>".to_string(),
                source,
            }
        })?;
        fs::write(&self.path, raw).map_err(|source| StoreError::Write {
            path: self.path.clone(),
            source,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Convenience wrapper: set one key and flush, with context for the caller.
pub fn persist<T: Serialize>(store: &mut KvStore, key: &str, value: &T) -> Result<()> {
    store.set(key, value)?;
    store
        .flush()
        .with_context(|| format!("persisting '{key}'"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, PartialEq, Serialize, Deserialize)]
    struct Snapshot {
        tolerance: f64,
        selection: Vec<String>,
    }

    fn temp_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("pivot_confluence_{}_{name}", std::process::id()))
    }

    #[test]
    fn round_trip_through_disk() {
        let path = temp_path("roundtrip.json");
        let snapshot = Snapshot {
            tolerance: 0.5,
            selection: vec!["standard".to_string()],
        };

        let mut store = KvStore::open(&path);
        store.set(PIVOT_STATE_KEY, &snapshot).unwrap();
        store.flush().unwrap();

        let reopened = KvStore::open(&path);
        assert_eq!(reopened.get::<Snapshot>(PIVOT_STATE_KEY), Some(snapshot));

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn missing_file_yields_empty_store() {
        let store = KvStore::open(temp_path("missing.json"));
        assert_eq!(store.get::<Snapshot>(PIVOT_STATE_KEY), None);
    }

    #[test]
    fn corrupt_file_falls_back_to_defaults() {
        let path = temp_path("corrupt.json");
        fs::write(&path, "{not json at all").unwrap();

        let store = KvStore::open(&path);
        assert_eq!(store.get::<Snapshot>(PIVOT_STATE_KEY), None);

        let _ = fs::remove_file(&path);
    }

    #[test]
    fn mismatched_shape_is_ignored_not_fatal() {
        let path = temp_path("shape.json");
        let mut store = KvStore::open(&path);
        store.set(FLOW_STATE_KEY, &42u32).unwrap();
        assert_eq!(store.get::<Snapshot>(FLOW_STATE_KEY), None);
        assert_eq!(store.get::<u32>(FLOW_STATE_KEY), Some(42));
    }

    #[test]
    fn keys_share_the_reserved_prefix() {
        assert!(FLOW_STATE_KEY.starts_with(KEY_PREFIX));
        assert!(PIVOT_STATE_KEY.starts_with(KEY_PREFIX));
    }
}
