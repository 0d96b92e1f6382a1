//! LocalStore - the per-participant key/value map
//!
//! One mutex guards the whole map; every read, write and delete takes it.

use std::collections::HashMap;

use tokio::sync::Mutex;
use tracing::debug;

/// In-memory key/value map owned by a single participant
#[derive(Debug, Default)]
pub struct LocalStore {
    entries: Mutex<HashMap<String, String>>,
}

impl LocalStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a key
    pub async fn get(&self, key: &str) -> Option<String> {
        debug!(%key, "LocalStore::get: called");
        self.entries.lock().await.get(key).cloned()
    }

    /// Insert or overwrite a key, returning the previous value
    pub async fn put(&self, key: &str, value: &str) -> Option<String> {
        debug!(%key, "LocalStore::put: called");
        self.entries.lock().await.insert(key.to_string(), value.to_string())
    }

    /// Remove a key, returning the previous value
    pub async fn remove(&self, key: &str) -> Option<String> {
        debug!(%key, "LocalStore::remove: called");
        self.entries.lock().await.remove(key)
    }

    /// Check for a key without cloning its value
    pub async fn contains(&self, key: &str) -> bool {
        self.entries.lock().await.contains_key(key)
    }

    /// Number of entries
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// True when the store holds no entries
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }

    /// Copy of the full map (diagnostics and tests)
    pub async fn snapshot(&self) -> HashMap<String, String> {
        self.entries.lock().await.clone()
    }
}
