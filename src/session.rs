//! Session persistence for execution state.
//!
//! The store is a plain key-to-blob mapping: the engine loads one record per
//! session, mutates it through a chain run and saves it back. Serialization
//! must round-trip every field of [`ExecutionState`], including partially
//! answered question lists, or a resumed run will not land back on the node
//! that asked the last question.

use crate::state::ExecutionState;
use async_trait::async_trait;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::debug;

/// Errors raised at the session-store boundary.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backing store rejected the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// The stored blob did not round-trip through serde.
    #[error("state serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// I/O failure against the backing store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Durable key-to-state mapping, get/set only.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads the state stored under `session_key`; `None` when absent.
    async fn load(&self, session_key: &str) -> Result<Option<ExecutionState>, StoreError>;

    /// Persists `state` under `session_key`, replacing any previous record.
    async fn save(&self, session_key: &str, state: &ExecutionState) -> Result<(), StoreError>;
}

/// In-memory store. States are kept as serialized JSON so that every load
/// and save exercises the same round-trip a durable backend would.
#[derive(Default)]
pub struct MemoryStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemoryStore {
    async fn load(&self, session_key: &str) -> Result<Option<ExecutionState>, StoreError> {
        let entries = self.entries.read().await;
        entries
            .get(session_key)
            .map(|blob| serde_json::from_str(blob).map_err(StoreError::from))
            .transpose()
    }

    async fn save(&self, session_key: &str, state: &ExecutionState) -> Result<(), StoreError> {
        let blob = serde_json::to_string(state)?;
        let mut entries = self.entries.write().await;
        entries.insert(session_key.to_string(), blob);
        Ok(())
    }
}

/// File-backed store keeping one JSON document per session under a root
/// directory.
pub struct JsonFileStore {
    root: PathBuf,
}

impl JsonFileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    fn path_for(&self, session_key: &str) -> PathBuf {
        // session keys come from callers; keep them from escaping the root
        let safe: String = session_key
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        self.root.join(format!("{safe}.json"))
    }
}

#[async_trait]
impl SessionStore for JsonFileStore {
    async fn load(&self, session_key: &str) -> Result<Option<ExecutionState>, StoreError> {
        match tokio::fs::read_to_string(self.path_for(session_key)).await {
            Ok(blob) => Ok(Some(serde_json::from_str(&blob)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    async fn save(&self, session_key: &str, state: &ExecutionState) -> Result<(), StoreError> {
        tokio::fs::create_dir_all(&self.root).await?;
        let blob = serde_json::to_vec_pretty(state)?;
        tokio::fs::write(self.path_for(session_key), blob).await?;
        debug!(session = %session_key, "session state saved");
        Ok(())
    }
}

/// Registry of per-session locks.
///
/// Each session's load-mutate-save cycle runs under its own async mutex, so
/// a double-submitted turn for one session serializes while unrelated
/// sessions keep making progress.
#[derive(Default)]
pub struct SessionLocks {
    inner: std::sync::Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl SessionLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the lock for `session_key`, creating it on first use.
    pub fn acquire(&self, session_key: &str) -> Arc<Mutex<()>> {
        let mut map = match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(map.entry(session_key.to_string()).or_default())
    }
}
