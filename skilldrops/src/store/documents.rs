//! Document-store primitives consumed by the remote store.
//!
//! The remote service is specified only at this interface: pathed documents
//! with overwrite-by-key `set`, plus collection listing. Write timestamps
//! are assigned by the backend (monotonic per write, never the client
//! clock), so favorites ordering survives client clock skew.
//!
//! Two stand-in implementations ship with the crate: an in-memory backend
//! for tests and a JSON-file-per-document backend used by the binary.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::warn;

use super::{now_timestamp_ms, StoreError};

/// A stored document: a JSON object payload plus the backend-assigned write
/// timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub fields: Value,
    /// Unix millis, assigned at write time. Strictly increasing across
    /// writes to the same backend.
    pub written_at: i64,
}

/// The four primitives every remote document service must provide.
///
/// Paths are slash-separated, e.g. `skills/7` or `users/u1/favorites/7`;
/// a collection path is a document path without the final id segment.
pub trait DocumentBackend: Send + Sync {
    fn get(
        &self,
        path: &str,
    ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send;
    /// Overwrite the document at `path`. Never appends: repeated sets of the
    /// same path produce one document.
    fn set(&self, path: &str, fields: Value)
        -> impl Future<Output = Result<(), StoreError>> + Send;
    fn delete(&self, path: &str) -> impl Future<Output = Result<(), StoreError>> + Send;
    /// All direct children of `collection`, unordered. Callers needing a
    /// stable order sort on `written_at` or a payload field.
    fn list(
        &self,
        collection: &str,
    ) -> impl Future<Output = Result<Vec<(String, Document)>, StoreError>> + Send;
}

// ── In-memory backend ──────────────────────────────────────────────────

#[derive(Default)]
struct MemoryInner {
    docs: BTreeMap<String, Document>,
    clock: i64,
}

/// In-memory document backend. Cheap to clone (shared state).
#[derive(Clone, Default)]
pub struct MemoryBackend {
    inner: Arc<Mutex<MemoryInner>>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentBackend for MemoryBackend {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        Ok(self.inner.lock().await.docs.get(path).cloned())
    }

    async fn set(&self, path: &str, fields: Value) -> Result<(), StoreError> {
        let mut inner = self.inner.lock().await;
        inner.clock = next_tick(inner.clock);
        let written_at = inner.clock;
        inner
            .docs
            .insert(path.to_string(), Document { fields, written_at });
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        self.inner.lock().await.docs.remove(path);
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let prefix = format!("{collection}/");
        let inner = self.inner.lock().await;
        Ok(inner
            .docs
            .range(prefix.clone()..)
            .take_while(|(path, _)| path.starts_with(&prefix))
            .filter_map(|(path, doc)| {
                let id = &path[prefix.len()..];
                // Direct children only, not nested subcollections.
                (!id.is_empty() && !id.contains('/'))
                    .then(|| (id.to_string(), doc.clone()))
            })
            .collect())
    }
}

// ── File backend ───────────────────────────────────────────────────────

/// One JSON file per document under a directory tree mirroring the document
/// paths. The write clock is persisted so timestamps never regress across
/// restarts.
#[derive(Clone)]
pub struct FileBackend {
    root: PathBuf,
    clock: Arc<Mutex<()>>,
}

const CLOCK_FILE: &str = ".write_clock";

impl FileBackend {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            clock: Arc::new(Mutex::new(())),
        }
    }

    fn doc_file(&self, path: &str) -> PathBuf {
        let mut file = self.root.clone();
        for segment in path.split('/').filter(|s| !s.is_empty()) {
            file.push(segment);
        }
        file.set_extension("json");
        file
    }

    /// Advance and persist the write clock. Serialized by the mutex so
    /// concurrent writers cannot observe the same tick.
    async fn assign_timestamp(&self) -> Result<i64, StoreError> {
        let _guard = self.clock.lock().await;
        let clock_path = self.root.join(CLOCK_FILE);
        let previous = match std::fs::read_to_string(&clock_path) {
            Ok(contents) => contents.trim().parse::<i64>().unwrap_or(0),
            Err(_) => 0,
        };
        let tick = next_tick(previous);
        std::fs::create_dir_all(&self.root).map_err(remote_io)?;
        std::fs::write(&clock_path, tick.to_string()).map_err(remote_io)?;
        Ok(tick)
    }
}

impl DocumentBackend for FileBackend {
    async fn get(&self, path: &str) -> Result<Option<Document>, StoreError> {
        let file = self.doc_file(path);
        if !file.exists() {
            return Ok(None);
        }
        let contents = std::fs::read_to_string(&file).map_err(remote_io)?;
        let doc = serde_json::from_str(&contents)
            .map_err(|e| StoreError::RemoteUnavailable(e.to_string()))?;
        Ok(Some(doc))
    }

    async fn set(&self, path: &str, fields: Value) -> Result<(), StoreError> {
        let written_at = self.assign_timestamp().await?;
        let file = self.doc_file(path);
        if let Some(parent) = file.parent() {
            std::fs::create_dir_all(parent).map_err(remote_io)?;
        }
        let doc = Document { fields, written_at };
        let json = serde_json::to_string_pretty(&doc)
            .map_err(|e| StoreError::RemoteUnavailable(e.to_string()))?;
        std::fs::write(&file, json).map_err(remote_io)?;
        Ok(())
    }

    async fn delete(&self, path: &str) -> Result<(), StoreError> {
        let file = self.doc_file(path);
        if file.exists() {
            std::fs::remove_file(&file).map_err(remote_io)?;
        }
        Ok(())
    }

    async fn list(&self, collection: &str) -> Result<Vec<(String, Document)>, StoreError> {
        let mut dir = self.root.clone();
        for segment in collection.split('/').filter(|s| !s.is_empty()) {
            dir.push(segment);
        }
        if !dir.exists() {
            return Ok(vec![]);
        }

        let mut docs = Vec::new();
        for entry in std::fs::read_dir(&dir).map_err(remote_io)? {
            let entry = entry.map_err(remote_io)?;
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("json") {
                continue;
            }
            let Some(id) = path.file_stem().and_then(|s| s.to_str()) else {
                continue;
            };
            match read_document(&path) {
                Ok(doc) => docs.push((id.to_string(), doc)),
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable document");
                }
            }
        }
        Ok(docs)
    }
}

fn read_document(path: &Path) -> Result<Document, StoreError> {
    let contents = std::fs::read_to_string(path).map_err(remote_io)?;
    serde_json::from_str(&contents).map_err(|e| StoreError::RemoteUnavailable(e.to_string()))
}

fn remote_io(err: std::io::Error) -> StoreError {
    StoreError::RemoteUnavailable(err.to_string())
}

/// Monotonic write clock: wall time, but never at or behind the last tick.
fn next_tick(previous: i64) -> i64 {
    now_timestamp_ms().max(previous + 1)
}
