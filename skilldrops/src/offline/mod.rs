//! Offline-first resource cache.
//!
//! Sits below both stores and guarantees the app shell loads without a
//! network. Cached resources live in named, versioned cache generations;
//! exactly one generation is current at a time:
//!
//! - **install** opens the cache named by the current version tag and
//!   populates it with the app-shell manifest fetched from the network;
//! - **activate** deletes every generation whose name does not match the
//!   current tag, then takes over request handling immediately;
//! - **handle** is cache-first with network fallback and opportunistic
//!   population, plus the cached root document as an offline fallback for
//!   top-level document requests.

mod fetch;
mod storage;

pub use fetch::{Fetch, HttpFetcher};
pub use storage::{Cache, CacheStorage, CachedResponse};

use std::future::Future;
use std::pin::Pin;
use tracing::{debug, info, warn};

/// Current cache generation tag. Bumping it supersedes all older
/// generations on the next activation.
pub const CACHE_NAME: &str = "skilldrops-v1";

/// App-shell resources cached at install time.
pub const APP_SHELL: &[&str] = &[
    "/",
    "/index.html",
    "/style.css",
    "/script.js",
    "/db.js",
    "/manifest.json",
    "/icons/favicon-16x16.png",
    "/icons/favicon-32x32.png",
];

/// Served when a document request fails both cache and network.
const OFFLINE_FALLBACK: &str = "/index.html";

/// Errors from the cache layer.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    #[error("cache storage error: {0}")]
    Storage(#[source] Box<dyn std::error::Error + Send + Sync>),
    #[error("network error: {0}")]
    Network(String),
    /// Offline, not cached, and no usable fallback.
    #[error("no cached copy of {0}")]
    MissingResource(String),
}

impl From<std::io::Error> for CacheError {
    fn from(err: std::io::Error) -> Self {
        CacheError::Storage(Box::new(err))
    }
}

impl From<serde_json::Error> for CacheError {
    fn from(err: serde_json::Error) -> Self {
        CacheError::Storage(Box::new(err))
    }
}

/// What an intercepted request is for; document requests get the offline
/// fallback page when everything else fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Destination {
    Document,
    Asset,
}

/// An intercepted outgoing resource request.
#[derive(Debug, Clone)]
pub struct ResourceRequest {
    pub path: String,
    pub destination: Destination,
}

impl ResourceRequest {
    pub fn document(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            destination: Destination::Document,
        }
    }

    pub fn asset(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            destination: Destination::Asset,
        }
    }
}

/// Lifecycle of the current cache generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Installing,
    Active,
}

/// Deferred work to run when connectivity returns. No task types are
/// defined by the core; this is an extension point.
pub trait SyncTask: Send + Sync {
    fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), CacheError>> + Send + '_>>;
}

/// The interception layer: one current cache generation plus a network
/// fetcher.
pub struct OfflineCache<F> {
    storage: CacheStorage,
    fetcher: F,
    version: String,
    state: LifecycleState,
    sync_tasks: Vec<Box<dyn SyncTask>>,
}

impl<F: Fetch> OfflineCache<F> {
    pub fn new(storage: CacheStorage, fetcher: F) -> Self {
        Self::with_version(storage, fetcher, CACHE_NAME)
    }

    pub fn with_version(storage: CacheStorage, fetcher: F, version: impl Into<String>) -> Self {
        Self {
            storage,
            fetcher,
            version: version.into(),
            state: LifecycleState::Installing,
            sync_tasks: Vec::new(),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.state
    }

    /// Populate the current generation with the app-shell manifest. A
    /// failed fetch fails the whole install; the generation stays
    /// non-current until [`activate`](Self::activate).
    pub async fn install(&self) -> Result<usize, CacheError> {
        let cache = self.storage.open(&self.version)?;
        for path in APP_SHELL {
            let response = self.fetcher.fetch(path).await?;
            cache.put(path, &response)?;
        }
        info!(cache = %self.version, resources = APP_SHELL.len(), "Cached app shell");
        Ok(APP_SHELL.len())
    }

    /// Make this generation current: purge every other generation, then
    /// start serving immediately. Returns the purged names.
    pub async fn activate(&mut self) -> Result<Vec<String>, CacheError> {
        let mut purged = Vec::new();
        for name in self.storage.cache_names()? {
            if name != self.version {
                info!(cache = %name, "Deleting old cache");
                self.storage.delete(&name)?;
                purged.push(name);
            }
        }
        self.state = LifecycleState::Active;
        Ok(purged)
    }

    /// Cache-first with network fallback and opportunistic population.
    pub async fn handle(&self, request: &ResourceRequest) -> Result<CachedResponse, CacheError> {
        let cache = self.storage.open(&self.version)?;

        if let Some(hit) = cache.match_path(&request.path)? {
            debug!(path = %request.path, "Cache hit");
            return Ok(hit);
        }

        match self.fetcher.fetch(&request.path).await {
            Ok(response) => {
                if response.is_cacheable() {
                    cache.put(&request.path, &response)?;
                }
                Ok(response)
            }
            Err(err) => {
                // Offline and not cached: documents fall back to the cached
                // root page, everything else propagates the failure.
                if request.destination == Destination::Document {
                    if let Some(fallback) = cache.match_path(OFFLINE_FALLBACK)? {
                        debug!(path = %request.path, "Serving offline fallback");
                        return Ok(fallback);
                    }
                    return Err(CacheError::MissingResource(request.path.clone()));
                }
                Err(err)
            }
        }
    }

    pub fn register_sync_task(&mut self, task: Box<dyn SyncTask>) {
        self.sync_tasks.push(task);
    }

    /// Run all registered sync tasks. Failures are logged, not propagated:
    /// the tasks will run again on the next connectivity change.
    pub async fn run_background_sync(&self) {
        debug!(tasks = self.sync_tasks.len(), "Background sync triggered");
        for task in &self.sync_tasks {
            if let Err(e) = task.run().await {
                warn!(error = %e, "Background sync task failed");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Scripted fetcher: canned responses, a connectivity switch, and a
    /// request counter.
    #[derive(Clone, Default)]
    struct ScriptedFetcher {
        responses: HashMap<String, CachedResponse>,
        offline: Arc<AtomicBool>,
        calls: Arc<AtomicUsize>,
    }

    impl ScriptedFetcher {
        fn with_app_shell() -> Self {
            let mut fetcher = Self::default();
            for path in APP_SHELL {
                fetcher.responses.insert(
                    path.to_string(),
                    CachedResponse::ok("text/plain", format!("shell:{path}")),
                );
            }
            fetcher
        }

        fn insert(&mut self, path: &str, response: CachedResponse) {
            self.responses.insert(path.to_string(), response);
        }

        fn go_offline(&self) {
            self.offline.store(true, Ordering::SeqCst);
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl Fetch for ScriptedFetcher {
        async fn fetch(&self, path: &str) -> Result<CachedResponse, CacheError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.offline.load(Ordering::SeqCst) {
                return Err(CacheError::Network("offline".into()));
            }
            self.responses
                .get(path)
                .cloned()
                .ok_or_else(|| CacheError::Network(format!("no route to {path}")))
        }
    }

    fn cache_with(
        tmp: &tempfile::TempDir,
        fetcher: ScriptedFetcher,
    ) -> OfflineCache<ScriptedFetcher> {
        OfflineCache::new(CacheStorage::new(tmp.path()), fetcher)
    }

    #[tokio::test]
    async fn install_populates_manifest() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::with_app_shell();
        let cache = cache_with(&tmp, fetcher.clone());

        let cached = cache.install().await.unwrap();
        assert_eq!(cached, APP_SHELL.len());
        assert_eq!(fetcher.calls(), APP_SHELL.len());

        // Everything in the manifest now serves without the network.
        fetcher.go_offline();
        let hit = cache.handle(&ResourceRequest::asset("/style.css")).await.unwrap();
        assert_eq!(hit.body, b"shell:/style.css");
    }

    #[tokio::test]
    async fn install_fails_when_a_manifest_fetch_fails() {
        let tmp = tempfile::tempdir().unwrap();
        let mut fetcher = ScriptedFetcher::with_app_shell();
        fetcher.responses.remove("/style.css");
        let cache = cache_with(&tmp, fetcher);

        assert!(matches!(cache.install().await, Err(CacheError::Network(_))));
    }

    #[tokio::test]
    async fn activate_purges_exactly_the_stale_generations() {
        let tmp = tempfile::tempdir().unwrap();
        let storage = CacheStorage::new(tmp.path());
        storage.open("skilldrops-v0").unwrap();
        storage.open("skilldrops-v1").unwrap();
        storage.open("legacy").unwrap();

        let mut cache =
            OfflineCache::with_version(storage.clone(), ScriptedFetcher::default(), "skilldrops-v1");
        assert_eq!(cache.state(), LifecycleState::Installing);

        let mut purged = cache.activate().await.unwrap();
        purged.sort();
        assert_eq!(purged, vec!["legacy".to_string(), "skilldrops-v0".to_string()]);
        assert_eq!(storage.cache_names().unwrap(), vec!["skilldrops-v1".to_string()]);
        assert_eq!(cache.state(), LifecycleState::Active);
    }

    #[tokio::test]
    async fn cached_document_is_served_without_network() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::with_app_shell();
        let cache = cache_with(&tmp, fetcher.clone());
        cache.install().await.unwrap();
        let calls_after_install = fetcher.calls();

        let hit = cache.handle(&ResourceRequest::document("/index.html")).await.unwrap();
        assert_eq!(hit.body, b"shell:/index.html");
        // Cache hit: zero additional network attempts.
        assert_eq!(fetcher.calls(), calls_after_install);
    }

    #[tokio::test]
    async fn miss_goes_to_network_and_populates_cache() {
        let tmp = tempfile::tempdir().unwrap();
        let mut fetcher = ScriptedFetcher::default();
        fetcher.insert("/data/skills.json", CachedResponse::ok("application/json", "[]"));
        let cache = cache_with(&tmp, fetcher.clone());

        let request = ResourceRequest::asset("/data/skills.json");
        let first = cache.handle(&request).await.unwrap();
        assert_eq!(first.body, b"[]");
        assert_eq!(fetcher.calls(), 1);

        // Second request is served from the populated cache.
        fetcher.go_offline();
        let second = cache.handle(&request).await.unwrap();
        assert_eq!(second, first);
        assert_eq!(fetcher.calls(), 1);
    }

    #[tokio::test]
    async fn non_basic_and_error_responses_are_not_cached() {
        let tmp = tempfile::tempdir().unwrap();
        let mut fetcher = ScriptedFetcher::default();
        fetcher.insert(
            "/cdn/font.woff2",
            CachedResponse {
                status: 200,
                content_type: None,
                body: b"font".to_vec(),
                basic: false,
            },
        );
        fetcher.insert(
            "/missing",
            CachedResponse {
                status: 404,
                content_type: None,
                body: vec![],
                basic: true,
            },
        );
        let cache = cache_with(&tmp, fetcher.clone());

        cache.handle(&ResourceRequest::asset("/cdn/font.woff2")).await.unwrap();
        cache.handle(&ResourceRequest::asset("/missing")).await.unwrap();

        // Neither response went into the cache, so both hit the network again.
        cache.handle(&ResourceRequest::asset("/cdn/font.woff2")).await.unwrap();
        cache.handle(&ResourceRequest::asset("/missing")).await.unwrap();
        assert_eq!(fetcher.calls(), 4);
    }

    #[tokio::test]
    async fn offline_document_request_falls_back_to_root_page() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::with_app_shell();
        let cache = cache_with(&tmp, fetcher.clone());
        cache.install().await.unwrap();

        fetcher.go_offline();
        let fallback = cache
            .handle(&ResourceRequest::document("/favorites"))
            .await
            .unwrap();
        assert_eq!(fallback.body, b"shell:/index.html");
    }

    #[tokio::test]
    async fn offline_document_without_fallback_is_missing_resource() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::default();
        let cache = cache_with(&tmp, fetcher.clone());

        fetcher.go_offline();
        let err = cache
            .handle(&ResourceRequest::document("/favorites"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::MissingResource(_)));
    }

    #[tokio::test]
    async fn offline_asset_request_propagates_failure() {
        let tmp = tempfile::tempdir().unwrap();
        let fetcher = ScriptedFetcher::with_app_shell();
        let cache = cache_with(&tmp, fetcher.clone());
        cache.install().await.unwrap();

        fetcher.go_offline();
        let err = cache
            .handle(&ResourceRequest::asset("/uncached.png"))
            .await
            .unwrap_err();
        assert!(matches!(err, CacheError::Network(_)));
    }

    #[tokio::test]
    async fn background_sync_runs_registered_tasks_and_swallows_failures() {
        struct CountingTask {
            runs: Arc<AtomicUsize>,
            fail: bool,
        }

        impl SyncTask for CountingTask {
            fn run(&self) -> Pin<Box<dyn Future<Output = Result<(), CacheError>> + Send + '_>> {
                Box::pin(async move {
                    self.runs.fetch_add(1, Ordering::SeqCst);
                    if self.fail {
                        Err(CacheError::Network("flaky".into()))
                    } else {
                        Ok(())
                    }
                })
            }
        }

        let tmp = tempfile::tempdir().unwrap();
        let mut cache = cache_with(&tmp, ScriptedFetcher::default());

        let runs = Arc::new(AtomicUsize::new(0));
        cache.register_sync_task(Box::new(CountingTask { runs: runs.clone(), fail: true }));
        cache.register_sync_task(Box::new(CountingTask { runs: runs.clone(), fail: false }));

        cache.run_background_sync().await;
        assert_eq!(runs.load(Ordering::SeqCst), 2);
    }
}
