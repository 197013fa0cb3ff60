//! One-time migration of local favorites into the signed-in user's remote
//! namespace.
//!
//! The coordinator runs on every signed-in transition and is guarded by a
//! durable per-user flag in the local settings collection: the flag is read
//! before starting and written only after every remote write succeeded, so
//! the whole migration retries from scratch on the next sign-in after a
//! partial failure. Remote writes are overwrite-by-key (`skill_id` is the
//! document key), which makes re-running a partially-completed migration
//! produce the same end state as a single clean run. Per-item resumption is
//! deliberately not implemented: redundant writes on retry are cheaper than
//! the bookkeeping.

use serde_json::json;
use tokio::sync::Mutex;
use tracing::{info, warn};

use crate::store::documents::DocumentBackend;
use crate::store::traits::FavoriteRepository;
use crate::store::{settings, LocalStore, RemoteStore, StoreError};

/// Outcome of one coordinator run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MigrationReport {
    /// True when the per-user flag was already set and nothing was done.
    pub skipped: bool,
    /// Favorites written to the remote namespace in this run.
    pub favorites: u64,
}

/// Coordinates the local→remote favorites migration for each user.
pub struct MigrationCoordinator<B> {
    local: LocalStore,
    backend: B,
    // Serializes concurrent runs (rapid sign-out/sign-in) so at most one
    // logical migration completes per user.
    guard: Mutex<()>,
}

impl<B: DocumentBackend> MigrationCoordinator<B> {
    pub fn new(local: LocalStore, backend: B) -> Self {
        Self {
            local,
            backend,
            guard: Mutex::new(()),
        }
    }

    /// Entry point for the sign-in transition. Intentionally swallows
    /// failures at this level: a transient remote failure during migration
    /// must never surface as a user-facing error; the flag stays unset and
    /// the next sign-in retries silently.
    pub async fn on_sign_in(&self, user_id: &str) {
        match self.run(user_id).await {
            Ok(report) if report.skipped => {}
            Ok(report) => {
                info!(user_id, favorites = report.favorites, "Favorites migration completed");
            }
            Err(e) => {
                warn!(user_id, error = %e, "Favorites migration failed, will retry on next sign-in");
            }
        }
    }

    /// Run the migration for `user_id`. Idempotent: once the per-user flag
    /// is set, every later call is a no-op.
    pub async fn run(&self, user_id: &str) -> Result<MigrationReport, StoreError> {
        let _serialized = self.guard.lock().await;

        let flag_key = settings::migration_completed(user_id);
        if self.local.get_setting(&flag_key).await?.is_some() {
            return Ok(MigrationReport {
                skipped: true,
                favorites: 0,
            });
        }

        info!(user_id, "Starting local favorites migration");

        let favorites = self.local.get_favorites().await?;
        let collection = RemoteStore::<B>::favorites_collection(user_id);
        for favorite in &favorites {
            // Overwrite keyed by skill_id; the original local creation time
            // travels as payload so the favorites ordering is preserved.
            let fields = json!({
                "title": favorite.title,
                "summary": favorite.summary,
                "url": favorite.url,
                "created_at": favorite.created_at,
            });
            self.backend
                .set(&format!("{collection}/{}", favorite.skill_id), fields)
                .await?;
        }

        // The flag is written only after the full loop succeeded.
        self.local.put_setting(&flag_key, "true").await?;

        Ok(MigrationReport {
            skipped: false,
            favorites: favorites.len() as u64,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::identity::IdentityProvider;
    use crate::store::documents::{Document, MemoryBackend};
    use crate::store::sqlite::Database;
    use crate::store::traits::SkillRepository;
    use crate::store::{Favorite, SkillDraft};
    use serde_json::Value;
    use std::future::Future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// Backend wrapper that fails every `set` after the first `allow_sets`.
    #[derive(Clone)]
    struct FlakyBackend {
        inner: MemoryBackend,
        remaining_sets: Arc<AtomicUsize>,
    }

    impl FlakyBackend {
        fn failing_after(allow_sets: usize) -> Self {
            Self {
                inner: MemoryBackend::new(),
                remaining_sets: Arc::new(AtomicUsize::new(allow_sets)),
            }
        }

        fn heal(&self) {
            self.remaining_sets.store(usize::MAX, Ordering::SeqCst);
        }
    }

    impl DocumentBackend for FlakyBackend {
        fn get(
            &self,
            path: &str,
        ) -> impl Future<Output = Result<Option<Document>, StoreError>> + Send {
            self.inner.get(path)
        }

        async fn set(&self, path: &str, fields: Value) -> Result<(), StoreError> {
            let remaining = self.remaining_sets.load(Ordering::SeqCst);
            if remaining == 0 {
                return Err(StoreError::RemoteUnavailable("connection reset".into()));
            }
            if remaining != usize::MAX {
                self.remaining_sets.store(remaining - 1, Ordering::SeqCst);
            }
            self.inner.set(path, fields).await
        }

        fn delete(&self, path: &str) -> impl Future<Output = Result<(), StoreError>> + Send {
            self.inner.delete(path)
        }

        fn list(
            &self,
            collection: &str,
        ) -> impl Future<Output = Result<Vec<(String, Document)>, StoreError>> + Send {
            self.inner.list(collection)
        }
    }

    async fn local_with_favorites(count: usize) -> LocalStore {
        let db = Database::new_in_memory().await.unwrap();
        let local = LocalStore::new(db.pool().clone());
        for i in 0..count {
            let skill = local
                .add_skill(&SkillDraft {
                    title: format!("Skill {i}"),
                    summary: format!("Summary {i}"),
                    url: None,
                    category: "learning".into(),
                })
                .await
                .unwrap();
            local.add_favorite(&skill).await.unwrap();
        }
        local
    }

    async fn remote_favorites<B: DocumentBackend + Clone>(
        backend: &B,
        user_id: &str,
    ) -> Vec<Favorite> {
        let provider = IdentityProvider::default();
        provider.sign_in(user_id, None);
        let remote = RemoteStore::new(backend.clone(), provider.subscribe());
        remote.get_favorites().await.unwrap()
    }

    #[tokio::test]
    async fn migrates_all_favorites_and_sets_flag() {
        let local = local_with_favorites(3).await;
        let backend = MemoryBackend::new();
        let coordinator = MigrationCoordinator::new(local.clone(), backend.clone());

        let report = coordinator.run("u1").await.unwrap();
        assert!(!report.skipped);
        assert_eq!(report.favorites, 3);

        let migrated = remote_favorites(&backend, "u1").await;
        assert_eq!(migrated.len(), 3);
        assert_eq!(
            local.get_setting("migration_completed_u1").await.unwrap(),
            Some("true".into())
        );
    }

    #[tokio::test]
    async fn second_run_is_skipped_and_state_unchanged() {
        let local = local_with_favorites(2).await;
        let backend = MemoryBackend::new();
        let coordinator = MigrationCoordinator::new(local, backend.clone());

        let first = coordinator.run("u1").await.unwrap();
        assert!(!first.skipped);
        let after_first = remote_favorites(&backend, "u1").await;

        let second = coordinator.run("u1").await.unwrap();
        assert!(second.skipped);
        assert_eq!(second.favorites, 0);
        assert_eq!(remote_favorites(&backend, "u1").await, after_first);
    }

    #[tokio::test]
    async fn empty_local_store_sets_flag_immediately() {
        let local = local_with_favorites(0).await;
        let backend = MemoryBackend::new();
        let coordinator = MigrationCoordinator::new(local.clone(), backend.clone());

        let report = coordinator.run("u1").await.unwrap();
        assert!(!report.skipped);
        assert_eq!(report.favorites, 0);
        assert!(local
            .get_setting("migration_completed_u1")
            .await
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn partial_failure_retries_to_clean_state() {
        let local = local_with_favorites(3).await;
        // First write succeeds, second fails.
        let backend = FlakyBackend::failing_after(1);
        let coordinator = MigrationCoordinator::new(local.clone(), backend.clone());

        let err = coordinator.run("u1").await.unwrap_err();
        assert!(matches!(err, StoreError::RemoteUnavailable(_)));

        // Flag stays unset after the failed run; one favorite made it over.
        assert_eq!(
            local.get_setting("migration_completed_u1").await.unwrap(),
            None
        );
        assert_eq!(remote_favorites(&backend, "u1").await.len(), 1);

        // Next sign-in retries the whole migration; overwrite-by-key makes
        // the redundant first write harmless.
        backend.heal();
        let report = coordinator.run("u1").await.unwrap();
        assert!(!report.skipped);
        assert_eq!(report.favorites, 3);

        let migrated = remote_favorites(&backend, "u1").await;
        assert_eq!(migrated.len(), 3);
        assert!(local
            .get_setting("migration_completed_u1")
            .await
            .unwrap()
            .is_some());

        // Final state matches a clean single run on a fresh backend.
        let clean_backend = MemoryBackend::new();
        let clean = MigrationCoordinator::new(local, clean_backend.clone());
        clean
            .local
            .delete_setting("migration_completed_u1")
            .await
            .unwrap();
        clean.run("u1").await.unwrap();
        let clean_favorites = remote_favorites(&clean_backend, "u1").await;
        assert_eq!(migrated, clean_favorites);
    }

    #[tokio::test]
    async fn migrated_favorites_keep_local_creation_order() {
        let local = local_with_favorites(3).await;
        let backend = MemoryBackend::new();
        MigrationCoordinator::new(local.clone(), backend.clone())
            .run("u1")
            .await
            .unwrap();

        let local_order: Vec<String> = local
            .get_favorites()
            .await
            .unwrap()
            .into_iter()
            .map(|f| f.skill_id)
            .collect();
        // Remote contract is newest-first; the migrated set reverses the
        // local insertion order.
        let mut remote_order: Vec<String> = remote_favorites(&backend, "u1")
            .await
            .into_iter()
            .map(|f| f.skill_id)
            .collect();
        remote_order.reverse();
        assert_eq!(local_order, remote_order);
    }

    #[tokio::test]
    async fn on_sign_in_swallows_remote_failures() {
        let local = local_with_favorites(2).await;
        let backend = FlakyBackend::failing_after(0);
        let coordinator = MigrationCoordinator::new(local.clone(), backend);

        // Must not panic or propagate; the flag stays unset for retry.
        coordinator.on_sign_in("u1").await;
        assert_eq!(
            local.get_setting("migration_completed_u1").await.unwrap(),
            None
        );
    }

    #[tokio::test]
    async fn flags_are_independent_per_user() {
        let local = local_with_favorites(1).await;
        let backend = MemoryBackend::new();
        let coordinator = MigrationCoordinator::new(local, backend.clone());

        coordinator.run("u1").await.unwrap();
        let report = coordinator.run("u2").await.unwrap();
        assert!(!report.skipped);

        assert_eq!(remote_favorites(&backend, "u1").await.len(), 1);
        assert_eq!(remote_favorites(&backend, "u2").await.len(), 1);
    }
}
