//! Application wiring: one [`AppContext`] ties the local store, the remote
//! store, identity, migration and stats together and routes repository
//! calls to whichever store is active for the current auth state.

use crate::identity::IdentityProvider;
use crate::migration::MigrationCoordinator;
use crate::stats::{Stats, StatsAggregator};
use crate::store::documents::DocumentBackend;
use crate::store::{
    settings, Favorite, FavoriteRepository, LocalStore, RatingRepository, RatingValue,
    RemoteStore, Skill, SkillDraft, SkillRepository, StoreError,
};
use tracing::info;

/// The store repository calls are routed to. Signed out means local-only;
/// signed in means the user's remote collections.
#[derive(Clone)]
pub enum ActiveStore<B> {
    Local(LocalStore),
    Remote(RemoteStore<B>),
}

impl<B: DocumentBackend> SkillRepository for ActiveStore<B> {
    async fn add_skill(&self, draft: &SkillDraft) -> Result<Skill, StoreError> {
        match self {
            ActiveStore::Local(s) => s.add_skill(draft).await,
            ActiveStore::Remote(s) => s.add_skill(draft).await,
        }
    }

    async fn get_skill(&self, id: &str) -> Result<Option<Skill>, StoreError> {
        match self {
            ActiveStore::Local(s) => s.get_skill(id).await,
            ActiveStore::Remote(s) => s.get_skill(id).await,
        }
    }

    async fn get_all_skills(&self) -> Result<Vec<Skill>, StoreError> {
        match self {
            ActiveStore::Local(s) => s.get_all_skills().await,
            ActiveStore::Remote(s) => s.get_all_skills().await,
        }
    }

    async fn get_random_skill(&self) -> Result<Option<Skill>, StoreError> {
        match self {
            ActiveStore::Local(s) => s.get_random_skill().await,
            ActiveStore::Remote(s) => s.get_random_skill().await,
        }
    }

    async fn skills_count(&self) -> Result<u64, StoreError> {
        match self {
            ActiveStore::Local(s) => s.skills_count().await,
            ActiveStore::Remote(s) => s.skills_count().await,
        }
    }

    async fn skills_by_category(&self, category: &str) -> Result<Vec<Skill>, StoreError> {
        match self {
            ActiveStore::Local(s) => s.skills_by_category(category).await,
            ActiveStore::Remote(s) => s.skills_by_category(category).await,
        }
    }
}

impl<B: DocumentBackend> FavoriteRepository for ActiveStore<B> {
    async fn add_favorite(&self, skill: &Skill) -> Result<(), StoreError> {
        match self {
            ActiveStore::Local(s) => s.add_favorite(skill).await,
            ActiveStore::Remote(s) => s.add_favorite(skill).await,
        }
    }

    async fn remove_favorite(&self, skill_id: &str) -> Result<(), StoreError> {
        match self {
            ActiveStore::Local(s) => s.remove_favorite(skill_id).await,
            ActiveStore::Remote(s) => s.remove_favorite(skill_id).await,
        }
    }

    async fn get_favorite(&self, skill_id: &str) -> Result<Option<Favorite>, StoreError> {
        match self {
            ActiveStore::Local(s) => s.get_favorite(skill_id).await,
            ActiveStore::Remote(s) => s.get_favorite(skill_id).await,
        }
    }

    async fn get_favorites(&self) -> Result<Vec<Favorite>, StoreError> {
        match self {
            ActiveStore::Local(s) => s.get_favorites().await,
            ActiveStore::Remote(s) => s.get_favorites().await,
        }
    }
}

impl<B: DocumentBackend> RatingRepository for ActiveStore<B> {
    async fn add_rating(&self, skill_id: &str, rating: RatingValue) -> Result<(), StoreError> {
        match self {
            ActiveStore::Local(s) => s.add_rating(skill_id, rating).await,
            ActiveStore::Remote(s) => s.add_rating(skill_id, rating).await,
        }
    }

    async fn remove_rating(&self, skill_id: &str) -> Result<(), StoreError> {
        match self {
            ActiveStore::Local(s) => s.remove_rating(skill_id).await,
            ActiveStore::Remote(s) => s.remove_rating(skill_id).await,
        }
    }

    async fn get_rating(&self, skill_id: &str) -> Result<Option<RatingValue>, StoreError> {
        match self {
            ActiveStore::Local(s) => s.get_rating(skill_id).await,
            ActiveStore::Remote(s) => s.get_rating(skill_id).await,
        }
    }
}

/// Everything a frontend needs, wired together once at startup.
pub struct AppContext<B> {
    local: LocalStore,
    remote: RemoteStore<B>,
    identity: IdentityProvider,
    migration: MigrationCoordinator<B>,
    stats: StatsAggregator,
}

impl<B: DocumentBackend + Clone> AppContext<B> {
    pub fn new(local: LocalStore, backend: B) -> Self {
        let identity = IdentityProvider::default();
        let remote = RemoteStore::new(backend.clone(), identity.subscribe());
        let migration = MigrationCoordinator::new(local.clone(), backend);
        let stats = StatsAggregator::new(local.clone());
        Self {
            local,
            remote,
            identity,
            migration,
            stats,
        }
    }

    pub fn local(&self) -> &LocalStore {
        &self.local
    }

    pub fn identity(&self) -> &IdentityProvider {
        &self.identity
    }

    /// The store calls are currently routed to.
    pub fn store(&self) -> ActiveStore<B> {
        if self.identity.current().is_signed_in() {
            ActiveStore::Remote(self.remote.clone())
        } else {
            ActiveStore::Local(self.local.clone())
        }
    }

    /// Re-establish the session persisted by a previous [`sign_in`]
    /// (Self::sign_in). Triggers the migration check again; the durable
    /// flag makes the repeat a no-op when it already completed.
    pub async fn restore_identity(&self) -> Result<Option<String>, StoreError> {
        let Some(user_id) = self.local.get_setting(settings::AUTH_USER).await? else {
            return Ok(None);
        };
        let display_name = self.local.get_setting(settings::AUTH_DISPLAY_NAME).await?;
        self.identity.sign_in(&user_id, display_name);
        self.migration.on_sign_in(&user_id).await;
        Ok(Some(user_id))
    }

    /// Sign the user in, persist the session and kick off the one-time
    /// local-to-remote migration.
    pub async fn sign_in(
        &self,
        user_id: &str,
        display_name: Option<String>,
    ) -> Result<(), StoreError> {
        self.local.put_setting(settings::AUTH_USER, user_id).await?;
        match &display_name {
            Some(name) => {
                self.local
                    .put_setting(settings::AUTH_DISPLAY_NAME, name)
                    .await?
            }
            None => self.local.delete_setting(settings::AUTH_DISPLAY_NAME).await?,
        }
        self.identity.sign_in(user_id, display_name);
        info!(user_id, "Signed in");
        self.migration.on_sign_in(user_id).await;
        Ok(())
    }

    pub async fn sign_out(&self) -> Result<(), StoreError> {
        self.local.delete_setting(settings::AUTH_USER).await?;
        self.local.delete_setting(settings::AUTH_DISPLAY_NAME).await?;
        self.identity.sign_out();
        info!("Signed out");
        Ok(())
    }

    /// Serve a random skill and count it towards the daily streak. An
    /// empty store yields `Ok(None)` and leaves the streak untouched.
    pub async fn drop_skill(&self) -> Result<Option<Skill>, StoreError> {
        let skill = self.store().get_random_skill().await?;
        if skill.is_some() {
            self.stats.record_skill_drop().await?;
        }
        Ok(skill)
    }

    pub async fn stats(&self) -> Result<Stats, StoreError> {
        let signed_in = self.identity.current().is_signed_in();
        self.stats.collect(&self.store(), signed_in).await
    }

    pub async fn theme(&self) -> Result<Option<String>, StoreError> {
        self.local.get_setting(settings::THEME).await
    }

    pub async fn set_theme(&self, theme: &str) -> Result<(), StoreError> {
        self.local.put_setting(settings::THEME, theme).await
    }
}
