//! Persistence layer: record types, repository traits, and the two store
//! backends (local SQLite, remote document store).

pub mod documents;
pub mod records;
pub mod remote;
pub mod sqlite;
pub mod traits;


pub use documents::{Document, DocumentBackend, FileBackend, MemoryBackend};
pub use records::{Favorite, Rating, RatingValue, Skill, SkillDraft};
pub use remote::RemoteStore;
pub use sqlite::{Database, LocalStore};
pub use traits::{FavoriteRepository, RatingRepository, SkillRepository};

use chrono::Utc;

/// Errors from the persistence layer.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The store could not be opened at all. Fatal to the affected store;
    /// callers degrade to the other store or an empty state.
    #[error("store initialization failed: {0}")]
    Initialization(String),
    /// A single operation failed on an underlying I/O call. Recoverable.
    #[error("store operation failed: {0}")]
    Operation(#[source] Box<dyn std::error::Error + Send + Sync>),
    /// A uniqueness constraint was violated; the record already exists.
    #[error("record already exists")]
    DuplicateKey,
    /// A user-scoped operation was issued without a signed-in identity.
    #[error("not signed in")]
    NotAuthenticated,
    /// The remote document service could not be reached or failed.
    #[error("remote store unavailable: {0}")]
    RemoteUnavailable(String),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        let unique = err
            .as_database_error()
            .is_some_and(|db| db.is_unique_violation());
        if unique {
            StoreError::DuplicateKey
        } else {
            StoreError::Operation(Box::new(err))
        }
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(err: serde_json::Error) -> Self {
        StoreError::Operation(Box::new(err))
    }
}

/// Persisted settings keys (local key-value collection).
pub mod settings {
    pub const THEME: &str = "theme";
    pub const CURRENT_STREAK: &str = "currentStreak";
    pub const LAST_SKILL_DATE: &str = "lastSkillDate";
    pub const LAST_NOTIFICATION: &str = "lastNotification";
    pub const AUTH_USER: &str = "auth_user";
    pub const AUTH_DISPLAY_NAME: &str = "auth_display_name";

    /// Per-user durable flag recording that the local→remote favorites
    /// migration has completed. Never reset automatically.
    pub fn migration_completed(user_id: &str) -> String {
        format!("migration_completed_{user_id}")
    }
}

/// Current unix timestamp in milliseconds.
pub fn now_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}
