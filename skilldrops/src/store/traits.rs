//! Async repository trait definitions for the persistence layer.
//!
//! Each trait abstracts over one record collection, allowing the local
//! SQLite backend and the remote document-store backend to be used
//! interchangeably via static dispatch.
//!
//! Methods return `impl Future + Send` rather than using `async fn` so that
//! the futures are guaranteed `Send`, as required by `tokio::spawn`.

use super::records::{Favorite, RatingValue, Skill, SkillDraft};
use super::StoreError;
use std::future::Future;

/// Repository for skills.
pub trait SkillRepository: Send + Sync {
    /// Insert a new skill; the store assigns the id and creation timestamp.
    fn add_skill(
        &self,
        draft: &SkillDraft,
    ) -> impl Future<Output = Result<Skill, StoreError>> + Send;
    fn get_skill(
        &self,
        id: &str,
    ) -> impl Future<Output = Result<Option<Skill>, StoreError>> + Send;
    fn get_all_skills(&self) -> impl Future<Output = Result<Vec<Skill>, StoreError>> + Send;
    /// Uniform random choice over the full set on every call. Returns
    /// `Ok(None)` on an empty collection; that is not an error.
    fn get_random_skill(&self)
        -> impl Future<Output = Result<Option<Skill>, StoreError>> + Send;
    fn skills_count(&self) -> impl Future<Output = Result<u64, StoreError>> + Send;
    fn skills_by_category(
        &self,
        category: &str,
    ) -> impl Future<Output = Result<Vec<Skill>, StoreError>> + Send;
}

/// Repository for favorites.
///
/// Implementations must enforce the at-most-one-favorite-per-skill
/// invariant: the local store via a unique index on `skill_id`, the remote
/// store by using `skill_id` as the document key.
pub trait FavoriteRepository: Send + Sync {
    /// Save a denormalized snapshot of `skill`. The local store fails with
    /// [`StoreError::DuplicateKey`] when a favorite for that skill already
    /// exists; the remote store overwrites by key.
    fn add_favorite(&self, skill: &Skill)
        -> impl Future<Output = Result<(), StoreError>> + Send;
    /// No-op (not an error) when absent.
    fn remove_favorite(
        &self,
        skill_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn get_favorite(
        &self,
        skill_id: &str,
    ) -> impl Future<Output = Result<Option<Favorite>, StoreError>> + Send;
    /// Local: insertion order ascending. Remote: creation time descending,
    /// a hard contract, the favorites list view assumes it.
    fn get_favorites(&self) -> impl Future<Output = Result<Vec<Favorite>, StoreError>> + Send;
}

/// Repository for ratings.
pub trait RatingRepository: Send + Sync {
    /// Upsert: overwrite the value and touch `updated_at` when a rating for
    /// `skill_id` already exists, insert otherwise. The read-then-write is
    /// atomic.
    fn add_rating(
        &self,
        skill_id: &str,
        rating: RatingValue,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
    /// No-op (not an error) when absent.
    fn remove_rating(
        &self,
        skill_id: &str,
    ) -> impl Future<Output = Result<(), StoreError>> + Send;
    fn get_rating(
        &self,
        skill_id: &str,
    ) -> impl Future<Output = Result<Option<RatingValue>, StoreError>> + Send;
}
