//! Display counters derived from store contents plus a small persisted
//! streak counter.
//!
//! The streak is day-based: `lastSkillDate` records the last calendar day a
//! skill was dropped (updated by [`StatsAggregator::record_skill_drop`],
//! independent of the read path), and `currentStreak` holds the running
//! count. Reading the streak reconciles the counter against the distance
//! between today and `lastSkillDate`: same day leaves it unchanged, one day
//! increments and persists it, anything larger resets it to zero. The read
//! must happen before the day's first drop moves `lastSkillDate` to today.

use chrono::{NaiveDate, Utc};

use crate::store::traits::{FavoriteRepository, SkillRepository};
use crate::store::{settings, LocalStore, StoreError};

const DATE_FORMAT: &str = "%Y-%m-%d";

/// The numbers the UI displays.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Stats {
    pub total_skills: u64,
    /// Favorites for the current identity; zero while signed out.
    pub favorites_count: u64,
    pub streak: u32,
}

/// Read-side aggregation over the active store. Streak state always lives
/// in the local settings collection, whichever store is active.
#[derive(Clone)]
pub struct StatsAggregator {
    local: LocalStore,
}

impl StatsAggregator {
    pub fn new(local: LocalStore) -> Self {
        Self { local }
    }

    /// Collect all counters from `store`. `signed_in` decides whether the
    /// favorites count is meaningful or pinned to zero.
    pub async fn collect<S>(&self, store: &S, signed_in: bool) -> Result<Stats, StoreError>
    where
        S: SkillRepository + FavoriteRepository,
    {
        let total_skills = store.skills_count().await?;
        let favorites_count = if signed_in {
            store.get_favorites().await?.len() as u64
        } else {
            0
        };
        let streak = self.streak().await?;
        Ok(Stats {
            total_skills,
            favorites_count,
            streak,
        })
    }

    /// Record that a skill was dropped (shown) today. Only moves
    /// `lastSkillDate`; the counter itself advances on the read path.
    pub async fn record_skill_drop(&self) -> Result<(), StoreError> {
        self.record_skill_drop_on(Utc::now().date_naive()).await
    }

    pub async fn record_skill_drop_on(&self, today: NaiveDate) -> Result<(), StoreError> {
        self.local
            .put_setting(
                settings::LAST_SKILL_DATE,
                &today.format(DATE_FORMAT).to_string(),
            )
            .await
    }

    /// Current streak, reconciling the persisted counter against today.
    pub async fn streak(&self) -> Result<u32, StoreError> {
        self.streak_on(Utc::now().date_naive()).await
    }

    pub async fn streak_on(&self, today: NaiveDate) -> Result<u32, StoreError> {
        match self.days_since_last(today).await? {
            None => Ok(0),
            // Dropped today already: counter is current.
            Some(0) => self.persisted_streak().await,
            // Came back the next day: the streak continues.
            Some(1) => {
                let next = self.persisted_streak().await? + 1;
                self.persist_streak(next).await?;
                Ok(next)
            }
            // Gap of two or more days (or a clock running backwards):
            // the streak is broken.
            Some(_) => {
                self.persist_streak(0).await?;
                Ok(0)
            }
        }
    }

    async fn days_since_last(&self, today: NaiveDate) -> Result<Option<i64>, StoreError> {
        let raw = self.local.get_setting(settings::LAST_SKILL_DATE).await?;
        let last = raw.and_then(|s| NaiveDate::parse_from_str(&s, DATE_FORMAT).ok());
        Ok(last.map(|last| (today - last).num_days()))
    }

    async fn persisted_streak(&self) -> Result<u32, StoreError> {
        let raw = self.local.get_setting(settings::CURRENT_STREAK).await?;
        Ok(raw.and_then(|s| s.parse().ok()).unwrap_or(0))
    }

    async fn persist_streak(&self, value: u32) -> Result<(), StoreError> {
        self.local
            .put_setting(settings::CURRENT_STREAK, &value.to_string())
            .await
    }
}
