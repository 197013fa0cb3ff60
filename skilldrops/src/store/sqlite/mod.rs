//! SQLite-backed local store.
//!
//! ## Database setup
//!
//! [`Database`] wraps a `sqlx::SqlitePool` configured with:
//! - **WAL mode**: one writer, multiple concurrent readers.
//! - **Foreign keys enabled**: enforced at the connection level.
//! - **Embedded migrations**: `sqlx::migrate!` applies
//!   `migrations/0001_initial_schema.sql` onward automatically when
//!   [`Database::open`] is called. The schema is idempotent and migrations
//!   are additive only.
//!
//! ## LocalStore
//!
//! [`LocalStore`] implements the repository traits over four collections:
//! `skills` (indexed by category and title), `favorites` (unique on
//! `skill_id`), `ratings` (unique on `skill_id`), and a `settings` key-value
//! table used for the streak counters, the persisted identity, and the
//! per-user migration flags. Every mutation is a single atomic statement;
//! the rating upsert's read-then-write happens inside one
//! `INSERT ... ON CONFLICT` so partial writes are never observable.

mod database;

pub use database::Database;

use sqlx::SqlitePool;
use tracing::info;

use super::records::{Favorite, Rating, RatingValue, Skill, SkillDraft};
use super::traits::{FavoriteRepository, RatingRepository, SkillRepository};
use super::{now_timestamp_ms, StoreError};

/// Built-in starter skills, seeded once when the skills collection is empty.
const DEFAULT_SKILLS: &[(&str, &str, Option<&str>, &str)] = &[
    (
        "The two-minute rule",
        "If a task takes less than two minutes, do it immediately instead of scheduling it.",
        None,
        "productivity",
    ),
    (
        "Spaced repetition",
        "Review new material after one day, three days, then a week. Spacing beats cramming.",
        Some("https://en.wikipedia.org/wiki/Spaced_repetition"),
        "learning",
    ),
    (
        "Box breathing",
        "Inhale four seconds, hold four, exhale four, hold four. Repeat four times to reset focus.",
        None,
        "health",
    ),
    (
        "Inverted pyramid writing",
        "Put the conclusion first, then supporting detail. Readers who stop early still get the point.",
        None,
        "communication",
    ),
    (
        "Rubber duck debugging",
        "Explain your code line by line to an inanimate object. Saying it aloud exposes the flaw.",
        Some("https://en.wikipedia.org/wiki/Rubber_duck_debugging"),
        "technology",
    ),
    (
        "Pomodoro blocks",
        "Work in 25-minute focused blocks with 5-minute breaks. Batch distractions into the breaks.",
        None,
        "productivity",
    ),
    (
        "Feynman technique",
        "Teach a concept in plain words to find the gaps in your own understanding.",
        Some("https://en.wikipedia.org/wiki/Learning_by_teaching"),
        "learning",
    ),
    (
        "20-20-20 rule",
        "Every 20 minutes of screen time, look at something 20 feet away for 20 seconds.",
        None,
        "health",
    ),
    (
        "Keyboard over mouse",
        "Learn one editor shortcut per day. A week of this compounds faster than any new tool.",
        None,
        "technology",
    ),
    (
        "Name the next action",
        "Stalled projects usually lack a concrete next physical action. Write one down and start there.",
        None,
        "productivity",
    ),
];

/// On-device store backed by SQLite. Cheap to clone (shares the pool).
#[derive(Clone)]
pub struct LocalStore {
    pool: SqlitePool,
}

impl LocalStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// Insert the built-in starter skills when the collection is empty.
    /// Returns the number of skills inserted (zero on an already-seeded
    /// store).
    pub async fn seed_default_skills(&self) -> Result<u64, StoreError> {
        let existing = self.skills_count().await?;
        if existing > 0 {
            return Ok(0);
        }

        let now = now_timestamp_ms();
        let mut tx = self.pool.begin().await?;
        for (title, summary, url, category) in DEFAULT_SKILLS {
            sqlx::query(
                "INSERT INTO skills (title, summary, url, category, created_at, contributed_by) \
                 VALUES (?, ?, ?, ?, ?, NULL)",
            )
            .bind(title)
            .bind(summary)
            .bind(url)
            .bind(category)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;

        info!(count = DEFAULT_SKILLS.len(), "Seeded default skills");
        Ok(DEFAULT_SKILLS.len() as u64)
    }

    // ── Settings (key-value) ───────────────────────────────────────────

    pub async fn get_setting(&self, key: &str) -> Result<Option<String>, StoreError> {
        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(row.map(|(value,)| value))
    }

    pub async fn put_setting(&self, key: &str, value: &str) -> Result<(), StoreError> {
        sqlx::query("INSERT OR REPLACE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    pub async fn delete_setting(&self, key: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM settings WHERE key = ?")
            .bind(key)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Full rating row including timestamps, for callers that need more than
    /// the enum value.
    pub async fn get_rating_record(&self, skill_id: &str) -> Result<Option<Rating>, StoreError> {
        let row: Option<(String, String, i64, Option<i64>)> = sqlx::query_as(
            "SELECT skill_id, rating, created_at, updated_at FROM ratings WHERE skill_id = ?",
        )
        .bind(skill_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.and_then(|(skill_id, rating, created_at, updated_at)| {
            RatingValue::parse(&rating).map(|rating| Rating {
                skill_id,
                rating,
                created_at,
                updated_at,
            })
        }))
    }
}

type SkillRow = (i64, String, String, Option<String>, String, i64, Option<String>);

fn skill_from_row(row: SkillRow) -> Skill {
    let (id, title, summary, url, category, created_at, contributed_by) = row;
    Skill {
        id: id.to_string(),
        title,
        summary,
        url,
        category,
        created_at,
        contributed_by,
    }
}

const SKILL_COLUMNS: &str = "id, title, summary, url, category, created_at, contributed_by";

impl SkillRepository for LocalStore {
    async fn add_skill(&self, draft: &SkillDraft) -> Result<Skill, StoreError> {
        let created_at = now_timestamp_ms();
        let result = sqlx::query(
            "INSERT INTO skills (title, summary, url, category, created_at, contributed_by) \
             VALUES (?, ?, ?, ?, ?, NULL)",
        )
        .bind(&draft.title)
        .bind(&draft.summary)
        .bind(&draft.url)
        .bind(&draft.category)
        .bind(created_at)
        .execute(&self.pool)
        .await?;

        Ok(Skill {
            id: result.last_insert_rowid().to_string(),
            title: draft.title.clone(),
            summary: draft.summary.clone(),
            url: draft.url.clone(),
            category: draft.category.clone(),
            created_at,
            contributed_by: None,
        })
    }

    async fn get_skill(&self, id: &str) -> Result<Option<Skill>, StoreError> {
        // Local ids are stringified integers; anything else cannot exist here.
        let Ok(id) = id.parse::<i64>() else {
            return Ok(None);
        };
        let row: Option<SkillRow> =
            sqlx::query_as(&format!("SELECT {SKILL_COLUMNS} FROM skills WHERE id = ?"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(skill_from_row))
    }

    async fn get_all_skills(&self) -> Result<Vec<Skill>, StoreError> {
        let rows: Vec<SkillRow> =
            sqlx::query_as(&format!("SELECT {SKILL_COLUMNS} FROM skills ORDER BY id ASC"))
                .fetch_all(&self.pool)
                .await?;
        Ok(rows.into_iter().map(skill_from_row).collect())
    }

    async fn get_random_skill(&self) -> Result<Option<Skill>, StoreError> {
        // Uniform over the full set each call; no weighting, no avoid-repeat.
        let row: Option<SkillRow> = sqlx::query_as(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills ORDER BY RANDOM() LIMIT 1"
        ))
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(skill_from_row))
    }

    async fn skills_count(&self) -> Result<u64, StoreError> {
        let row: (i64,) = sqlx::query_as("SELECT COUNT(*) FROM skills")
            .fetch_one(&self.pool)
            .await?;
        Ok(row.0 as u64)
    }

    async fn skills_by_category(&self, category: &str) -> Result<Vec<Skill>, StoreError> {
        let rows: Vec<SkillRow> = sqlx::query_as(&format!(
            "SELECT {SKILL_COLUMNS} FROM skills WHERE category = ? ORDER BY id ASC"
        ))
        .bind(category)
        .fetch_all(&self.pool)
        .await?;
        Ok(rows.into_iter().map(skill_from_row).collect())
    }
}

impl FavoriteRepository for LocalStore {
    async fn add_favorite(&self, skill: &Skill) -> Result<(), StoreError> {
        // Plain INSERT: the unique index on skill_id turns a concurrent
        // duplicate into DuplicateKey instead of corrupting state.
        sqlx::query(
            "INSERT INTO favorites (skill_id, title, summary, url, created_at) \
             VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&skill.id)
        .bind(&skill.title)
        .bind(&skill.summary)
        .bind(&skill.url)
        .bind(now_timestamp_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_favorite(&self, skill_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM favorites WHERE skill_id = ?")
            .bind(skill_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_favorite(&self, skill_id: &str) -> Result<Option<Favorite>, StoreError> {
        let row: Option<(String, String, String, Option<String>, i64)> = sqlx::query_as(
            "SELECT skill_id, title, summary, url, created_at FROM favorites WHERE skill_id = ?",
        )
        .bind(skill_id)
        .fetch_optional(&self.pool)
        .await?;
        Ok(row.map(|(skill_id, title, summary, url, created_at)| Favorite {
            skill_id,
            title,
            summary,
            url,
            created_at,
        }))
    }

    async fn get_favorites(&self) -> Result<Vec<Favorite>, StoreError> {
        let rows: Vec<(String, String, String, Option<String>, i64)> = sqlx::query_as(
            "SELECT skill_id, title, summary, url, created_at FROM favorites ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        Ok(rows
            .into_iter()
            .map(|(skill_id, title, summary, url, created_at)| Favorite {
                skill_id,
                title,
                summary,
                url,
                created_at,
            })
            .collect())
    }
}

impl RatingRepository for LocalStore {
    async fn add_rating(&self, skill_id: &str, rating: RatingValue) -> Result<(), StoreError> {
        // Single-statement upsert: created_at is preserved on overwrite,
        // updated_at is touched to the write time.
        sqlx::query(
            "INSERT INTO ratings (skill_id, rating, created_at, updated_at) \
             VALUES (?, ?, ?, NULL) \
             ON CONFLICT(skill_id) DO UPDATE SET \
                 rating = excluded.rating, \
                 updated_at = excluded.created_at",
        )
        .bind(skill_id)
        .bind(rating.as_str())
        .bind(now_timestamp_ms())
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn remove_rating(&self, skill_id: &str) -> Result<(), StoreError> {
        sqlx::query("DELETE FROM ratings WHERE skill_id = ?")
            .bind(skill_id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn get_rating(&self, skill_id: &str) -> Result<Option<RatingValue>, StoreError> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT rating FROM ratings WHERE skill_id = ?")
                .bind(skill_id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.and_then(|(rating,)| RatingValue::parse(&rating)))
    }
}
