//! Record types shared by the local and remote stores.
//!
//! Skill ids are opaque strings at this level: the local store assigns
//! auto-increment integers (stringified), the remote store assigns opaque
//! document ids.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single micro-lesson. Immutable after creation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Skill {
    pub id: String,
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub category: String,
    /// Unix millis. Assigned by the owning store at creation.
    pub created_at: i64,
    pub contributed_by: Option<String>,
}

/// Input for the contribution flow; the store assigns id and timestamps.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SkillDraft {
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub category: String,
}

/// A saved skill: a denormalized snapshot taken at favoriting time, not a
/// live reference. At most one per skill id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Favorite {
    pub skill_id: String,
    pub title: String,
    pub summary: String,
    pub url: Option<String>,
    pub created_at: i64,
}

impl Favorite {
    pub fn snapshot_of(skill: &Skill, created_at: i64) -> Self {
        Self {
            skill_id: skill.id.clone(),
            title: skill.title.clone(),
            summary: skill.summary.clone(),
            url: skill.url.clone(),
            created_at,
        }
    }
}

/// Up/down judgment of a skill. A new rating for the same skill replaces
/// the existing one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RatingValue {
    Up,
    Down,
}

impl RatingValue {
    pub fn as_str(self) -> &'static str {
        match self {
            RatingValue::Up => "up",
            RatingValue::Down => "down",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "up" => Some(RatingValue::Up),
            "down" => Some(RatingValue::Down),
            _ => None,
        }
    }
}

impl fmt::Display for RatingValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A stored rating row. `updated_at` is set only when an existing rating
/// was overwritten.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rating {
    pub skill_id: String,
    pub rating: RatingValue,
    pub created_at: i64,
    pub updated_at: Option<i64>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rating_value_round_trip() {
        assert_eq!(RatingValue::parse("up"), Some(RatingValue::Up));
        assert_eq!(RatingValue::parse("down"), Some(RatingValue::Down));
        assert_eq!(RatingValue::parse("sideways"), None);
        assert_eq!(RatingValue::Up.as_str(), "up");
        assert_eq!(RatingValue::Down.to_string(), "down");
    }

    #[test]
    fn favorite_snapshot_copies_skill_fields() {
        let skill = Skill {
            id: "7".into(),
            title: "Pomodoro basics".into(),
            summary: "Work in 25-minute blocks.".into(),
            url: Some("https://example.com/pomodoro".into()),
            category: "productivity".into(),
            created_at: 1_000,
            contributed_by: None,
        };
        let fav = Favorite::snapshot_of(&skill, 2_000);
        assert_eq!(fav.skill_id, "7");
        assert_eq!(fav.title, skill.title);
        assert_eq!(fav.summary, skill.summary);
        assert_eq!(fav.url, skill.url);
        assert_eq!(fav.created_at, 2_000);
    }
}
