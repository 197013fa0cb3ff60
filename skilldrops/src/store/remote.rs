//! Remote-backed store: the repository contract over a per-user document
//! namespace.
//!
//! Skills are global (`skills/<id>`); favorites and ratings live under
//! `users/<user_id>/favorites/<skill_id>` and
//! `users/<user_id>/ratings/<skill_id>`, keyed by skill id so writes are
//! overwrite-by-key and can never duplicate. User-scoped writes require a
//! signed-in identity; user-scoped reads return empty results while signed
//! out, matching how the UI degrades.

use rand::seq::SliceRandom;
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use uuid::Uuid;

use crate::identity::AuthState;

use super::documents::{Document, DocumentBackend};
use super::records::{Favorite, RatingValue, Skill, SkillDraft};
use super::traits::{FavoriteRepository, RatingRepository, SkillRepository};
use super::StoreError;

const SKILLS: &str = "skills";

#[derive(Serialize, Deserialize)]
struct SkillFields {
    title: String,
    summary: String,
    #[serde(default)]
    url: Option<String>,
    category: String,
    #[serde(default)]
    contributed_by: Option<String>,
}

#[derive(Serialize, Deserialize)]
struct FavoriteFields {
    title: String,
    summary: String,
    #[serde(default)]
    url: Option<String>,
    /// Present on migrated favorites, which keep their original local
    /// creation time as payload. Fresh favorites rely on the
    /// backend-assigned write timestamp instead.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    created_at: Option<i64>,
}

#[derive(Serialize, Deserialize)]
struct RatingFields {
    rating: RatingValue,
}

/// Store backed by the remote document service. Cheap to clone.
#[derive(Clone)]
pub struct RemoteStore<B> {
    backend: B,
    identity: watch::Receiver<AuthState>,
}

impl<B: DocumentBackend> RemoteStore<B> {
    pub fn new(backend: B, identity: watch::Receiver<AuthState>) -> Self {
        Self { backend, identity }
    }

    fn user_id(&self) -> Option<String> {
        self.identity.borrow().user_id().map(String::from)
    }

    /// Precondition check for user-scoped writes, not a network error.
    fn require_user(&self) -> Result<String, StoreError> {
        self.user_id().ok_or(StoreError::NotAuthenticated)
    }

    pub fn favorites_collection(user_id: &str) -> String {
        format!("users/{user_id}/favorites")
    }

    pub fn ratings_collection(user_id: &str) -> String {
        format!("users/{user_id}/ratings")
    }
}

fn skill_from_doc(id: String, doc: Document) -> Result<Skill, StoreError> {
    let fields: SkillFields = serde_json::from_value(doc.fields)?;
    Ok(Skill {
        id,
        title: fields.title,
        summary: fields.summary,
        url: fields.url,
        category: fields.category,
        created_at: doc.written_at,
        contributed_by: fields.contributed_by,
    })
}

fn favorite_from_doc(skill_id: String, doc: &Document) -> Result<Favorite, StoreError> {
    let fields: FavoriteFields = serde_json::from_value(doc.fields.clone())?;
    Ok(Favorite {
        skill_id,
        title: fields.title,
        summary: fields.summary,
        url: fields.url,
        created_at: fields.created_at.unwrap_or(doc.written_at),
    })
}

impl<B: DocumentBackend> SkillRepository for RemoteStore<B> {
    async fn add_skill(&self, draft: &SkillDraft) -> Result<Skill, StoreError> {
        let id = Uuid::new_v4().to_string();
        let contributed_by = self.user_id();
        let fields = SkillFields {
            title: draft.title.clone(),
            summary: draft.summary.clone(),
            url: draft.url.clone(),
            category: draft.category.clone(),
            contributed_by: contributed_by.clone(),
        };
        self.backend
            .set(&format!("{SKILLS}/{id}"), serde_json::to_value(&fields)?)
            .await?;

        // Read back for the server-assigned creation time.
        match self.backend.get(&format!("{SKILLS}/{id}")).await? {
            Some(doc) => skill_from_doc(id, doc),
            None => Err(StoreError::RemoteUnavailable(
                "skill vanished after write".into(),
            )),
        }
    }

    async fn get_skill(&self, id: &str) -> Result<Option<Skill>, StoreError> {
        match self.backend.get(&format!("{SKILLS}/{id}")).await? {
            Some(doc) => Ok(Some(skill_from_doc(id.to_string(), doc)?)),
            None => Ok(None),
        }
    }

    async fn get_all_skills(&self) -> Result<Vec<Skill>, StoreError> {
        let docs = self.backend.list(SKILLS).await?;
        docs.into_iter()
            .map(|(id, doc)| skill_from_doc(id, doc))
            .collect()
    }

    async fn get_random_skill(&self) -> Result<Option<Skill>, StoreError> {
        // Same policy as the local store: uniform over the full set.
        let skills = self.get_all_skills().await?;
        Ok(skills.choose(&mut rand::thread_rng()).cloned())
    }

    async fn skills_count(&self) -> Result<u64, StoreError> {
        Ok(self.backend.list(SKILLS).await?.len() as u64)
    }

    async fn skills_by_category(&self, category: &str) -> Result<Vec<Skill>, StoreError> {
        let mut skills = self.get_all_skills().await?;
        skills.retain(|s| s.category == category);
        Ok(skills)
    }
}

impl<B: DocumentBackend> FavoriteRepository for RemoteStore<B> {
    async fn add_favorite(&self, skill: &Skill) -> Result<(), StoreError> {
        let user_id = self.require_user()?;
        let fields = FavoriteFields {
            title: skill.title.clone(),
            summary: skill.summary.clone(),
            url: skill.url.clone(),
            created_at: None,
        };
        let path = format!("{}/{}", Self::favorites_collection(&user_id), skill.id);
        self.backend.set(&path, serde_json::to_value(&fields)?).await
    }

    async fn remove_favorite(&self, skill_id: &str) -> Result<(), StoreError> {
        let user_id = self.require_user()?;
        let path = format!("{}/{}", Self::favorites_collection(&user_id), skill_id);
        self.backend.delete(&path).await
    }

    async fn get_favorite(&self, skill_id: &str) -> Result<Option<Favorite>, StoreError> {
        let Some(user_id) = self.user_id() else {
            return Ok(None);
        };
        let path = format!("{}/{}", Self::favorites_collection(&user_id), skill_id);
        match self.backend.get(&path).await? {
            Some(doc) => Ok(Some(favorite_from_doc(skill_id.to_string(), &doc)?)),
            None => Ok(None),
        }
    }

    async fn get_favorites(&self) -> Result<Vec<Favorite>, StoreError> {
        let Some(user_id) = self.user_id() else {
            return Ok(vec![]);
        };
        let docs = self
            .backend
            .list(&Self::favorites_collection(&user_id))
            .await?;

        // Creation time descending; the backend write clock breaks ties
        // between migrated favorites carrying identical payload times.
        let mut keyed: Vec<(i64, i64, Favorite)> = docs
            .into_iter()
            .map(|(id, doc)| {
                let favorite = favorite_from_doc(id, &doc)?;
                Ok((favorite.created_at, doc.written_at, favorite))
            })
            .collect::<Result<_, StoreError>>()?;
        keyed.sort_by(|a, b| (b.0, b.1).cmp(&(a.0, a.1)));
        Ok(keyed.into_iter().map(|(_, _, favorite)| favorite).collect())
    }
}

impl<B: DocumentBackend> RatingRepository for RemoteStore<B> {
    async fn add_rating(&self, skill_id: &str, rating: RatingValue) -> Result<(), StoreError> {
        let user_id = self.require_user()?;
        let path = format!("{}/{}", Self::ratings_collection(&user_id), skill_id);
        // Overwrite-by-key is the upsert: one document per skill.
        self.backend
            .set(&path, serde_json::to_value(RatingFields { rating })?)
            .await
    }

    async fn remove_rating(&self, skill_id: &str) -> Result<(), StoreError> {
        let user_id = self.require_user()?;
        let path = format!("{}/{}", Self::ratings_collection(&user_id), skill_id);
        self.backend.delete(&path).await
    }

    async fn get_rating(&self, skill_id: &str) -> Result<Option<RatingValue>, StoreError> {
        let Some(user_id) = self.user_id() else {
            return Ok(None);
        };
        let path = format!("{}/{}", Self::ratings_collection(&user_id), skill_id);
        match self.backend.get(&path).await? {
            Some(doc) => {
                let fields: RatingFields = serde_json::from_value(doc.fields)?;
                Ok(Some(fields.rating))
            }
            None => Ok(None),
        }
    }
}
