//! Profile service.

use serde::{Deserialize, Serialize};
use tracing::info;
use validator::Validate;

use linkup_models::{User, UserId, UserSummary};

use crate::error::ApiResult;
use crate::security::{sanitize_text, validate_image_url};
use crate::services::Repositories;

/// Maximum number of connection suggestions.
const SUGGESTION_LIMIT: usize = 10;

/// How many recent users are scanned for suggestions.
const SUGGESTION_SCAN: i32 = 100;

/// Public profile with derived counts.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileView {
    #[serde(flatten)]
    pub user: User,
    pub connection_count: usize,
}

impl From<User> for ProfileView {
    fn from(user: User) -> Self {
        Self {
            connection_count: user.connections.len(),
            user,
        }
    }
}

/// Partial profile update; absent fields are left unchanged.
#[derive(Debug, Default, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[validate(length(min = 1, max = 100, message = "Name must be 1-100 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 220, message = "Headline must be at most 220 characters"))]
    pub headline: Option<String>,
    #[validate(length(max = 2600, message = "About must be at most 2600 characters"))]
    pub about: Option<String>,
    #[validate(length(max = 100, message = "Location must be at most 100 characters"))]
    pub location: Option<String>,
    #[validate(custom(function = "validate_image_url"))]
    pub profile_picture: Option<String>,
    #[validate(custom(function = "validate_image_url"))]
    pub banner_image: Option<String>,
    #[validate(length(max = 50, message = "At most 50 skills"))]
    pub skills: Option<Vec<String>>,
}

impl ProfileUpdate {
    fn apply(self, user: &mut User) {
        if let Some(name) = self.name {
            user.name = sanitize_text(&name);
        }
        if let Some(headline) = self.headline {
            user.headline = sanitize_text(&headline);
        }
        if let Some(about) = self.about {
            user.about = sanitize_text(&about);
        }
        if let Some(location) = self.location {
            user.location = sanitize_text(&location);
        }
        if let Some(picture) = self.profile_picture {
            user.profile_picture = picture.trim().to_string();
        }
        if let Some(banner) = self.banner_image {
            user.banner_image = banner.trim().to_string();
        }
        if let Some(skills) = self.skills {
            user.skills = skills
                .iter()
                .map(|s| sanitize_text(s))
                .filter(|s| !s.is_empty())
                .collect();
        }
    }
}

#[derive(Clone)]
pub struct ProfileService {
    repos: Repositories,
}

impl ProfileService {
    pub fn new(repos: Repositories) -> Self {
        Self { repos }
    }

    pub async fn get(&self, user_id: &UserId) -> ApiResult<ProfileView> {
        Ok(self.repos.require_user(user_id).await?.into())
    }

    pub async fn update(&self, user_id: &UserId, update: ProfileUpdate) -> ApiResult<ProfileView> {
        let mut user = self.repos.require_user(user_id).await?;
        update.apply(&mut user);

        let updated = self.repos.users.update_profile(&user).await?;
        info!(user_id = %user_id, "Profile updated");
        Ok(updated.into())
    }

    /// Recent users who are neither the caller nor already connected.
    pub async fn suggestions(&self, user_id: &UserId) -> ApiResult<Vec<UserSummary>> {
        let me = self.repos.require_user(user_id).await?;
        let candidates = self.repos.users.list_recent(SUGGESTION_SCAN).await?;

        Ok(candidates
            .iter()
            .filter(|u| u.id != me.id && !me.is_connected_to(&u.id))
            .take(SUGGESTION_LIMIT)
            .map(User::summary)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use linkup_store::MemoryStore;

    use super::*;

    #[tokio::test]
    async fn test_partial_update_keeps_other_fields() {
        let repos = Repositories::new(Arc::new(MemoryStore::new()));
        let mut ada = User::new("Ada", "ada", "ada@example.com", "hash");
        ada.location = "London".to_string();
        repos.users.create(&ada).await.unwrap();

        let service = ProfileService::new(repos);
        let update = ProfileUpdate {
            headline: Some("  Analyst  ".to_string()),
            ..Default::default()
        };
        let view = service.update(&ada.id, update).await.unwrap();
        assert_eq!(view.user.headline, "Analyst");
        assert_eq!(view.user.location, "London");
        assert_eq!(view.user.name, "Ada");
    }

    #[tokio::test]
    async fn test_suggestions_exclude_self_and_connections() {
        let repos = Repositories::new(Arc::new(MemoryStore::new()));
        let bob = User::new("Bob", "bob", "bob@example.com", "hash");
        let cy = User::new("Cy", "cy", "cy@example.com", "hash");
        let mut ada = User::new("Ada", "ada", "ada@example.com", "hash");
        ada.connections.push(bob.id.clone());
        for u in [&ada, &bob, &cy] {
            repos.users.create(u).await.unwrap();
        }

        let service = ProfileService::new(repos);
        let suggestions = service.suggestions(&ada.id).await.unwrap();
        let ids: Vec<_> = suggestions.iter().map(|s| s.id.clone()).collect();
        assert_eq!(ids, vec![cy.id]);
    }

    #[test]
    fn test_profile_view_hides_secrets() {
        let user = User::new("Ada", "ada", "ada@example.com", "argon-hash");
        let json = serde_json::to_value(ProfileView::from(user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["connectionCount"], 0);
    }
}
