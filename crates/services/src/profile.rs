//! Account records: registration, profile reads and profile edits.
//! Friend lists are owned by `RelationshipService` and never touched here.

use std::sync::Arc;

use domains::{DomainError, IdSet, MediaPath, User, UserId, UserRepository};
use serde::Deserialize;
use tracing::{info, instrument};

use crate::account_deletion::ProfileMediaDefaults;
use crate::privacy::PrivacyAuthorizer;

const MAX_USERNAME_LEN: usize = 32;

/// Fields a user may change on their own profile; `None` leaves a field as is.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub is_private: Option<bool>,
    pub avatar: Option<MediaPath>,
    pub background: Option<MediaPath>,
}

#[derive(Clone)]
pub struct ProfileService {
    users: Arc<dyn UserRepository>,
    defaults: ProfileMediaDefaults,
}

impl ProfileService {
    pub fn new(users: Arc<dyn UserRepository>, defaults: ProfileMediaDefaults) -> Self {
        Self { users, defaults }
    }

    #[instrument(skip(self))]
    pub async fn register(&self, username: &str, is_private: bool) -> Result<User, DomainError> {
        let username = username.trim();
        if username.is_empty() || username.len() > MAX_USERNAME_LEN {
            return Err(DomainError::Validation(format!(
                "username must be 1 to {MAX_USERNAME_LEN} characters"
            )));
        }
        let user = User::new(username, is_private);
        self.users.insert(user.clone()).await?;
        info!(user = %user.id, "user registered");
        Ok(user)
    }

    /// The profile of `id` as seen by `viewer`. The friend list is withheld
    /// from viewers who may not see a private account's content.
    #[instrument(skip(self), fields(viewer = %viewer, user = %id))]
    pub async fn get(&self, viewer: UserId, id: UserId) -> Result<User, DomainError> {
        let mut user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))?;
        if !PrivacyAuthorizer::can_view(viewer, &user) {
            user.friends = IdSet::new();
        }
        Ok(user)
    }

    #[instrument(skip(self, update), fields(user = %id))]
    pub async fn update(&self, id: UserId, update: ProfileUpdate) -> Result<User, DomainError> {
        let mut user = self
            .users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))?;

        if let Some(name) = update.display_name {
            let name = name.trim();
            if name.is_empty() {
                return Err(DomainError::Validation("display name cannot be empty".into()));
            }
            user.display_name = name.to_string();
        }
        if let Some(is_private) = update.is_private {
            user.is_private = is_private;
        }
        // Either a shared default or a file in the user's own directory.
        for path in [&update.avatar, &update.background].into_iter().flatten() {
            if !self.defaults.contains(path) {
                path.ensure_owned_by(id)?;
            }
        }
        if update.avatar.is_some() {
            user.avatar = update.avatar;
        }
        if update.background.is_some() {
            user.background = update.background;
        }

        self.users.update_profile(user.clone()).await?;
        info!(is_private = user.is_private, "profile updated");
        Ok(user)
    }
}
