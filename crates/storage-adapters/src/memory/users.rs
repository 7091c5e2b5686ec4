use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{DomainError, Result, User, UserId, UserRepository};

/// Users keyed by id, with a username index that keeps usernames unique.
#[derive(Default)]
pub struct InMemoryUserRepository {
    users: DashMap<UserId, User>,
    usernames: DashMap<String, UserId>,
}

impl InMemoryUserRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.users.len()
    }

    pub fn is_empty(&self) -> bool {
        self.users.is_empty()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>> {
        Ok(self.users.get(&id).map(|u| u.value().clone()))
    }

    async fn insert(&self, user: User) -> Result<()> {
        match self.usernames.entry(user.username.clone()) {
            Entry::Occupied(_) => Err(taken(&user.username)),
            Entry::Vacant(slot) => {
                slot.insert(user.id);
                self.users.insert(user.id, user);
                Ok(())
            }
        }
    }

    async fn update_profile(&self, user: User) -> Result<()> {
        let mut stored = self
            .users
            .get_mut(&user.id)
            .ok_or_else(|| DomainError::not_found("User", user.id))?;
        stored.display_name = user.display_name;
        stored.is_private = user.is_private;
        stored.avatar = user.avatar;
        stored.background = user.background;
        Ok(())
    }

    async fn add_friend(&self, user: UserId, friend: UserId) -> Result<()> {
        let mut stored = self
            .users
            .get_mut(&user)
            .ok_or_else(|| DomainError::not_found("User", user))?;
        stored.friends.insert(friend);
        Ok(())
    }

    async fn remove_friend(&self, user: UserId, friend: UserId) -> Result<()> {
        if let Some(mut stored) = self.users.get_mut(&user) {
            stored.friends.remove(&friend);
        }
        Ok(())
    }

    async fn find_ids_with_friend(&self, friend: UserId) -> Result<Vec<UserId>> {
        Ok(self
            .users
            .iter()
            .filter(|u| u.friends.contains(&friend))
            .map(|u| u.id)
            .collect())
    }

    async fn delete(&self, id: UserId) -> Result<()> {
        if let Some((_, user)) = self.users.remove(&id) {
            self.usernames.remove_if(&user.username, |_, owner| *owner == id);
        }
        Ok(())
    }
}

fn taken(username: &str) -> DomainError {
    DomainError::Conflict(format!("username {username} is already taken"))
}
