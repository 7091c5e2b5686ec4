use async_trait::async_trait;
use dashmap::DashMap;
use domains::{DomainError, Post, PostId, PostRepository, Result, UserId};

use super::window;

#[derive(Default)]
pub struct InMemoryPostRepository {
    posts: DashMap<PostId, Post>,
}

impl InMemoryPostRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.posts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.posts.is_empty()
    }

    fn by_author(&self, author: UserId) -> Vec<Post> {
        self.posts
            .iter()
            .filter(|p| p.posted_by == author)
            .map(|p| p.value().clone())
            .collect()
    }
}

#[async_trait]
impl PostRepository for InMemoryPostRepository {
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>> {
        Ok(self.posts.get(&id).map(|p| p.value().clone()))
    }

    async fn insert(&self, post: Post) -> Result<()> {
        self.posts.insert(post.id, post);
        Ok(())
    }

    async fn list_by_author(&self, author: UserId, skip: u64, limit: u64) -> Result<Vec<Post>> {
        Ok(window(self.by_author(author), |p| (p.created_at, p.id), skip, limit))
    }

    async fn count_by_author(&self, author: UserId) -> Result<u64> {
        Ok(self.posts.iter().filter(|p| p.posted_by == author).count() as u64)
    }

    async fn list_ids_by_author(&self, author: UserId) -> Result<Vec<PostId>> {
        Ok(self.by_author(author).into_iter().map(|p| p.id).collect())
    }

    async fn delete(&self, id: PostId) -> Result<()> {
        self.posts.remove(&id);
        Ok(())
    }

    async fn add_like(&self, id: PostId, user: UserId) -> Result<bool> {
        let mut post = self
            .posts
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        Ok(post.liked_by.insert(user))
    }

    async fn remove_like(&self, id: PostId, user: UserId) -> Result<bool> {
        let mut post = self
            .posts
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Post", id))?;
        Ok(post.liked_by.remove(&user))
    }

    async fn strip_likes_by(&self, user: UserId) -> Result<u64> {
        let mut changed = 0;
        for mut post in self.posts.iter_mut() {
            if post.liked_by.remove(&user) {
                changed += 1;
            }
        }
        Ok(changed)
    }
}
