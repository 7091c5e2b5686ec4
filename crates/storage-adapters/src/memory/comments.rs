use std::cmp::Reverse;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;
use domains::{Comment, CommentId, CommentRepository, DomainError, PostId, Result, UserId};

use super::window;

/// A comment plus its insertion sequence, which breaks `created_at` ties.
struct Stored {
    seq: u64,
    comment: Comment,
}

#[derive(Default)]
pub struct InMemoryCommentRepository {
    comments: DashMap<CommentId, Stored>,
    next_seq: AtomicU64,
}

impl InMemoryCommentRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.comments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.comments.is_empty()
    }
}

#[async_trait]
impl CommentRepository for InMemoryCommentRepository {
    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>> {
        Ok(self.comments.get(&id).map(|s| s.comment.clone()))
    }

    async fn insert(&self, comment: Comment) -> Result<()> {
        let seq = self.next_seq.fetch_add(1, Ordering::Relaxed);
        self.comments.insert(comment.id, Stored { seq, comment });
        Ok(())
    }

    async fn list_for_post(&self, post: PostId, skip: u64, limit: u64) -> Result<Vec<Comment>> {
        let on_post: Vec<(u64, Comment)> = self
            .comments
            .iter()
            .filter(|s| s.comment.post == post)
            .map(|s| (s.seq, s.comment.clone()))
            .collect();
        Ok(window(on_post, |(seq, c)| Reverse((c.created_at, *seq)), skip, limit)
            .into_iter()
            .map(|(_, c)| c)
            .collect())
    }

    async fn count_for_post(&self, post: PostId) -> Result<u64> {
        Ok(self.comments.iter().filter(|s| s.comment.post == post).count() as u64)
    }

    async fn delete(&self, id: CommentId) -> Result<()> {
        self.comments.remove(&id);
        Ok(())
    }

    async fn delete_for_post(&self, post: PostId) -> Result<u64> {
        let mut removed = 0;
        self.comments.retain(|_, s| {
            let keep = s.comment.post != post;
            if !keep {
                removed += 1;
            }
            keep
        });
        Ok(removed)
    }

    async fn add_like(&self, id: CommentId, user: UserId) -> Result<bool> {
        let mut stored = self
            .comments
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Comment", id))?;
        Ok(stored.comment.liked_by.insert(user))
    }

    async fn remove_like(&self, id: CommentId, user: UserId) -> Result<bool> {
        let mut stored = self
            .comments
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Comment", id))?;
        Ok(stored.comment.liked_by.remove(&user))
    }

    async fn strip_likes_by(&self, user: UserId) -> Result<u64> {
        let mut changed = 0;
        for mut stored in self.comments.iter_mut() {
            if stored.comment.liked_by.remove(&user) {
                changed += 1;
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_for_post_leaves_other_posts_alone() {
        let repo = InMemoryCommentRepository::new();
        let post = PostId::new();
        let other = PostId::new();
        for _ in 0..3 {
            repo.insert(Comment::new(post, UserId::new(), "hi")).await.unwrap();
        }
        repo.insert(Comment::new(other, UserId::new(), "elsewhere"))
            .await
            .unwrap();

        assert_eq!(repo.count_for_post(post).await.unwrap(), 3);
        assert_eq!(repo.delete_for_post(post).await.unwrap(), 3);
        assert_eq!(repo.count_for_post(post).await.unwrap(), 0);
        assert_eq!(repo.count_for_post(other).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_comments_listed_oldest_first() {
        let repo = InMemoryCommentRepository::new();
        let post = PostId::new();
        let mut first = Comment::new(post, UserId::new(), "first");
        first.created_at -= chrono::Duration::minutes(5);
        let second = Comment::new(post, UserId::new(), "second");
        repo.insert(second.clone()).await.unwrap();
        repo.insert(first.clone()).await.unwrap();

        let listed = repo.list_for_post(post, 0, 5).await.unwrap();
        assert_eq!(listed[0].id, first.id);
        assert_eq!(listed[1].id, second.id);
    }

    #[tokio::test]
    async fn test_same_timestamp_keeps_insertion_order() {
        let repo = InMemoryCommentRepository::new();
        let post = PostId::new();
        let stamp = chrono::Utc::now();
        let mut written = Vec::new();
        for i in 0..6 {
            let mut comment = Comment::new(post, UserId::new(), format!("c{i}"));
            comment.created_at = stamp;
            written.push(comment.id);
            repo.insert(comment).await.unwrap();
        }

        let listed: Vec<CommentId> = repo
            .list_for_post(post, 0, 10)
            .await
            .unwrap()
            .into_iter()
            .map(|c| c.id)
            .collect();
        assert_eq!(listed, written);
        let second_page = repo.list_for_post(post, 4, 10).await.unwrap();
        assert_eq!(second_page[0].id, written[4]);
    }
}
