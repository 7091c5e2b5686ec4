//! In-memory store.

mod comments;
mod friend_requests;
mod journal;
mod notifications;
mod posts;
mod users;

use std::sync::Arc;

pub use comments::InMemoryCommentRepository;
pub use friend_requests::InMemoryFriendRequestRepository;
pub use journal::InMemoryCascadeJournal;
pub use notifications::InMemoryNotificationRepository;
pub use posts::InMemoryPostRepository;
pub use users::InMemoryUserRepository;

/// One instance of every in-memory repository, shared through `Arc`s.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    pub users: Arc<InMemoryUserRepository>,
    pub posts: Arc<InMemoryPostRepository>,
    pub comments: Arc<InMemoryCommentRepository>,
    pub friend_requests: Arc<InMemoryFriendRequestRepository>,
    pub notifications: Arc<InMemoryNotificationRepository>,
    pub journal: Arc<InMemoryCascadeJournal>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

/// Newest-first ordering with the id as a stable tie-breaker.
pub(crate) fn window<T, K: Ord>(mut items: Vec<T>, key: impl Fn(&T) -> K, skip: u64, limit: u64) -> Vec<T> {
    items.sort_by(|a, b| key(b).cmp(&key(a)));
    items
        .into_iter()
        .skip(skip as usize)
        .take(limit as usize)
        .collect()
}
