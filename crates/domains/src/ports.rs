//! # Ports
//!
//! Any storage adapter must implement these traits to be used by the
//! services. Every set-valued mutation is a single store-level operation
//! (add-to-set / remove-from-set) so concurrent actions cannot lose updates
//! through a read-modify-write race.

use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::errors::Result;
use crate::ids::{CommentId, FriendRequestId, MediaPath, NotificationId, PostId, UserId};
use crate::models::{Comment, FriendRequest, FriendRequestStatus, Notification, Post, User};

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>>;
    async fn insert(&self, user: User) -> Result<()>;
    /// Replaces display name, privacy flag and media; never touches
    /// `username` or `friends`.
    async fn update_profile(&self, user: User) -> Result<()>;
    /// Atomically adds `friend` to `user.friends`. NotFound if `user` is gone.
    async fn add_friend(&self, user: UserId, friend: UserId) -> Result<()>;
    /// Atomically removes `friend` from `user.friends`. Missing users are a no-op.
    async fn remove_friend(&self, user: UserId, friend: UserId) -> Result<()>;
    /// Ids of every user whose `friends` contains `friend`.
    async fn find_ids_with_friend(&self, friend: UserId) -> Result<Vec<UserId>>;
    async fn delete(&self, id: UserId) -> Result<()>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait PostRepository: Send + Sync {
    async fn find_by_id(&self, id: PostId) -> Result<Option<Post>>;
    async fn insert(&self, post: Post) -> Result<()>;
    /// Newest first.
    async fn list_by_author(&self, author: UserId, skip: u64, limit: u64) -> Result<Vec<Post>>;
    async fn count_by_author(&self, author: UserId) -> Result<u64>;
    async fn list_ids_by_author(&self, author: UserId) -> Result<Vec<PostId>>;
    async fn delete(&self, id: PostId) -> Result<()>;
    /// Returns `true` if the like was new.
    async fn add_like(&self, id: PostId, user: UserId) -> Result<bool>;
    /// Returns `true` if a like was removed.
    async fn remove_like(&self, id: PostId, user: UserId) -> Result<bool>;
    /// Removes `user` from every post's `liked_by`; returns how many changed.
    async fn strip_likes_by(&self, user: UserId) -> Result<u64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CommentRepository: Send + Sync {
    async fn find_by_id(&self, id: CommentId) -> Result<Option<Comment>>;
    async fn insert(&self, comment: Comment) -> Result<()>;
    /// Oldest first, in conversation order.
    async fn list_for_post(&self, post: PostId, skip: u64, limit: u64) -> Result<Vec<Comment>>;
    async fn count_for_post(&self, post: PostId) -> Result<u64>;
    async fn delete(&self, id: CommentId) -> Result<()>;
    /// Returns how many comments were removed.
    async fn delete_for_post(&self, post: PostId) -> Result<u64>;
    async fn add_like(&self, id: CommentId, user: UserId) -> Result<bool>;
    async fn remove_like(&self, id: CommentId, user: UserId) -> Result<bool>;
    async fn strip_likes_by(&self, user: UserId) -> Result<u64>;
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait FriendRequestRepository: Send + Sync {
    async fn find_by_id(&self, id: FriendRequestId) -> Result<Option<FriendRequest>>;
    /// The single request between `a` and `b`, in either direction.
    async fn find_between(&self, a: UserId, b: UserId) -> Result<Option<FriendRequest>>;
    /// Conflict if the pair already has a request.
    async fn insert(&self, request: FriendRequest) -> Result<()>;
    /// Moves the request to `to` only if it is currently in `from`.
    /// Conflict if the current status differs, NotFound if missing.
    async fn transition(
        &self,
        id: FriendRequestId,
        from: FriendRequestStatus,
        to: FriendRequestStatus,
    ) -> Result<FriendRequest>;
    async fn delete(&self, id: FriendRequestId) -> Result<()>;
    /// Deletes every request where `user` is either endpoint.
    async fn delete_involving(&self, user: UserId) -> Result<u64>;
    /// Pending requests addressed to `recipient`, newest first.
    async fn list_incoming(&self, recipient: UserId, skip: u64, limit: u64)
        -> Result<Vec<FriendRequest>>;
    async fn count_incoming(&self, recipient: UserId) -> Result<u64>;
}

/// Result of folding one recipient into a notification's `deleted_by`.
#[derive(Debug, Clone, PartialEq)]
pub enum QuorumOutcome {
    /// Some recipients still see it.
    Retained(Notification),
    /// Every recipient deleted it and the record is gone.
    Destroyed,
}

#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait NotificationRepository: Send + Sync {
    async fn insert(&self, notification: Notification) -> Result<()>;
    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>>;
    /// Visible to `recipient`, newest first.
    async fn list_visible_to(&self, recipient: UserId, skip: u64, limit: u64)
        -> Result<Vec<Notification>>;
    async fn count_visible_to(&self, recipient: UserId) -> Result<u64>;
    /// Atomically adds `recipient` to `read_by`.
    async fn add_reader(&self, id: NotificationId, recipient: UserId) -> Result<Notification>;
    /// Marks every visible, unread notification read; returns how many changed.
    async fn mark_all_read(&self, recipient: UserId) -> Result<u64>;
    /// Atomically adds `recipient` to `deleted_by` and destroys the record
    /// once every recipient has deleted it.
    async fn record_deletion(&self, id: NotificationId, recipient: UserId) -> Result<QuorumOutcome>;
    /// Every notification addressed to `recipient`, deleted or not.
    async fn list_ids_for_recipient(&self, recipient: UserId) -> Result<Vec<NotificationId>>;
}

/// File-storage collaborator. The core only decides which path goes.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait MediaStorage: Send + Sync {
    /// Removing an absent object succeeds.
    async fn remove(&self, path: &MediaPath) -> Result<()>;
}

/// Ordered steps of an account deletion.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CascadeStep {
    DeletePosts,
    DeleteFriendRequests,
    RetireNotifications,
    RemoveFromFriendLists,
    RemoveLikes,
    DeleteProfileMedia,
    DeleteUser,
}

impl CascadeStep {
    pub const ALL: [CascadeStep; 7] = [
        CascadeStep::DeletePosts,
        CascadeStep::DeleteFriendRequests,
        CascadeStep::RetireNotifications,
        CascadeStep::RemoveFromFriendLists,
        CascadeStep::RemoveLikes,
        CascadeStep::DeleteProfileMedia,
        CascadeStep::DeleteUser,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CascadeStep::DeletePosts => "delete_posts",
            CascadeStep::DeleteFriendRequests => "delete_friend_requests",
            CascadeStep::RetireNotifications => "retire_notifications",
            CascadeStep::RemoveFromFriendLists => "remove_from_friend_lists",
            CascadeStep::RemoveLikes => "remove_likes",
            CascadeStep::DeleteProfileMedia => "delete_profile_media",
            CascadeStep::DeleteUser => "delete_user",
        }
    }
}

impl fmt::Display for CascadeStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user completion markers that make the deletion cascade resumable.
#[cfg_attr(any(test, feature = "testing"), mockall::automock)]
#[async_trait]
pub trait CascadeJournal: Send + Sync {
    /// Steps already completed for `user`, empty if none were recorded.
    async fn load(&self, user: UserId) -> Result<Vec<CascadeStep>>;
    async fn mark_completed(&self, user: UserId, step: CascadeStep) -> Result<()>;
    async fn clear(&self, user: UserId) -> Result<()>;
}
