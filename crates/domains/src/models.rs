//! # Domain Models
//!
//! These structs represent the core entities of Rusty-Social.
//! Set-valued fields use `IdSet` so that every mutation is an idempotent
//! add/remove rather than an array push/splice.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::errors::{DomainError, Result};
use crate::ids::{
    CommentId, FriendRequestId, IdSet, MediaPath, NotificationId, PostId, RelationshipPair,
    UserId,
};

/// A registered account.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub display_name: String,
    /// Private accounts only expose content to themselves and their friends
    pub is_private: bool,
    /// Symmetric: `a ∈ b.friends ⇔ b ∈ a.friends`
    pub friends: IdSet<UserId>,
    pub avatar: Option<MediaPath>,
    pub background: Option<MediaPath>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(username: impl Into<String>, is_private: bool) -> Self {
        let username = username.into();
        Self {
            id: UserId::new(),
            display_name: username.clone(),
            username,
            is_private,
            friends: IdSet::new(),
            avatar: None,
            background: None,
            created_at: Utc::now(),
        }
    }

    pub fn is_friend_of(&self, other: UserId) -> bool {
        self.friends.contains(&other)
    }
}

/// Top-level content owned by a user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Post {
    pub id: PostId,
    pub posted_by: UserId,
    pub body: String,
    pub media: Option<MediaPath>,
    pub liked_by: IdSet<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Post {
    pub fn new(posted_by: UserId, body: impl Into<String>, media: Option<MediaPath>) -> Self {
        Self {
            id: PostId::new(),
            posted_by,
            body: body.into(),
            media,
            liked_by: IdSet::new(),
            created_at: Utc::now(),
        }
    }
}

/// A reply to a post.
///
/// `posted_by` may refer to a deleted account: comments on other users'
/// posts outlive their author.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub post: PostId,
    pub posted_by: UserId,
    pub body: String,
    pub liked_by: IdSet<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(post: PostId, posted_by: UserId, body: impl Into<String>) -> Self {
        Self {
            id: CommentId::new(),
            post,
            posted_by,
            body: body.into(),
            liked_by: IdSet::new(),
            created_at: Utc::now(),
        }
    }
}

/// Lifecycle of a friend request. `Accepted` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FriendRequestStatus {
    Pending,
    Accepted,
    Rejected,
}

impl FriendRequestStatus {
    /// Message reported when a new request collides with an existing one.
    pub fn conflict_message(&self) -> &'static str {
        match self {
            FriendRequestStatus::Pending => "A friend request is already pending",
            FriendRequestStatus::Accepted => "You are already friends",
            FriendRequestStatus::Rejected => "The friend request was already rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, FriendRequestStatus::Pending)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FriendRequest {
    pub id: FriendRequestId,
    pub from: UserId,
    pub to: UserId,
    pub status: FriendRequestStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl FriendRequest {
    pub fn pending(from: UserId, to: UserId) -> Self {
        let now = Utc::now();
        Self {
            id: FriendRequestId::new(),
            from,
            to,
            status: FriendRequestStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn pair(&self) -> RelationshipPair {
        RelationshipPair::new(self.from, self.to)
    }

    pub fn involves(&self, user: UserId) -> bool {
        self.from == user || self.to == user
    }
}

/// What triggered a notification, with typed references to exactly the
/// entities each kind needs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action_type", rename_all = "snake_case")]
pub enum NotificationAction {
    PostCreated { post: PostId },
    PostLiked { post: PostId },
    CommentCreated { post: PostId, comment: CommentId },
    CommentLiked { post: PostId, comment: CommentId },
    FriendRequestReceived { request: FriendRequestId },
    FriendRequestAccepted { request: FriendRequestId },
}

/// One logical event shared by several recipients, each with their own
/// read/delete state.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    pub actor: UserId,
    /// Fixed at creation
    pub recipients: IdSet<UserId>,
    pub action: NotificationAction,
    pub read_by: IdSet<UserId>,
    pub deleted_by: IdSet<UserId>,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(
        actor: UserId,
        recipients: IdSet<UserId>,
        action: NotificationAction,
    ) -> Result<Self> {
        if recipients.is_empty() {
            return Err(DomainError::Validation(
                "A notification needs at least one recipient".into(),
            ));
        }
        Ok(Self {
            id: NotificationId::new(),
            actor,
            recipients,
            action,
            read_by: IdSet::new(),
            deleted_by: IdSet::new(),
            created_at: Utc::now(),
        })
    }

    pub fn is_recipient(&self, user: UserId) -> bool {
        self.recipients.contains(&user)
    }

    /// Still shown to `user`: addressed to them and not deleted by them.
    pub fn is_visible_to(&self, user: UserId) -> bool {
        self.is_recipient(user) && !self.deleted_by.contains(&user)
    }

    pub fn is_unread_by(&self, user: UserId) -> bool {
        !self.read_by.contains(&user)
    }

    fn ensure_recipient(&self, user: UserId) -> Result<()> {
        if self.is_recipient(user) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "You are not a recipient of this notification".into(),
            ))
        }
    }

    /// Returns `true` if `user` had not read it before.
    pub fn record_read(&mut self, user: UserId) -> Result<bool> {
        self.ensure_recipient(user)?;
        Ok(self.read_by.insert(user))
    }

    /// Folds `user` into `deleted_by` and reports whether the quorum is met.
    pub fn record_deletion(&mut self, user: UserId) -> Result<bool> {
        self.ensure_recipient(user)?;
        self.deleted_by.insert(user);
        Ok(self.is_fully_deleted())
    }

    /// Every recipient has deleted it; the record must not be kept.
    pub fn is_fully_deleted(&self) -> bool {
        self.recipients.is_subset(&self.deleted_by)
    }
}
