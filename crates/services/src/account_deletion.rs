//! # AccountDeletionCascade
//!
//! Removes a user and everything that references it, in a fixed order.
//! Each completed step is recorded in the `CascadeJournal`, so a cascade
//! that failed halfway is resumed by running it again: completed steps are
//! skipped and every step tolerates having been partially applied.
//!
//! Comments the user wrote on other people's posts are kept with their
//! author id pointing at the deleted account. Conversations and messages
//! are not touched here.

use std::sync::Arc;

use domains::{
    CascadeJournal, CascadeStep, CommentRepository, DomainError, ErrorKind,
    FriendRequestRepository, MediaPath, MediaStorage, NotificationRepository, PostRepository,
    QuorumOutcome, User, UserId, UserRepository,
};
use serde::Serialize;
use thiserror::Error;
use tracing::{error, info, instrument, warn};

use crate::content::{purge_post, remove_owned_media};

/// The step at which a cascade stopped, with the underlying failure.
#[derive(Error, Debug, Clone, PartialEq)]
#[error("account deletion for user {user} failed at step {step}: {source}")]
pub struct CascadeError {
    pub user: UserId,
    pub step: CascadeStep,
    #[source]
    pub source: DomainError,
}

impl CascadeError {
    pub fn kind(&self) -> ErrorKind {
        self.source.kind()
    }
}

/// Shared placeholder images that must never be removed from storage.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProfileMediaDefaults {
    pub avatar: Option<MediaPath>,
    pub background: Option<MediaPath>,
}

impl ProfileMediaDefaults {
    pub fn contains(&self, path: &MediaPath) -> bool {
        self.avatar.as_ref() == Some(path) || self.background.as_ref() == Some(path)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CascadeReport {
    /// Steps found already completed when this run started.
    pub resumed_after: Vec<CascadeStep>,
    pub posts_deleted: u64,
    pub comments_deleted: u64,
    pub friend_requests_deleted: u64,
    pub notifications_destroyed: u64,
    pub notifications_retained: u64,
    pub friend_lists_updated: u64,
    pub likes_removed: u64,
    pub media_removed: u64,
}

pub struct AccountDeletionCascade {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    requests: Arc<dyn FriendRequestRepository>,
    notifications: Arc<dyn NotificationRepository>,
    media: Arc<dyn MediaStorage>,
    journal: Arc<dyn CascadeJournal>,
    defaults: ProfileMediaDefaults,
}

impl AccountDeletionCascade {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        requests: Arc<dyn FriendRequestRepository>,
        notifications: Arc<dyn NotificationRepository>,
        media: Arc<dyn MediaStorage>,
        journal: Arc<dyn CascadeJournal>,
        defaults: ProfileMediaDefaults,
    ) -> Self {
        Self {
            users,
            posts,
            comments,
            requests,
            notifications,
            media,
            journal,
            defaults,
        }
    }

    /// Runs (or resumes) the cascade for `user`.
    ///
    /// The first failing step aborts the run; the error names it.
    #[instrument(skip(self), fields(user = %user))]
    pub async fn run(&self, user: UserId) -> Result<CascadeReport, CascadeError> {
        let fail = |step: CascadeStep| {
            move |source: DomainError| {
                error!(step = %step, error = %source, "account deletion step failed");
                CascadeError { user, step, source }
            }
        };

        let completed = self
            .journal
            .load(user)
            .await
            .map_err(fail(CascadeStep::DeletePosts))?;
        let account = self
            .users
            .find_by_id(user)
            .await
            .map_err(fail(CascadeStep::DeletePosts))?;
        if account.is_none() && completed.is_empty() {
            return Err(fail(CascadeStep::DeletePosts)(DomainError::not_found("User", user)));
        }
        if !completed.is_empty() {
            info!(completed = completed.len(), "resuming account deletion");
        }

        let mut report = CascadeReport {
            resumed_after: completed.clone(),
            ..CascadeReport::default()
        };

        for step in CascadeStep::ALL {
            if completed.contains(&step) {
                continue;
            }
            self.apply(step, user, account.as_ref(), &mut report)
                .await
                .map_err(fail(step))?;
            self.journal
                .mark_completed(user, step)
                .await
                .map_err(fail(step))?;
        }

        self.journal
            .clear(user)
            .await
            .map_err(fail(CascadeStep::DeleteUser))?;
        info!(?report, "account deleted");
        Ok(report)
    }

    async fn apply(
        &self,
        step: CascadeStep,
        user: UserId,
        account: Option<&User>,
        report: &mut CascadeReport,
    ) -> Result<(), DomainError> {
        match step {
            CascadeStep::DeletePosts => self.delete_posts(user, report).await,
            CascadeStep::DeleteFriendRequests => {
                report.friend_requests_deleted = self.requests.delete_involving(user).await?;
                Ok(())
            }
            CascadeStep::RetireNotifications => self.retire_notifications(user, report).await,
            CascadeStep::RemoveFromFriendLists => {
                self.remove_from_friend_lists(user, account, report).await
            }
            CascadeStep::RemoveLikes => {
                report.likes_removed = self.posts.strip_likes_by(user).await?
                    + self.comments.strip_likes_by(user).await?;
                Ok(())
            }
            CascadeStep::DeleteProfileMedia => self.delete_profile_media(account, report).await,
            CascadeStep::DeleteUser => self.users.delete(user).await,
        }
    }

    async fn delete_posts(&self, user: UserId, report: &mut CascadeReport) -> Result<(), DomainError> {
        for id in self.posts.list_ids_by_author(user).await? {
            // Gone already if an earlier run removed it before failing
            let Some(post) = self.posts.find_by_id(id).await? else {
                continue;
            };
            let purged = purge_post(
                self.posts.as_ref(),
                self.comments.as_ref(),
                self.media.as_ref(),
                &post,
            )
            .await?;
            report.comments_deleted += purged.comments;
            report.posts_deleted += 1;
            if purged.media_removed {
                report.media_removed += 1;
            }
        }
        Ok(())
    }

    async fn retire_notifications(
        &self,
        user: UserId,
        report: &mut CascadeReport,
    ) -> Result<(), DomainError> {
        for id in self.notifications.list_ids_for_recipient(user).await? {
            match self.notifications.record_deletion(id, user).await {
                Ok(QuorumOutcome::Destroyed) => report.notifications_destroyed += 1,
                Ok(QuorumOutcome::Retained(_)) => report.notifications_retained += 1,
                // Another recipient completed the quorum in the meantime
                Err(DomainError::NotFound { .. }) => {}
                Err(err) => return Err(err),
            }
        }
        Ok(())
    }

    async fn remove_from_friend_lists(
        &self,
        user: UserId,
        account: Option<&User>,
        report: &mut CascadeReport,
    ) -> Result<(), DomainError> {
        let mut others = self.users.find_ids_with_friend(user).await?;
        if let Some(account) = account {
            others.extend(account.friends.iter().copied());
        }
        others.sort();
        others.dedup();

        for other in others {
            if other == user {
                continue;
            }
            self.users.remove_friend(other, user).await?;
            report.friend_lists_updated += 1;
        }
        Ok(())
    }

    async fn delete_profile_media(
        &self,
        account: Option<&User>,
        report: &mut CascadeReport,
    ) -> Result<(), DomainError> {
        let Some(account) = account else {
            warn!("user record already gone, profile media left in place");
            return Ok(());
        };
        for path in [&account.avatar, &account.background].into_iter().flatten() {
            if self.defaults.contains(path) {
                continue;
            }
            if remove_owned_media(self.media.as_ref(), account.id, path).await? {
                report.media_removed += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{
        MockCascadeJournal, MockCommentRepository, MockFriendRequestRepository,
        MockMediaStorage, MockNotificationRepository, MockPostRepository, MockUserRepository,
    };
    use mockall::predicate::eq;

    struct Mocks {
        users: MockUserRepository,
        posts: MockPostRepository,
        comments: MockCommentRepository,
        requests: MockFriendRequestRepository,
        notifications: MockNotificationRepository,
        media: MockMediaStorage,
        journal: MockCascadeJournal,
    }

    impl Mocks {
        /// Every step succeeds and finds nothing to do.
        fn empty(account: User) -> Self {
            let mut m = Self {
                users: MockUserRepository::new(),
                posts: MockPostRepository::new(),
                comments: MockCommentRepository::new(),
                requests: MockFriendRequestRepository::new(),
                notifications: MockNotificationRepository::new(),
                media: MockMediaStorage::new(),
                journal: MockCascadeJournal::new(),
            };
            m.users
                .expect_find_by_id()
                .returning(move |_| Ok(Some(account.clone())));
            m.users.expect_find_ids_with_friend().returning(|_| Ok(vec![]));
            m.users.expect_delete().returning(|_| Ok(()));
            m.posts.expect_list_ids_by_author().returning(|_| Ok(vec![]));
            m.posts.expect_strip_likes_by().returning(|_| Ok(0));
            m.comments.expect_strip_likes_by().returning(|_| Ok(0));
            m.requests.expect_delete_involving().returning(|_| Ok(0));
            m.notifications
                .expect_list_ids_for_recipient()
                .returning(|_| Ok(vec![]));
            m.journal.expect_mark_completed().returning(|_, _| Ok(()));
            m.journal.expect_clear().returning(|_| Ok(()));
            m
        }

        fn build(self, defaults: ProfileMediaDefaults) -> AccountDeletionCascade {
            AccountDeletionCascade::new(
                Arc::new(self.users),
                Arc::new(self.posts),
                Arc::new(self.comments),
                Arc::new(self.requests),
                Arc::new(self.notifications),
                Arc::new(self.media),
                Arc::new(self.journal),
                defaults,
            )
        }
    }

    #[tokio::test]
    async fn test_failure_reports_step_and_stops() {
        let account = User::new("leaving", false);
        let id = account.id;
        let mut mocks = Mocks::empty(account);
        mocks.journal.expect_load().returning(|_| Ok(vec![]));
        mocks.requests.checkpoint();
        mocks
            .requests
            .expect_delete_involving()
            .returning(|_| Err(DomainError::storage("store unavailable")));
        mocks.notifications.checkpoint();
        mocks.notifications.expect_list_ids_for_recipient().times(0);
        mocks.users.checkpoint();
        mocks
            .users
            .expect_find_by_id()
            .returning(|_| Ok(Some(User::new("leaving", false))));
        mocks.users.expect_delete().times(0);

        let err = mocks
            .build(ProfileMediaDefaults::default())
            .run(id)
            .await
            .unwrap_err();
        assert_eq!(err.step, CascadeStep::DeleteFriendRequests);
        assert_eq!(err.kind(), ErrorKind::Storage);
    }

    #[tokio::test]
    async fn test_resume_skips_completed_steps() {
        let account = User::new("leaving", false);
        let id = account.id;
        let mut mocks = Mocks::empty(account);
        mocks.journal.expect_load().returning(|_| {
            Ok(vec![CascadeStep::DeletePosts, CascadeStep::DeleteFriendRequests])
        });
        mocks.posts.checkpoint();
        mocks.posts.expect_list_ids_by_author().times(0);
        mocks.posts.expect_strip_likes_by().returning(|_| Ok(0));
        mocks.requests.checkpoint();
        mocks.requests.expect_delete_involving().times(0);

        let report = mocks.build(ProfileMediaDefaults::default()).run(id).await.unwrap();
        assert_eq!(report.resumed_after.len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_user_without_journal_is_not_found() {
        let mut mocks = Mocks::empty(User::new("x", false));
        mocks.journal.expect_load().returning(|_| Ok(vec![]));
        mocks.users.checkpoint();
        mocks.users.expect_find_by_id().returning(|_| Ok(None));

        let err = mocks
            .build(ProfileMediaDefaults::default())
            .run(UserId::new())
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn test_default_avatar_is_kept_custom_background_removed() {
        let mut account = User::new("leaving", false);
        let background = MediaPath::new(format!("users/{}/bg-123.png", account.id));
        account.avatar = Some(MediaPath::new("defaults/avatar.png"));
        account.background = Some(background.clone());
        let id = account.id;

        let mut mocks = Mocks::empty(account);
        mocks.journal.expect_load().returning(|_| Ok(vec![]));
        mocks
            .media
            .expect_remove()
            .with(eq(background))
            .times(1)
            .returning(|_| Ok(()));

        let defaults = ProfileMediaDefaults {
            avatar: Some(MediaPath::new("defaults/avatar.png")),
            background: None,
        };
        let report = mocks.build(defaults).run(id).await.unwrap();
        assert_eq!(report.media_removed, 1);
    }

    #[tokio::test]
    async fn test_profile_media_of_other_users_is_never_removed() {
        let mut account = User::new("leaving", false);
        account.avatar = Some(MediaPath::new(format!("users/{}/victim.png", UserId::new())));
        account.background = Some(MediaPath::new("shared/banner.png"));
        let id = account.id;

        let mut mocks = Mocks::empty(account);
        mocks.journal.expect_load().returning(|_| Ok(vec![]));
        mocks.media.expect_remove().times(0);

        let report = mocks
            .build(ProfileMediaDefaults::default())
            .run(id)
            .await
            .unwrap();
        assert_eq!(report.media_removed, 0);
    }

    #[tokio::test]
    async fn test_media_storage_refusing_a_path_does_not_stall_the_cascade() {
        let mut account = User::new("leaving", false);
        account.avatar = Some(MediaPath::new(format!("users/{}/album", account.id)));
        let id = account.id;

        let mut mocks = Mocks::empty(account);
        mocks.journal.expect_load().returning(|_| Ok(vec![]));
        mocks
            .media
            .expect_remove()
            .times(1)
            .returning(|path| Err(DomainError::Validation(format!("{path} is a directory"))));

        let report = mocks
            .build(ProfileMediaDefaults::default())
            .run(id)
            .await
            .unwrap();
        assert_eq!(report.media_removed, 0);
    }
}
