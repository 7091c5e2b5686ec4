//! # RelationshipStateMachine
//!
//! `None → Pending → {Accepted, Rejected}`. A pair of users has at most one
//! friend request in either direction; unfriending deletes it, which is the
//! only way back to `None`.

use std::sync::Arc;

use domains::{
    paginate, DomainError, FriendRequest, FriendRequestId, FriendRequestRepository,
    FriendRequestStatus, NotificationAction, Page, PageRequest, User, UserId, UserRepository,
};
use tracing::{error, info, instrument, warn};

use crate::notification::NotificationService;
use crate::privacy::PrivacyAuthorizer;

#[derive(Clone)]
pub struct RelationshipService {
    users: Arc<dyn UserRepository>,
    requests: Arc<dyn FriendRequestRepository>,
    notifications: NotificationService,
    page_size: u64,
}

impl RelationshipService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        requests: Arc<dyn FriendRequestRepository>,
        notifications: NotificationService,
        page_size: u64,
    ) -> Self {
        Self {
            users,
            requests,
            notifications,
            page_size,
        }
    }

    async fn load_user(&self, id: UserId) -> Result<User, DomainError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    #[instrument(skip(self), fields(requester = %requester, recipient = %recipient))]
    pub async fn request(
        &self,
        requester: UserId,
        recipient: UserId,
    ) -> Result<FriendRequest, DomainError> {
        if requester == recipient {
            return Err(DomainError::SelfReference(
                "You cannot send a friend request to yourself".into(),
            ));
        }
        let target = self.load_user(recipient).await?;

        if let Some(existing) = self.requests.find_between(requester, recipient).await? {
            return Err(DomainError::Conflict(
                existing.status.conflict_message().into(),
            ));
        }
        if target.is_friend_of(requester) {
            return Err(DomainError::Conflict(
                FriendRequestStatus::Accepted.conflict_message().into(),
            ));
        }

        let request = FriendRequest::pending(requester, recipient);
        // The store rejects a second record for the pair if another request
        // raced us here.
        self.requests.insert(request.clone()).await?;
        info!(request = %request.id, "friend request created");

        self.notify(
            requester,
            recipient,
            NotificationAction::FriendRequestReceived { request: request.id },
        )
        .await;
        Ok(request)
    }

    /// Only the addressee may answer, and only while the request is pending.
    #[instrument(skip(self), fields(principal = %principal, request = %request_id))]
    pub async fn respond(
        &self,
        principal: UserId,
        request_id: FriendRequestId,
        accept: bool,
    ) -> Result<FriendRequest, DomainError> {
        let request = self
            .requests
            .find_by_id(request_id)
            .await?
            .ok_or_else(|| DomainError::not_found("FriendRequest", request_id))?;
        if request.to != principal {
            return Err(DomainError::Forbidden(
                "Only the recipient can respond to this friend request".into(),
            ));
        }
        if request.status.is_terminal() {
            return Err(DomainError::Conflict(
                "This friend request has already been answered".into(),
            ));
        }

        if !accept {
            let rejected = self
                .requests
                .transition(
                    request_id,
                    FriendRequestStatus::Pending,
                    FriendRequestStatus::Rejected,
                )
                .await?;
            info!("friend request rejected");
            return Ok(rejected);
        }

        // Friend lists first: the request is Accepted only once both sides
        // are linked, and the status never moves back to Pending.
        self.link(request.from, request.to).await?;
        let accepted = match self
            .requests
            .transition(
                request_id,
                FriendRequestStatus::Pending,
                FriendRequestStatus::Accepted,
            )
            .await
        {
            Ok(accepted) => accepted,
            Err(err) => {
                self.release_lost_accept(request_id, request.from, request.to)
                    .await?;
                return Err(err);
            }
        };
        info!("friend request accepted");

        self.notify(
            principal,
            request.from,
            NotificationAction::FriendRequestAccepted { request: request_id },
        )
        .await;
        Ok(accepted)
    }

    /// Both sides or neither: a failed second write undoes the first.
    async fn link(&self, a: UserId, b: UserId) -> Result<(), DomainError> {
        self.users.add_friend(b, a).await?;
        if let Err(err) = self.users.add_friend(a, b).await {
            if let Err(undo) = self.users.remove_friend(b, a).await {
                error!(error = %undo, user = %b, "one-sided friend link left behind");
                return Err(DomainError::storage(format!(
                    "{err}; undoing the friend link of {b} also failed: {undo}"
                )));
            }
            return Err(err);
        }
        Ok(())
    }

    /// Called after linking when the Pending to Accepted transition failed.
    /// If the request did not end up Accepted (it was rejected, deleted by
    /// an unfriend, or the store failed) the links are removed again.
    async fn release_lost_accept(
        &self,
        request_id: FriendRequestId,
        a: UserId,
        b: UserId,
    ) -> Result<(), DomainError> {
        let current = self.requests.find_by_id(request_id).await?;
        if matches!(&current, Some(r) if r.status == FriendRequestStatus::Accepted) {
            return Ok(());
        }
        warn!(request = %request_id, "accept lost its transition, unlinking");
        for (user, friend) in [(a, b), (b, a)] {
            if let Err(undo) = self.users.remove_friend(user, friend).await {
                error!(error = %undo, user = %user, "friend link left without an accepted request");
                return Err(DomainError::storage(format!(
                    "removing the friend link of {user} after a failed accept: {undo}"
                )));
            }
        }
        Ok(())
    }

    #[instrument(skip(self), fields(user = %user, target = %target))]
    pub async fn unfriend(&self, user: UserId, target: UserId) -> Result<(), DomainError> {
        if user == target {
            return Err(DomainError::SelfReference("You cannot unfriend yourself".into()));
        }
        let me = self.load_user(user).await?;
        let them = self.load_user(target).await?;
        let request = self.requests.find_between(user, target).await?;

        if !me.is_friend_of(target) && !them.is_friend_of(user) && request.is_none() {
            return Err(DomainError::not_found("Friendship", target));
        }

        self.users.remove_friend(user, target).await?;
        self.users.remove_friend(target, user).await?;
        if let Some(request) = request {
            self.requests.delete(request.id).await?;
        }
        info!("relationship removed");
        Ok(())
    }

    /// Friends of `user`, subject to `user`'s privacy setting.
    #[instrument(skip(self), fields(viewer = %viewer, user = %user))]
    pub async fn list_friends(
        &self,
        viewer: UserId,
        user: UserId,
        page: PageRequest,
    ) -> Result<Page<User>, DomainError> {
        let owner = self.load_user(user).await?;
        PrivacyAuthorizer::ensure_can_view(viewer, &owner)?;

        let ids: Vec<UserId> = owner.friends.iter().copied().collect();
        let window = paginate(ids.len() as u64, page, self.page_size);
        let mut friends = Vec::new();
        for id in ids
            .into_iter()
            .skip(window.skip as usize)
            .take(window.limit as usize)
        {
            if let Some(friend) = self.users.find_by_id(id).await? {
                friends.push(friend);
            }
        }
        Ok(Page::from_window(friends, window))
    }

    #[instrument(skip(self), fields(user = %user))]
    pub async fn list_incoming(
        &self,
        user: UserId,
        page: PageRequest,
    ) -> Result<Page<FriendRequest>, DomainError> {
        let total = self.requests.count_incoming(user).await?;
        let window = paginate(total, page, self.page_size);
        let items = self
            .requests
            .list_incoming(user, window.skip, window.limit)
            .await?;
        Ok(Page::from_window(items, window))
    }

    /// The relationship change already happened; a failed notification
    /// does not undo it.
    async fn notify(&self, actor: UserId, recipient: UserId, action: NotificationAction) {
        if let Err(err) = self.notifications.publish(actor, [recipient], action).await {
            warn!(error = %err, "failed to publish relationship notification");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use domains::{MockFriendRequestRepository, MockNotificationRepository, MockUserRepository};
    use mockall::predicate::eq;

    fn quiet_notifications() -> NotificationService {
        let mut repo = MockNotificationRepository::new();
        repo.expect_insert().returning(|_| Ok(()));
        NotificationService::new(Arc::new(repo), 10)
    }

    fn service(
        users: MockUserRepository,
        requests: MockFriendRequestRepository,
    ) -> RelationshipService {
        RelationshipService::new(Arc::new(users), Arc::new(requests), quiet_notifications(), 10)
    }

    #[tokio::test]
    async fn test_self_request_is_rejected() {
        let me = UserId::new();
        let err = service(MockUserRepository::new(), MockFriendRequestRepository::new())
            .request(me, me)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::SelfReference(_)));
    }

    #[tokio::test]
    async fn test_request_to_unknown_user_is_not_found() {
        let mut users = MockUserRepository::new();
        users.expect_find_by_id().returning(|_| Ok(None));
        let err = service(users, MockFriendRequestRepository::new())
            .request(UserId::new(), UserId::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::NotFound { entity: "User", .. }));
    }

    #[tokio::test]
    async fn test_existing_request_conflict_message_follows_status() {
        let target = User::new("target", false);
        let target_id = target.id;
        let requester = UserId::new();
        let mut existing = FriendRequest::pending(target_id, requester);
        existing.status = FriendRequestStatus::Rejected;

        let mut users = MockUserRepository::new();
        users
            .expect_find_by_id()
            .returning(move |_| Ok(Some(target.clone())));
        let mut requests = MockFriendRequestRepository::new();
        requests
            .expect_find_between()
            .returning(move |_, _| Ok(Some(existing.clone())));
        requests.expect_insert().times(0);

        let err = service(users, requests)
            .request(requester, target_id)
            .await
            .unwrap_err();
        assert_eq!(
            err,
            DomainError::Conflict("The friend request was already rejected".into())
        );
    }

    #[tokio::test]
    async fn test_only_recipient_may_respond() {
        let request = FriendRequest::pending(UserId::new(), UserId::new());
        let id = request.id;
        let mut requests = MockFriendRequestRepository::new();
        requests
            .expect_find_by_id()
            .with(eq(id))
            .returning(move |_| Ok(Some(request.clone())));
        requests.expect_transition().times(0);

        let err = service(MockUserRepository::new(), requests)
            .respond(UserId::new(), id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_failed_second_friend_write_is_compensated() {
        let request = FriendRequest::pending(UserId::new(), UserId::new());
        let (id, from, to) = (request.id, request.from, request.to);

        let mut requests = MockFriendRequestRepository::new();
        let stored = request.clone();
        requests
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        // Still Pending: the status is never touched when linking fails.
        requests.expect_transition().times(0);

        let mut users = MockUserRepository::new();
        users
            .expect_add_friend()
            .with(eq(to), eq(from))
            .times(1)
            .returning(|_, _| Ok(()));
        users
            .expect_add_friend()
            .with(eq(from), eq(to))
            .times(1)
            .returning(|_, _| Err(DomainError::storage("write failed")));
        users
            .expect_remove_friend()
            .with(eq(to), eq(from))
            .times(1)
            .returning(|_, _| Ok(()));

        let err = service(users, requests)
            .respond(to, id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Storage(_)));
    }

    #[tokio::test]
    async fn test_failed_undo_of_friend_link_is_an_error() {
        let request = FriendRequest::pending(UserId::new(), UserId::new());
        let (id, to) = (request.id, request.to);
        let mut requests = MockFriendRequestRepository::new();
        requests
            .expect_find_by_id()
            .returning(move |_| Ok(Some(request.clone())));
        requests.expect_transition().times(0);

        let mut users = MockUserRepository::new();
        let mut calls = 0;
        users.expect_add_friend().times(2).returning(move |_, _| {
            calls += 1;
            if calls == 1 {
                Ok(())
            } else {
                Err(DomainError::storage("write failed"))
            }
        });
        users
            .expect_remove_friend()
            .times(1)
            .returning(|_, _| Err(DomainError::storage("store unavailable")));

        let err = service(users, requests)
            .respond(to, id, true)
            .await
            .unwrap_err();
        match err {
            DomainError::Storage(msg) => {
                assert!(msg.contains("write failed"), "{msg}");
                assert!(msg.contains("store unavailable"), "{msg}");
            }
            other => panic!("expected a storage error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_accept_links_friends_before_status_changes() {
        let request = FriendRequest::pending(UserId::new(), UserId::new());
        let (id, from, to) = (request.id, request.from, request.to);
        let mut seq = mockall::Sequence::new();

        let mut requests = MockFriendRequestRepository::new();
        let stored = request.clone();
        requests
            .expect_find_by_id()
            .returning(move |_| Ok(Some(stored.clone())));
        let mut users = MockUserRepository::new();
        for (user, friend) in [(to, from), (from, to)] {
            users
                .expect_add_friend()
                .with(eq(user), eq(friend))
                .times(1)
                .in_sequence(&mut seq)
                .returning(|_, _| Ok(()));
        }
        let mut accepted = request.clone();
        accepted.status = FriendRequestStatus::Accepted;
        requests
            .expect_transition()
            .with(eq(id), eq(FriendRequestStatus::Pending), eq(FriendRequestStatus::Accepted))
            .times(1)
            .in_sequence(&mut seq)
            .returning(move |_, _, _| Ok(accepted.clone()));

        let result = service(users, requests).respond(to, id, true).await.unwrap();
        assert_eq!(result.status, FriendRequestStatus::Accepted);
        assert_eq!(result.from, from);
    }

    #[tokio::test]
    async fn test_accept_that_loses_to_reject_unlinks() {
        let request = FriendRequest::pending(UserId::new(), UserId::new());
        let (id, from, to) = (request.id, request.from, request.to);

        let mut rejected = request.clone();
        rejected.status = FriendRequestStatus::Rejected;
        let mut requests = MockFriendRequestRepository::new();
        let mut reads = 0;
        requests.expect_find_by_id().times(2).returning(move |_| {
            reads += 1;
            if reads == 1 {
                Ok(Some(request.clone()))
            } else {
                Ok(Some(rejected.clone()))
            }
        });
        requests.expect_transition().times(1).returning(|_, _, _| {
            Err(DomainError::Conflict("friend request is no longer pending".into()))
        });

        let mut users = MockUserRepository::new();
        users.expect_add_friend().times(2).returning(|_, _| Ok(()));
        users
            .expect_remove_friend()
            .with(eq(from), eq(to))
            .times(1)
            .returning(|_, _| Ok(()));
        users
            .expect_remove_friend()
            .with(eq(to), eq(from))
            .times(1)
            .returning(|_, _| Ok(()));

        let err = service(users, requests)
            .respond(to, id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_accept_that_loses_to_another_accept_keeps_links() {
        let request = FriendRequest::pending(UserId::new(), UserId::new());
        let (id, to) = (request.id, request.to);

        let mut accepted = request.clone();
        accepted.status = FriendRequestStatus::Accepted;
        let mut requests = MockFriendRequestRepository::new();
        let mut reads = 0;
        requests.expect_find_by_id().times(2).returning(move |_| {
            reads += 1;
            if reads == 1 {
                Ok(Some(request.clone()))
            } else {
                Ok(Some(accepted.clone()))
            }
        });
        requests.expect_transition().times(1).returning(|_, _, _| {
            Err(DomainError::Conflict("friend request is no longer pending".into()))
        });

        let mut users = MockUserRepository::new();
        users.expect_add_friend().times(2).returning(|_, _| Ok(()));
        users.expect_remove_friend().times(0);

        let err = service(users, requests)
            .respond(to, id, true)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_answered_request_cannot_be_answered_again() {
        let mut request = FriendRequest::pending(UserId::new(), UserId::new());
        request.status = FriendRequestStatus::Accepted;
        let (id, to) = (request.id, request.to);
        let mut requests = MockFriendRequestRepository::new();
        requests
            .expect_find_by_id()
            .returning(move |_| Ok(Some(request.clone())));

        let err = service(MockUserRepository::new(), requests)
            .respond(to, id, false)
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }
}
