use async_trait::async_trait;
use chrono::Utc;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use domains::{
    DomainError, FriendRequest, FriendRequestId, FriendRequestRepository, FriendRequestStatus,
    RelationshipPair, Result, UserId,
};

use super::window;

/// Requests keyed by id plus a pair index that enforces one record per
/// unordered pair of users.
#[derive(Default)]
pub struct InMemoryFriendRequestRepository {
    requests: DashMap<FriendRequestId, FriendRequest>,
    pairs: DashMap<RelationshipPair, FriendRequestId>,
}

impl InMemoryFriendRequestRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.requests.len()
    }

    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
    }

    fn incoming(&self, recipient: UserId) -> Vec<FriendRequest> {
        self.requests
            .iter()
            .filter(|r| r.to == recipient && r.status == FriendRequestStatus::Pending)
            .map(|r| r.value().clone())
            .collect()
    }

    fn remove(&self, id: FriendRequestId) -> bool {
        match self.requests.remove(&id) {
            Some((_, request)) => {
                self.pairs.remove_if(&request.pair(), |_, stored| *stored == id);
                true
            }
            None => false,
        }
    }
}

#[async_trait]
impl FriendRequestRepository for InMemoryFriendRequestRepository {
    async fn find_by_id(&self, id: FriendRequestId) -> Result<Option<FriendRequest>> {
        Ok(self.requests.get(&id).map(|r| r.value().clone()))
    }

    async fn find_between(&self, a: UserId, b: UserId) -> Result<Option<FriendRequest>> {
        let Some(id) = self.pairs.get(&RelationshipPair::new(a, b)).map(|id| *id) else {
            return Ok(None);
        };
        Ok(self.requests.get(&id).map(|r| r.value().clone()))
    }

    async fn insert(&self, request: FriendRequest) -> Result<()> {
        match self.pairs.entry(request.pair()) {
            Entry::Occupied(_) => Err(DomainError::Conflict(
                "A friend request between these users already exists".into(),
            )),
            Entry::Vacant(slot) => {
                self.requests.insert(request.id, request.clone());
                slot.insert(request.id);
                Ok(())
            }
        }
    }

    async fn transition(
        &self,
        id: FriendRequestId,
        from: FriendRequestStatus,
        to: FriendRequestStatus,
    ) -> Result<FriendRequest> {
        let mut request = self
            .requests
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("FriendRequest", id))?;
        if request.status != from {
            return Err(DomainError::Conflict(
                "This friend request has already been answered".into(),
            ));
        }
        request.status = to;
        request.updated_at = Utc::now();
        Ok(request.clone())
    }

    async fn delete(&self, id: FriendRequestId) -> Result<()> {
        self.remove(id);
        Ok(())
    }

    async fn delete_involving(&self, user: UserId) -> Result<u64> {
        let ids: Vec<FriendRequestId> = self
            .requests
            .iter()
            .filter(|r| r.involves(user))
            .map(|r| r.id)
            .collect();
        Ok(ids.into_iter().filter(|id| self.remove(*id)).count() as u64)
    }

    async fn list_incoming(
        &self,
        recipient: UserId,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<FriendRequest>> {
        Ok(window(self.incoming(recipient), |r| (r.created_at, r.id), skip, limit))
    }

    async fn count_incoming(&self, recipient: UserId) -> Result<u64> {
        Ok(self.incoming(recipient).len() as u64)
    }
}
