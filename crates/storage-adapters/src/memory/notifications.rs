use async_trait::async_trait;
use dashmap::DashMap;
use domains::{
    DomainError, Notification, NotificationId, NotificationRepository, QuorumOutcome, Result,
    UserId,
};

use super::window;

#[derive(Default)]
pub struct InMemoryNotificationRepository {
    notifications: DashMap<NotificationId, Notification>,
}

impl InMemoryNotificationRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.notifications.len()
    }

    pub fn is_empty(&self) -> bool {
        self.notifications.is_empty()
    }

    fn visible_to(&self, recipient: UserId) -> Vec<Notification> {
        self.notifications
            .iter()
            .filter(|n| n.is_visible_to(recipient))
            .map(|n| n.value().clone())
            .collect()
    }
}

#[async_trait]
impl NotificationRepository for InMemoryNotificationRepository {
    async fn insert(&self, notification: Notification) -> Result<()> {
        self.notifications.insert(notification.id, notification);
        Ok(())
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>> {
        Ok(self.notifications.get(&id).map(|n| n.value().clone()))
    }

    async fn list_visible_to(
        &self,
        recipient: UserId,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Notification>> {
        Ok(window(self.visible_to(recipient), |n| (n.created_at, n.id), skip, limit))
    }

    async fn count_visible_to(&self, recipient: UserId) -> Result<u64> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.is_visible_to(recipient))
            .count() as u64)
    }

    async fn add_reader(&self, id: NotificationId, recipient: UserId) -> Result<Notification> {
        let mut notification = self
            .notifications
            .get_mut(&id)
            .ok_or_else(|| DomainError::not_found("Notification", id))?;
        notification.record_read(recipient)?;
        Ok(notification.value().clone())
    }

    async fn mark_all_read(&self, recipient: UserId) -> Result<u64> {
        let mut changed = 0;
        for mut notification in self.notifications.iter_mut() {
            if notification.is_visible_to(recipient) && notification.record_read(recipient)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    async fn record_deletion(&self, id: NotificationId, recipient: UserId) -> Result<QuorumOutcome> {
        let outcome = {
            let mut notification = self
                .notifications
                .get_mut(&id)
                .ok_or_else(|| DomainError::not_found("Notification", id))?;
            if notification.record_deletion(recipient)? {
                QuorumOutcome::Destroyed
            } else {
                QuorumOutcome::Retained(notification.value().clone())
            }
        };
        if matches!(outcome, QuorumOutcome::Destroyed) {
            self.notifications
                .remove_if(&id, |_, n| n.is_fully_deleted());
        }
        Ok(outcome)
    }

    async fn list_ids_for_recipient(&self, recipient: UserId) -> Result<Vec<NotificationId>> {
        Ok(self
            .notifications
            .iter()
            .filter(|n| n.is_recipient(recipient))
            .map(|n| n.id)
            .collect())
    }
}
