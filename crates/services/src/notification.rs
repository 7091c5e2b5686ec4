//! # NotificationFanout
//!
//! One notification record is shared by all of its recipients; each
//! recipient reads and deletes it independently. The record is destroyed
//! once every recipient has deleted it.

use std::sync::Arc;

use domains::{
    paginate, DomainError, IdSet, Notification, NotificationAction, NotificationId,
    NotificationRepository, Page, PageRequest, QuorumOutcome, UserId,
};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RetireAction {
    Read,
    Delete,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RetireOutcome {
    Read(Notification),
    /// Deleted for this recipient; others still see it.
    Retained(Notification),
    Destroyed,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NotificationPage {
    pub page: Page<Notification>,
    /// Unread notifications within the first page window.
    pub unread_count: u64,
}

#[derive(Clone)]
pub struct NotificationService {
    notifications: Arc<dyn NotificationRepository>,
    page_size: u64,
}

impl NotificationService {
    pub fn new(notifications: Arc<dyn NotificationRepository>, page_size: u64) -> Self {
        Self {
            notifications,
            page_size,
        }
    }

    /// Stores one notification for `recipients`. The actor is never notified
    /// of their own action; returns `None` when nobody is left to notify.
    #[instrument(skip(self, recipients), fields(actor = %actor))]
    pub async fn publish(
        &self,
        actor: UserId,
        recipients: impl IntoIterator<Item = UserId> + Send,
        action: NotificationAction,
    ) -> Result<Option<Notification>, DomainError> {
        let recipients: IdSet<UserId> = recipients.into_iter().filter(|r| *r != actor).collect();
        if recipients.is_empty() {
            debug!("no recipients left, skipping notification");
            return Ok(None);
        }

        let notification = Notification::new(actor, recipients, action)?;
        self.notifications.insert(notification.clone()).await?;
        debug!(id = %notification.id, recipients = notification.recipients.len(), "notification published");
        Ok(Some(notification))
    }

    /// Newest first. `unread_count` always covers the first page window.
    #[instrument(skip(self), fields(recipient = %recipient, page = page.number()))]
    pub async fn list(
        &self,
        recipient: UserId,
        page: PageRequest,
    ) -> Result<NotificationPage, DomainError> {
        let total = self.notifications.count_visible_to(recipient).await?;
        let window = paginate(total, page, self.page_size);
        let items = self
            .notifications
            .list_visible_to(recipient, window.skip, window.limit)
            .await?;

        let unread_count = if page.number() == 1 {
            count_unread(&items, recipient)
        } else {
            let first = self
                .notifications
                .list_visible_to(recipient, 0, self.page_size)
                .await?;
            count_unread(&first, recipient)
        };

        Ok(NotificationPage {
            page: Page::from_window(items, window),
            unread_count,
        })
    }

    #[instrument(skip(self), fields(recipient = %recipient))]
    pub async fn mark_all_read(&self, recipient: UserId) -> Result<u64, DomainError> {
        let changed = self.notifications.mark_all_read(recipient).await?;
        debug!(changed, "notifications marked read");
        Ok(changed)
    }

    #[instrument(skip(self), fields(recipient = %recipient, notification = %id))]
    pub async fn retire(
        &self,
        recipient: UserId,
        id: NotificationId,
        action: RetireAction,
    ) -> Result<RetireOutcome, DomainError> {
        let notification = self
            .notifications
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Notification", id))?;
        if !notification.is_recipient(recipient) {
            return Err(DomainError::Forbidden(
                "You are not a recipient of this notification".into(),
            ));
        }

        match action {
            RetireAction::Read => {
                let updated = self.notifications.add_reader(id, recipient).await?;
                Ok(RetireOutcome::Read(updated))
            }
            RetireAction::Delete => match self.notifications.record_deletion(id, recipient).await? {
                QuorumOutcome::Retained(updated) => Ok(RetireOutcome::Retained(updated)),
                QuorumOutcome::Destroyed => {
                    info!("every recipient deleted the notification, record destroyed");
                    Ok(RetireOutcome::Destroyed)
                }
            },
        }
    }
}

fn count_unread(items: &[Notification], recipient: UserId) -> u64 {
    items.iter().filter(|n| n.is_unread_by(recipient)).count() as u64
}
