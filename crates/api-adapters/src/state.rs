use std::sync::Arc;

use services::{
    AccountDeletionCascade, ContentService, NotificationService, ProfileService, RelationshipService,
};

use crate::metrics::Metrics;

/// Shared by every request handler.
#[derive(Clone)]
pub struct AppState {
    pub profiles: ProfileService,
    pub relationships: RelationshipService,
    pub notifications: NotificationService,
    pub content: ContentService,
    pub deletion: Arc<AccountDeletionCascade>,
    pub metrics: Arc<Metrics>,
}
