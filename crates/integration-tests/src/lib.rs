//! Shared fixtures: every service wired over one `InMemoryStore`, plus
//! test doubles for the collaborators the scenarios need to observe or break.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use api_adapters::{AppState, Metrics};
use async_trait::async_trait;
use domains::{
    DomainError, FriendRequestStatus, MediaPath, MediaStorage, Notification, NotificationId,
    NotificationRepository, PageSizes, QuorumOutcome, Result, User, UserId, UserRepository,
};
use fake::faker::internet::en::Username;
use fake::Fake;
use services::{
    AccountDeletionCascade, ContentService, NotificationService, ProfileMediaDefaults,
    ProfileService, RelationshipService,
};
use storage_adapters::{InMemoryNotificationRepository, InMemoryStore};

pub const DEFAULT_AVATAR: &str = "defaults/avatar.png";
pub const DEFAULT_BACKGROUND: &str = "defaults/background.png";

/// `MediaStorage` that only records what it was asked to remove.
#[derive(Default)]
pub struct RecordingMedia {
    removed: Mutex<Vec<MediaPath>>,
}

impl RecordingMedia {
    pub fn removed(&self) -> Vec<MediaPath> {
        self.removed
            .lock()
            .map(|paths| paths.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl MediaStorage for RecordingMedia {
    async fn remove(&self, path: &MediaPath) -> Result<()> {
        if let Ok(mut paths) = self.removed.lock() {
            paths.push(path.clone());
        }
        Ok(())
    }
}

/// Delegates to the in-memory repository, but `list_ids_for_recipient`
/// fails while `failing` is set.
pub struct FlakyNotifications {
    inner: Arc<InMemoryNotificationRepository>,
    failing: AtomicBool,
}

impl FlakyNotifications {
    pub fn new(inner: Arc<InMemoryNotificationRepository>) -> Self {
        Self {
            inner,
            failing: AtomicBool::new(true),
        }
    }

    pub fn recover(&self) {
        self.failing.store(false, Ordering::SeqCst);
    }
}

#[async_trait]
impl NotificationRepository for FlakyNotifications {
    async fn insert(&self, notification: Notification) -> Result<()> {
        self.inner.insert(notification).await
    }

    async fn find_by_id(&self, id: NotificationId) -> Result<Option<Notification>> {
        self.inner.find_by_id(id).await
    }

    async fn list_visible_to(&self, r: UserId, skip: u64, limit: u64) -> Result<Vec<Notification>> {
        self.inner.list_visible_to(r, skip, limit).await
    }

    async fn count_visible_to(&self, r: UserId) -> Result<u64> {
        self.inner.count_visible_to(r).await
    }

    async fn add_reader(&self, id: NotificationId, r: UserId) -> Result<Notification> {
        self.inner.add_reader(id, r).await
    }

    async fn mark_all_read(&self, r: UserId) -> Result<u64> {
        self.inner.mark_all_read(r).await
    }

    async fn record_deletion(&self, id: NotificationId, r: UserId) -> Result<QuorumOutcome> {
        self.inner.record_deletion(id, r).await
    }

    async fn list_ids_for_recipient(&self, r: UserId) -> Result<Vec<NotificationId>> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(DomainError::storage("notification store unavailable"));
        }
        self.inner.list_ids_for_recipient(r).await
    }
}

pub struct Harness {
    pub store: InMemoryStore,
    pub media: Arc<RecordingMedia>,
    pub page_sizes: PageSizes,
    pub profiles: ProfileService,
    pub notifications: NotificationService,
    pub relationships: RelationshipService,
    pub content: ContentService,
    pub deletion: Arc<AccountDeletionCascade>,
}

impl Default for Harness {
    fn default() -> Self {
        Self::new()
    }
}

impl Harness {
    pub fn new() -> Self {
        let store = InMemoryStore::new();
        let media = Arc::new(RecordingMedia::default());
        let page_sizes = PageSizes::default();

        let notifications =
            NotificationService::new(store.notifications.clone(), page_sizes.notifications);
        let relationships = RelationshipService::new(
            store.users.clone(),
            store.friend_requests.clone(),
            notifications.clone(),
            page_sizes.search,
        );
        let content = ContentService::new(
            store.users.clone(),
            store.posts.clone(),
            store.comments.clone(),
            media.clone(),
            notifications.clone(),
            page_sizes,
        );
        let deletion = Arc::new(Self::cascade_over(
            &store,
            store.notifications.clone(),
            media.clone(),
        ));

        Self {
            profiles: ProfileService::new(store.users.clone(), Self::media_defaults()),
            store,
            media,
            page_sizes,
            notifications,
            relationships,
            content,
            deletion,
        }
    }

    pub fn media_defaults() -> ProfileMediaDefaults {
        ProfileMediaDefaults {
            avatar: Some(MediaPath::new(DEFAULT_AVATAR)),
            background: Some(MediaPath::new(DEFAULT_BACKGROUND)),
        }
    }

    /// A cascade over this harness's store with substitute collaborators.
    pub fn cascade_over(
        store: &InMemoryStore,
        notifications: Arc<dyn NotificationRepository>,
        media: Arc<dyn MediaStorage>,
    ) -> AccountDeletionCascade {
        AccountDeletionCascade::new(
            store.users.clone(),
            store.posts.clone(),
            store.comments.clone(),
            store.friend_requests.clone(),
            notifications,
            media,
            store.journal.clone(),
            Self::media_defaults(),
        )
    }

    pub fn app_state(&self) -> AppState {
        AppState {
            profiles: self.profiles.clone(),
            relationships: self.relationships.clone(),
            notifications: self.notifications.clone(),
            content: self.content.clone(),
            deletion: self.deletion.clone(),
            metrics: Arc::new(Metrics::new()),
        }
    }

    /// Stores a user with a generated, unique username.
    pub async fn user(&self, is_private: bool) -> User {
        let name: String = Username().fake();
        let suffix = UserId::new().to_string();
        let user = User::new(format!("{name}_{}", &suffix[..8]), is_private);
        self.store
            .users
            .insert(user.clone())
            .await
            .expect("fixture user");
        user
    }

    /// Request from `a`, accepted by `b`.
    pub async fn befriend(&self, a: UserId, b: UserId) {
        let request = self.relationships.request(a, b).await.expect("request");
        let accepted = self
            .relationships
            .respond(b, request.id, true)
            .await
            .expect("accept");
        assert_eq!(accepted.status, FriendRequestStatus::Accepted);
    }

    pub async fn reload(&self, id: UserId) -> Option<User> {
        self.store.users.find_by_id(id).await.expect("user lookup")
    }

    pub async fn friends_of(&self, id: UserId) -> Vec<UserId> {
        self.reload(id)
            .await
            .map(|u| u.friends.iter().copied().collect())
            .unwrap_or_default()
    }
}
