//! # Rusty-Social Binary
//!
//! Loads settings, wires the in-memory store and local media storage into
//! the services, and serves the axum router.

use std::sync::Arc;

use anyhow::Context;
use api_adapters::{http, AppState, Metrics};
use configs::{LogFormat, LogSettings, MediaSettings, Settings};
use domains::MediaPath;
use services::{
    AccountDeletionCascade, ContentService, NotificationService, ProfileMediaDefaults,
    ProfileService, RelationshipService,
};
use storage_adapters::{InMemoryStore, LocalMediaStorage};
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing(log: &LogSettings) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&log.filter));
    let registry = tracing_subscriber::registry().with(filter);
    match log.format {
        LogFormat::Json => registry.with(fmt::layer().json()).init(),
        LogFormat::Pretty => registry.with(fmt::layer()).init(),
    }
}

fn media_defaults(media: &MediaSettings) -> ProfileMediaDefaults {
    ProfileMediaDefaults {
        avatar: media.default_avatar.as_deref().map(MediaPath::new),
        background: media.default_background.as_deref().map(MediaPath::new),
    }
}

fn build_state(settings: &Settings) -> AppState {
    let store = InMemoryStore::new();
    let media = Arc::new(LocalMediaStorage::new(settings.media.root.clone()));
    let sizes = settings.pagination;
    let defaults = media_defaults(&settings.media);

    let notifications = NotificationService::new(store.notifications.clone(), sizes.notifications);
    let relationships = RelationshipService::new(
        store.users.clone(),
        store.friend_requests.clone(),
        notifications.clone(),
        sizes.search,
    );
    let content = ContentService::new(
        store.users.clone(),
        store.posts.clone(),
        store.comments.clone(),
        media.clone(),
        notifications.clone(),
        sizes,
    );
    let deletion = AccountDeletionCascade::new(
        store.users.clone(),
        store.posts.clone(),
        store.comments.clone(),
        store.friend_requests.clone(),
        store.notifications.clone(),
        media,
        store.journal.clone(),
        defaults.clone(),
    );

    AppState {
        profiles: ProfileService::new(store.users.clone(), defaults),
        relationships,
        notifications,
        content,
        deletion: Arc::new(deletion),
        metrics: Arc::new(Metrics::new()),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("loading configuration")?;
    init_tracing(&settings.log);

    let state = build_state(&settings);
    let app = http::router(state);

    let address = settings.server.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("binding {address}"))?;
    tracing::info!(%address, media_root = %settings.media.root.display(), "rusty-social listening");

    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
