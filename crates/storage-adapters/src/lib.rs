//! # storage-adapters
//!
//! Implementations of the `domains` ports.
//!
//! - `memory`: DashMap-backed repositories. Each set mutation runs under
//!   the per-entry shard lock, which is the store-level atomic
//!   add-to-set / remove-from-set the services rely on.
//! - `media`: local filesystem `MediaStorage`.

pub mod media;
pub mod memory;

#[cfg(feature = "media-local")]
pub use media::local::LocalMediaStorage;
pub use memory::{
    InMemoryCascadeJournal, InMemoryCommentRepository, InMemoryFriendRequestRepository,
    InMemoryNotificationRepository, InMemoryPostRepository, InMemoryStore,
    InMemoryUserRepository,
};
