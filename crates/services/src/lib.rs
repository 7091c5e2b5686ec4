//! # services
//!
//! Orchestration over the `domains` ports: who may see what, the friend
//! request lifecycle, notification fanout and account deletion.
//! Every service receives its repositories through its constructor.

pub mod account_deletion;
pub mod content;
pub mod notification;
pub mod privacy;
pub mod profile;
pub mod relationship;

pub use account_deletion::{AccountDeletionCascade, CascadeError, CascadeReport, ProfileMediaDefaults};
pub use content::ContentService;
pub use notification::{NotificationPage, NotificationService, RetireAction, RetireOutcome};
pub use privacy::{Interaction, PrivacyAuthorizer};
pub use profile::{ProfileService, ProfileUpdate};
pub use relationship::RelationshipService;
