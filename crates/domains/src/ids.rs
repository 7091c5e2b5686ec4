//! # Identifiers and sets
//!
//! Strongly typed ids for every entity plus the ordered id set used for
//! `friends`, `liked_by`, `read_by` and `deleted_by`.

use std::collections::BTreeSet;
use std::fmt;
use std::path::{Component, Path};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

macro_rules! entity_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub Uuid);

        impl $name {
            pub fn new() -> Self {
                Self(Uuid::new_v4())
            }

            pub fn as_uuid(&self) -> Uuid {
                self.0
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::new()
            }
        }

        impl From<Uuid> for $name {
            fn from(id: Uuid) -> Self {
                Self(id)
            }
        }

        impl std::str::FromStr for $name {
            type Err = uuid::Error;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                Uuid::parse_str(s).map(Self)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

entity_id!(
    /// A registered account.
    UserId
);
entity_id!(PostId);
entity_id!(CommentId);
entity_id!(FriendRequestId);
entity_id!(NotificationId);

/// An ordered set of ids.
///
/// Inserting an existing member is a no-op, which is what makes
/// read/like/friend mutations idempotent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IdSet<T: Ord>(BTreeSet<T>);

impl<T: Ord> Default for IdSet<T> {
    fn default() -> Self {
        Self(BTreeSet::new())
    }
}

impl<T: Ord + Copy> IdSet<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if the id was not already present.
    pub fn insert(&mut self, id: T) -> bool {
        self.0.insert(id)
    }

    /// Returns `true` if the id was present.
    pub fn remove(&mut self, id: &T) -> bool {
        self.0.remove(id)
    }

    pub fn contains(&self, id: &T) -> bool {
        self.0.contains(id)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_subset(&self, other: &IdSet<T>) -> bool {
        self.0.is_subset(&other.0)
    }

    pub fn iter(&self) -> impl Iterator<Item = &T> {
        self.0.iter()
    }
}

impl<T: Ord> FromIterator<T> for IdSet<T> {
    fn from_iter<I: IntoIterator<Item = T>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl<T: Ord> IntoIterator for IdSet<T> {
    type Item = T;
    type IntoIter = std::collections::btree_set::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

/// The unordered combination of two users.
///
/// `RelationshipPair::new(a, b) == RelationshipPair::new(b, a)`; this is the
/// uniqueness key for friend requests regardless of who asked whom.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RelationshipPair {
    low: UserId,
    high: UserId,
}

impl RelationshipPair {
    pub fn new(a: UserId, b: UserId) -> Self {
        if a <= b {
            Self { low: a, high: b }
        } else {
            Self { low: b, high: a }
        }
    }

    pub fn contains(&self, user: UserId) -> bool {
        self.low == user || self.high == user
    }

    pub fn members(&self) -> (UserId, UserId) {
        (self.low, self.high)
    }
}

/// Relative path of a stored media object, as handed to `MediaStorage`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MediaPath(String);

impl MediaPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Relative, free of `..` or root components, and naming at least one
    /// entry below the storage root.
    pub fn is_contained(&self) -> bool {
        let mut named = false;
        for component in Path::new(&self.0).components() {
            match component {
                Component::Normal(_) => named = true,
                Component::CurDir => {}
                _ => return false,
            }
        }
        named
    }

    /// Media uploaded by `user` lives under `users/{user}/`.
    pub fn owner_prefix(user: UserId) -> String {
        format!("users/{user}/")
    }

    /// True when the path names a file inside `user`'s own media directory.
    pub fn is_owned_by(&self, user: UserId) -> bool {
        if !self.is_contained() {
            return false;
        }
        let owner = user.to_string();
        let mut names = Path::new(&self.0).components().filter_map(|c| match c {
            Component::Normal(name) => name.to_str(),
            _ => None,
        });
        names.next() == Some("users")
            && names.next() == Some(owner.as_str())
            && names.next().is_some()
    }

    pub fn ensure_contained(&self) -> crate::errors::Result<()> {
        if self.is_contained() {
            Ok(())
        } else {
            Err(crate::errors::DomainError::Validation(format!(
                "media path {self} is not a relative storage path"
            )))
        }
    }

    pub fn ensure_owned_by(&self, user: UserId) -> crate::errors::Result<()> {
        self.ensure_contained()?;
        if self.is_owned_by(user) {
            Ok(())
        } else {
            Err(crate::errors::DomainError::Forbidden(format!(
                "media path {self} is outside {}",
                Self::owner_prefix(user)
            )))
        }
    }
}

impl fmt::Display for MediaPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
