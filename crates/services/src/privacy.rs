//! # PrivacyAuthorizer
//!
//! Pure decision functions. Call sites pass the owner of the *post*, so a
//! comment's visibility follows its post's owner.

use domains::{DomainError, User, UserId};

/// What the actor wants to do with the content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interaction {
    View,
    Like,
    Comment,
}

pub struct PrivacyAuthorizer;

impl PrivacyAuthorizer {
    /// Self, public owners, and friends of private owners.
    pub fn can_view(viewer: UserId, owner: &User) -> bool {
        viewer == owner.id || !owner.is_private || owner.is_friend_of(viewer)
    }

    /// `can_view` plus the rule that nobody likes their own content.
    /// `author` is the author of the liked item, `post_owner` the owner of
    /// the post it belongs to.
    pub fn can_interact(
        actor: UserId,
        author: UserId,
        post_owner: &User,
        interaction: Interaction,
    ) -> bool {
        Self::can_view(actor, post_owner) && !(interaction == Interaction::Like && actor == author)
    }

    pub fn ensure_can_view(viewer: UserId, owner: &User) -> Result<(), DomainError> {
        if Self::can_view(viewer, owner) {
            Ok(())
        } else {
            Err(DomainError::Forbidden(
                "This account is private; only friends can see its content".into(),
            ))
        }
    }

    pub fn ensure_can_interact(
        actor: UserId,
        author: UserId,
        post_owner: &User,
        interaction: Interaction,
    ) -> Result<(), DomainError> {
        Self::ensure_can_view(actor, post_owner)?;
        if !Self::can_interact(actor, author, post_owner, interaction) {
            return Err(DomainError::Forbidden("You cannot like your own content".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn private_user() -> User {
        User::new("private", true)
    }

    #[test]
    fn test_owner_always_sees_own_content() {
        let owner = private_user();
        assert!(PrivacyAuthorizer::can_view(owner.id, &owner));
    }

    #[test]
    fn test_public_owner_visible_to_anyone() {
        let owner = User::new("public", false);
        assert!(PrivacyAuthorizer::can_view(UserId::new(), &owner));
    }

    #[test]
    fn test_private_owner_visible_to_friends_only() {
        let mut owner = private_user();
        let friend = UserId::new();
        let stranger = UserId::new();
        owner.friends.insert(friend);
        assert!(PrivacyAuthorizer::can_view(friend, &owner));
        assert!(!PrivacyAuthorizer::can_view(stranger, &owner));
        assert!(matches!(
            PrivacyAuthorizer::ensure_can_view(stranger, &owner),
            Err(DomainError::Forbidden(_))
        ));
    }

    #[test]
    fn test_self_like_forbidden_but_self_comment_allowed() {
        let owner = private_user();
        assert!(!PrivacyAuthorizer::can_interact(owner.id, owner.id, &owner, Interaction::Like));
        assert!(PrivacyAuthorizer::can_interact(owner.id, owner.id, &owner, Interaction::Comment));
        assert!(PrivacyAuthorizer::ensure_can_interact(owner.id, owner.id, &owner, Interaction::Like).is_err());
    }

    #[test]
    fn test_liking_someone_elses_comment_on_own_post() {
        let owner = private_user();
        let commenter = UserId::new();
        assert!(PrivacyAuthorizer::can_interact(owner.id, commenter, &owner, Interaction::Like));
    }

    #[test]
    fn test_comment_visibility_follows_post_owner() {
        // A friend's comment on a private post is still hidden from strangers
        let mut owner = private_user();
        let commenter = UserId::new();
        owner.friends.insert(commenter);
        let stranger = UserId::new();
        assert!(!PrivacyAuthorizer::can_interact(stranger, commenter, &owner, Interaction::Like));
    }
}
