//! # ContentService
//!
//! Posts, comments and likes. Every read or interaction is authorized
//! against the owner of the post, so comments inherit their post's privacy.

use std::sync::Arc;

use domains::{
    paginate, Comment, CommentId, CommentRepository, DomainError, MediaPath, MediaStorage,
    NotificationAction, Page, PageRequest, PageSizes, Post, PostId, PostRepository, User, UserId,
    UserRepository,
};
use tracing::{info, instrument, warn};

use crate::notification::NotificationService;
use crate::privacy::{Interaction, PrivacyAuthorizer};

#[derive(Clone)]
pub struct ContentService {
    users: Arc<dyn UserRepository>,
    posts: Arc<dyn PostRepository>,
    comments: Arc<dyn CommentRepository>,
    media: Arc<dyn MediaStorage>,
    notifications: NotificationService,
    page_sizes: PageSizes,
}

/// What `purge_post` removed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct PurgedPost {
    pub comments: u64,
    pub media_removed: bool,
}

/// Removes `path` from storage only when it lies in `owner`'s media
/// directory. Paths outside it, and paths storage refuses as invalid, are
/// left in place. Returns whether the file was removed.
pub(crate) async fn remove_owned_media(
    media: &dyn MediaStorage,
    owner: UserId,
    path: &MediaPath,
) -> Result<bool, DomainError> {
    if !path.is_owned_by(owner) {
        warn!(%path, %owner, "media outside the owner's directory left in place");
        return Ok(false);
    }
    match media.remove(path).await {
        Ok(()) => Ok(true),
        Err(DomainError::Validation(reason)) => {
            warn!(%path, %reason, "storage refused media path, left in place");
            Ok(false)
        }
        Err(err) => Err(err),
    }
}

/// Comments first, then the post, then its media.
pub(crate) async fn purge_post(
    posts: &dyn PostRepository,
    comments: &dyn CommentRepository,
    media: &dyn MediaStorage,
    post: &Post,
) -> Result<PurgedPost, DomainError> {
    let removed = comments.delete_for_post(post.id).await?;
    posts.delete(post.id).await?;
    let media_removed = match &post.media {
        Some(path) => remove_owned_media(media, post.posted_by, path).await?,
        None => false,
    };
    Ok(PurgedPost {
        comments: removed,
        media_removed,
    })
}

impl ContentService {
    pub fn new(
        users: Arc<dyn UserRepository>,
        posts: Arc<dyn PostRepository>,
        comments: Arc<dyn CommentRepository>,
        media: Arc<dyn MediaStorage>,
        notifications: NotificationService,
        page_sizes: PageSizes,
    ) -> Self {
        Self {
            users,
            posts,
            comments,
            media,
            notifications,
            page_sizes,
        }
    }

    async fn load_user(&self, id: UserId) -> Result<User, DomainError> {
        self.users
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("User", id))
    }

    async fn load_post(&self, id: PostId) -> Result<Post, DomainError> {
        self.posts
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Post", id))
    }

    async fn load_comment(&self, id: CommentId) -> Result<Comment, DomainError> {
        self.comments
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("Comment", id))
    }

    /// Loads a post together with its owner, checking `viewer` may see it.
    async fn visible_post(&self, viewer: UserId, id: PostId) -> Result<(Post, User), DomainError> {
        let post = self.load_post(id).await?;
        let owner = self.load_user(post.posted_by).await?;
        PrivacyAuthorizer::ensure_can_view(viewer, &owner)?;
        Ok((post, owner))
    }

    async fn notify(
        &self,
        actor: UserId,
        recipients: impl IntoIterator<Item = UserId> + Send,
        action: NotificationAction,
    ) {
        if let Err(err) = self.notifications.publish(actor, recipients, action).await {
            warn!(error = %err, "failed to publish content notification");
        }
    }

    #[instrument(skip(self, body), fields(author = %author))]
    pub async fn create_post(
        &self,
        author: UserId,
        body: String,
        media: Option<MediaPath>,
    ) -> Result<Post, DomainError> {
        if body.trim().is_empty() && media.is_none() {
            return Err(DomainError::Validation("A post needs text or media".into()));
        }
        if let Some(path) = &media {
            path.ensure_owned_by(author)?;
        }
        let owner = self.load_user(author).await?;
        let post = Post::new(author, body, media);
        self.posts.insert(post.clone()).await?;
        info!(post = %post.id, "post created");

        self.notify(
            author,
            owner.friends.iter().copied().collect::<Vec<_>>(),
            NotificationAction::PostCreated { post: post.id },
        )
        .await;
        Ok(post)
    }

    #[instrument(skip(self), fields(viewer = %viewer, post = %id))]
    pub async fn get_post(&self, viewer: UserId, id: PostId) -> Result<Post, DomainError> {
        let (post, _) = self.visible_post(viewer, id).await?;
        Ok(post)
    }

    /// Posts by `owner`, newest first.
    #[instrument(skip(self), fields(viewer = %viewer, owner = %owner))]
    pub async fn list_posts(
        &self,
        viewer: UserId,
        owner: UserId,
        page: PageRequest,
    ) -> Result<Page<Post>, DomainError> {
        let owner = self.load_user(owner).await?;
        PrivacyAuthorizer::ensure_can_view(viewer, &owner)?;

        let total = self.posts.count_by_author(owner.id).await?;
        let window = paginate(total, page, self.page_sizes.posts);
        let items = self
            .posts
            .list_by_author(owner.id, window.skip, window.limit)
            .await?;
        Ok(Page::from_window(items, window))
    }

    #[instrument(skip(self), fields(actor = %actor, post = %id))]
    pub async fn delete_post(&self, actor: UserId, id: PostId) -> Result<(), DomainError> {
        let post = self.load_post(id).await?;
        if post.posted_by != actor {
            return Err(DomainError::Forbidden("Only the author can delete this post".into()));
        }
        let purged = purge_post(
            self.posts.as_ref(),
            self.comments.as_ref(),
            self.media.as_ref(),
            &post,
        )
        .await?;
        info!(comments = purged.comments, media = purged.media_removed, "post deleted");
        Ok(())
    }

    #[instrument(skip(self, body), fields(actor = %actor, post = %post_id))]
    pub async fn add_comment(
        &self,
        actor: UserId,
        post_id: PostId,
        body: String,
    ) -> Result<Comment, DomainError> {
        if body.trim().is_empty() {
            return Err(DomainError::Validation("A comment cannot be empty".into()));
        }
        let (post, owner) = self.visible_post(actor, post_id).await?;
        PrivacyAuthorizer::ensure_can_interact(actor, post.posted_by, &owner, Interaction::Comment)?;

        let comment = Comment::new(post.id, actor, body);
        self.comments.insert(comment.clone()).await?;

        self.notify(
            actor,
            [owner.id],
            NotificationAction::CommentCreated {
                post: post.id,
                comment: comment.id,
            },
        )
        .await;
        Ok(comment)
    }

    /// Comments on a post, oldest first.
    #[instrument(skip(self), fields(viewer = %viewer, post = %post_id))]
    pub async fn list_comments(
        &self,
        viewer: UserId,
        post_id: PostId,
        page: PageRequest,
    ) -> Result<Page<Comment>, DomainError> {
        let (post, _) = self.visible_post(viewer, post_id).await?;
        let total = self.comments.count_for_post(post.id).await?;
        let window = paginate(total, page, self.page_sizes.comments);
        let items = self
            .comments
            .list_for_post(post.id, window.skip, window.limit)
            .await?;
        Ok(Page::from_window(items, window))
    }

    /// Live count of comments referencing the post.
    pub async fn comment_count(&self, viewer: UserId, post_id: PostId) -> Result<u64, DomainError> {
        let (post, _) = self.visible_post(viewer, post_id).await?;
        self.comments.count_for_post(post.id).await
    }

    /// The comment's author or the post's owner may delete it.
    #[instrument(skip(self), fields(actor = %actor, comment = %id))]
    pub async fn delete_comment(&self, actor: UserId, id: CommentId) -> Result<(), DomainError> {
        let comment = self.load_comment(id).await?;
        let post = self.load_post(comment.post).await?;
        if actor != comment.posted_by && actor != post.posted_by {
            return Err(DomainError::Forbidden(
                "Only the comment author or the post owner can delete this comment".into(),
            ));
        }
        self.comments.delete(id).await
    }

    #[instrument(skip(self), fields(actor = %actor, post = %id))]
    pub async fn like_post(&self, actor: UserId, id: PostId) -> Result<(), DomainError> {
        let (post, owner) = self.visible_post(actor, id).await?;
        PrivacyAuthorizer::ensure_can_interact(actor, post.posted_by, &owner, Interaction::Like)?;
        if !self.posts.add_like(id, actor).await? {
            return Err(DomainError::Conflict("You already liked this post".into()));
        }
        self.notify(actor, [owner.id], NotificationAction::PostLiked { post: id })
            .await;
        Ok(())
    }

    #[instrument(skip(self), fields(actor = %actor, post = %id))]
    pub async fn unlike_post(&self, actor: UserId, id: PostId) -> Result<(), DomainError> {
        self.visible_post(actor, id).await?;
        if !self.posts.remove_like(id, actor).await? {
            return Err(DomainError::Conflict("You have not liked this post".into()));
        }
        Ok(())
    }

    #[instrument(skip(self), fields(actor = %actor, comment = %id))]
    pub async fn like_comment(&self, actor: UserId, id: CommentId) -> Result<(), DomainError> {
        let comment = self.load_comment(id).await?;
        let (post, owner) = self.visible_post(actor, comment.post).await?;
        PrivacyAuthorizer::ensure_can_interact(actor, comment.posted_by, &owner, Interaction::Like)?;
        if !self.comments.add_like(id, actor).await? {
            return Err(DomainError::Conflict("You already liked this comment".into()));
        }
        // Comments outlive their author's account; nobody is left to notify.
        if self.users.find_by_id(comment.posted_by).await?.is_none() {
            return Ok(());
        }
        self.notify(
            actor,
            [comment.posted_by],
            NotificationAction::CommentLiked {
                post: post.id,
                comment: id,
            },
        )
        .await;
        Ok(())
    }

    #[instrument(skip(self), fields(actor = %actor, comment = %id))]
    pub async fn unlike_comment(&self, actor: UserId, id: CommentId) -> Result<(), DomainError> {
        let comment = self.load_comment(id).await?;
        self.visible_post(actor, comment.post).await?;
        if !self.comments.remove_like(id, actor).await? {
            return Err(DomainError::Conflict("You have not liked this comment".into()));
        }
        Ok(())
    }
}
