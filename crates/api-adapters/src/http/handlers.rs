//! Request handlers. Each one resolves the principal, delegates to a
//! service and serializes the result; no business rules live here.

use axum::extract::{Path, Query, State};
use axum::http::{header, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use domains::{
    Comment, CommentId, FriendRequest, FriendRequestId, MediaPath, Notification, NotificationId,
    Page, Post, PostId, User, UserId,
};
use serde::{Deserialize, Serialize};
use services::{CascadeReport, ProfileUpdate, RetireAction, RetireOutcome};

use super::error::ApiError;
use super::extract::{CurrentUser, PageQuery};
use crate::state::AppState;

type ApiResult<T> = Result<T, ApiError>;

// ── Profiles ─────────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct Registration {
    pub username: String,
    #[serde(default)]
    pub is_private: bool,
}

/// Called by the identity provider once an account is created upstream.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<Registration>,
) -> ApiResult<(StatusCode, Json<User>)> {
    let user = state.profiles.register(&body.username, body.is_private).await?;
    Ok((StatusCode::CREATED, Json(user)))
}

pub async fn get_profile(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<UserId>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.profiles.get(viewer, id).await?))
}

pub async fn update_profile(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<Json<User>> {
    Ok(Json(state.profiles.update(user, update).await?))
}

// ── Relationships ────────────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct FriendRequestBody {
    pub to: UserId,
}

#[derive(Debug, Deserialize)]
pub struct RespondBody {
    pub accept: bool,
}

pub async fn send_friend_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<FriendRequestBody>,
) -> ApiResult<(StatusCode, Json<FriendRequest>)> {
    let request = state.relationships.request(user, body.to).await?;
    Ok((StatusCode::CREATED, Json(request)))
}

pub async fn respond_friend_request(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<FriendRequestId>,
    Json(body): Json<RespondBody>,
) -> ApiResult<Json<FriendRequest>> {
    let request = state.relationships.respond(user, id, body.accept).await?;
    Ok(Json(request))
}

pub async fn list_incoming_requests(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<FriendRequest>>> {
    let page = state.relationships.list_incoming(user, query.request()?).await?;
    Ok(Json(page))
}

pub async fn unfriend(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(friend): Path<UserId>,
) -> ApiResult<StatusCode> {
    state.relationships.unfriend(user, friend).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn list_friends(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(user): Path<UserId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<User>>> {
    let page = state
        .relationships
        .list_friends(viewer, user, query.request()?)
        .await?;
    Ok(Json(page))
}

// ── Posts and comments ───────────────────────────────────────────────────────

#[derive(Debug, Deserialize)]
pub struct NewPost {
    #[serde(default)]
    pub body: String,
    pub media: Option<MediaPath>,
}

#[derive(Debug, Deserialize)]
pub struct NewComment {
    pub body: String,
}

#[derive(Debug, Serialize)]
pub struct CommentCount {
    pub count: u64,
}

pub async fn create_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<NewPost>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let post = state.content.create_post(user, body.body, body.media).await?;
    Ok((StatusCode::CREATED, Json(post)))
}

pub async fn list_posts(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(owner): Path<UserId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<Post>>> {
    let page = state.content.list_posts(viewer, owner, query.request()?).await?;
    Ok(Json(page))
}

pub async fn get_post(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(id): Path<PostId>,
) -> ApiResult<Json<Post>> {
    Ok(Json(state.content.get_post(viewer, id).await?))
}

pub async fn delete_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<PostId>,
) -> ApiResult<StatusCode> {
    state.content.delete_post(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<PostId>,
) -> ApiResult<StatusCode> {
    state.content.like_post(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlike_post(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<PostId>,
) -> ApiResult<StatusCode> {
    state.content.unlike_post(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn add_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(post): Path<PostId>,
    Json(body): Json<NewComment>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let comment = state.content.add_comment(user, post, body.body).await?;
    Ok((StatusCode::CREATED, Json(comment)))
}

pub async fn list_comments(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(post): Path<PostId>,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<Page<Comment>>> {
    let page = state
        .content
        .list_comments(viewer, post, query.request()?)
        .await?;
    Ok(Json(page))
}

pub async fn comment_count(
    State(state): State<AppState>,
    CurrentUser(viewer): CurrentUser,
    Path(post): Path<PostId>,
) -> ApiResult<Json<CommentCount>> {
    let count = state.content.comment_count(viewer, post).await?;
    Ok(Json(CommentCount { count }))
}

pub async fn delete_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CommentId>,
) -> ApiResult<StatusCode> {
    state.content.delete_comment(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn like_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CommentId>,
) -> ApiResult<StatusCode> {
    state.content.like_comment(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn unlike_comment(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<CommentId>,
) -> ApiResult<StatusCode> {
    state.content.unlike_comment(user, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Notifications ────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub struct NotificationList {
    #[serde(flatten)]
    pub page: Page<Notification>,
    pub unread_count: u64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub updated: u64,
}

#[derive(Debug, Deserialize)]
pub struct RetireBody {
    pub action: RetireAction,
}

pub async fn list_notifications(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Query(query): Query<PageQuery>,
) -> ApiResult<Json<NotificationList>> {
    let listed = state.notifications.list(user, query.request()?).await?;
    Ok(Json(NotificationList {
        page: listed.page,
        unread_count: listed.unread_count,
    }))
}

pub async fn mark_all_read(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<MarkedRead>> {
    let updated = state.notifications.mark_all_read(user).await?;
    Ok(Json(MarkedRead { updated }))
}

/// `read` or `delete` one notification for the principal. Returns the
/// notification while it still exists, 204 once the last recipient is gone.
pub async fn retire_notification(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<NotificationId>,
    Json(body): Json<RetireBody>,
) -> ApiResult<Response> {
    let outcome = state.notifications.retire(user, id, body.action).await?;
    Ok(match outcome {
        RetireOutcome::Read(notification) | RetireOutcome::Retained(notification) => {
            Json(notification).into_response()
        }
        RetireOutcome::Destroyed => StatusCode::NO_CONTENT.into_response(),
    })
}

// ── Account ──────────────────────────────────────────────────────────────────

pub async fn delete_account(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
) -> ApiResult<Json<CascadeReport>> {
    let result = state.deletion.run(user).await;
    state.metrics.record_deletion(result.is_ok());
    Ok(Json(result?))
}

// ── Operational ──────────────────────────────────────────────────────────────

pub async fn health() -> &'static str {
    "ok"
}

pub async fn metrics(State(state): State<AppState>) -> Response {
    match state.metrics.render() {
        Ok(text) => (
            [(
                header::CONTENT_TYPE,
                "application/openmetrics-text; version=1.0.0; charset=utf-8",
            )],
            text,
        )
            .into_response(),
        Err(err) => {
            tracing::error!(error = %err, "failed to encode metrics");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
