use axum::extract::{Request, State};
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{delete, get, patch, post};
use axum::Router;
use domains::ErrorKind;
use tower::ServiceBuilder;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::trace::TraceLayer;

use super::handlers;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let relationships = Router::new()
        .route(
            "/requests",
            post(handlers::send_friend_request).get(handlers::list_incoming_requests),
        )
        .route("/requests/{id}/respond", post(handlers::respond_friend_request))
        .route("/friends/{friend}", delete(handlers::unfriend));

    let api = Router::new()
        .nest("/relationships", relationships)
        .route("/users", post(handlers::register))
        .route("/users/{id}", get(handlers::get_profile))
        .route("/users/{id}/friends", get(handlers::list_friends))
        .route("/users/{id}/posts", get(handlers::list_posts))
        .route("/posts", post(handlers::create_post))
        .route(
            "/posts/{id}",
            get(handlers::get_post).delete(handlers::delete_post),
        )
        .route(
            "/posts/{id}/likes",
            post(handlers::like_post).delete(handlers::unlike_post),
        )
        .route(
            "/posts/{id}/comments",
            get(handlers::list_comments).post(handlers::add_comment),
        )
        .route("/posts/{id}/comments/count", get(handlers::comment_count))
        .route("/comments/{id}", delete(handlers::delete_comment))
        .route(
            "/comments/{id}/likes",
            post(handlers::like_comment).delete(handlers::unlike_comment),
        )
        .route("/notifications", get(handlers::list_notifications))
        .route("/notifications/read", post(handlers::mark_all_read))
        .route("/notifications/{id}", post(handlers::retire_notification))
        .route(
            "/account",
            patch(handlers::update_profile).delete(handlers::delete_account),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), count_errors));

    Router::new()
        .merge(api)
        .route("/health", get(handlers::health))
        .route("/metrics", get(handlers::metrics))
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id()),
        )
        .with_state(state)
}

async fn count_errors(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let response = next.run(request).await;
    if let Some(kind) = response.extensions().get::<ErrorKind>() {
        state.metrics.record_error(*kind);
    }
    response
}
