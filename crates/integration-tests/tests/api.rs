use api_adapters::http::{router, USER_HEADER};
use axum::body::{to_bytes, Body};
use axum::http::{Method, Request, StatusCode};
use axum::Router;
use domains::UserId;
use integration_tests::Harness;
use serde_json::{json, Value};
use tower::ServiceExt;

async fn send(
    app: &Router,
    method: Method,
    uri: &str,
    user: Option<UserId>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header(USER_HEADER, user.to_string());
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };
    (status, json)
}

async fn register(app: &Router, name: &str, is_private: bool) -> UserId {
    let (status, body) = send(
        app,
        Method::POST,
        "/users",
        None,
        Some(json!({ "username": name, "is_private": is_private })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    body["id"].as_str().unwrap().parse().unwrap()
}

#[tokio::test]
async fn test_missing_principal_is_unauthorized() {
    let app = router(Harness::new().app_state());
    let (status, body) = send(&app, Method::GET, "/notifications", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["message"].as_str().unwrap().contains("x-user-id"));
}

#[tokio::test]
async fn test_friend_request_flow_over_http() {
    let app = router(Harness::new().app_state());
    let x = register(&app, "xavier", false).await;
    let y = register(&app, "yolanda", false).await;

    let (status, request) = send(
        &app,
        Method::POST,
        "/relationships/requests",
        Some(x),
        Some(json!({ "to": y })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(request["status"], "pending");

    let (status, body) = send(
        &app,
        Method::POST,
        "/relationships/requests",
        Some(y),
        Some(json!({ "to": x })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "A friend request is already pending");

    let (status, incoming) = send(&app, Method::GET, "/relationships/requests", Some(y), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(incoming["items"].as_array().unwrap().len(), 1);

    let id = request["id"].as_str().unwrap();
    let (status, accepted) = send(
        &app,
        Method::POST,
        &format!("/relationships/requests/{id}/respond"),
        Some(y),
        Some(json!({ "accept": true })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(accepted["status"], "accepted");

    let (status, friends) = send(&app, Method::GET, &format!("/users/{x}/friends"), Some(y), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(friends["items"][0]["id"], json!(y));

    let (status, _) = send(
        &app,
        Method::DELETE,
        &format!("/relationships/friends/{x}"),
        Some(y),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_error_kinds_map_to_status_codes() {
    let app = router(Harness::new().app_state());
    let private = register(&app, "hermit", true).await;
    let visitor = register(&app, "visitor", false).await;

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/users/{private}/posts"),
        Some(visitor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        "/relationships/requests",
        Some(visitor),
        Some(json!({ "to": visitor })),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/users/{}/posts", UserId::new()),
        Some(visitor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        Method::GET,
        &format!("/users/{visitor}/posts?page=0"),
        Some(visitor),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_notification_retire_over_http() {
    let app = router(Harness::new().app_state());
    let author = register(&app, "author", false).await;
    let fan = register(&app, "fan", false).await;

    let (status, post) = send(
        &app,
        Method::POST,
        "/posts",
        Some(author),
        Some(json!({ "body": "hello" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let post_id = post["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/posts/{post_id}/likes"),
        Some(fan),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, inbox) = send(&app, Method::GET, "/notifications", Some(author), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(inbox["unread_count"], 1);
    assert_eq!(inbox["items"][0]["action"]["action_type"], "post_liked");
    let id = inbox["items"][0]["id"].as_str().unwrap().to_string();

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/notifications/{id}"),
        Some(fan),
        Some(json!({ "action": "delete" })),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, _) = send(
        &app,
        Method::POST,
        &format!("/notifications/{id}"),
        Some(author),
        Some(json!({ "action": "delete" })),
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn test_account_deletion_and_metrics() {
    let app = router(Harness::new().app_state());
    let user = register(&app, "leaving", false).await;
    send(
        &app,
        Method::POST,
        "/posts",
        Some(user),
        Some(json!({ "body": "bye" })),
    )
    .await;

    let (status, report) = send(&app, Method::DELETE, "/account", Some(user), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(report["posts_deleted"], 1);

    let (status, body) = send(&app, Method::DELETE, "/account", Some(user), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["step"], "delete_posts");

    let response = app
        .clone()
        .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let text = String::from_utf8(
        to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap()
            .to_vec(),
    )
    .unwrap();
    assert!(text.contains(r#"account_deletions_total{outcome="completed"} 1"#));
    assert!(text.contains(r#"account_deletions_total{outcome="failed"} 1"#));
    assert!(text.contains(r#"domain_errors_total{kind="not_found"} 1"#));
}

#[tokio::test]
async fn test_health() {
    let app = router(Harness::new().app_state());
    let response = app
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}
