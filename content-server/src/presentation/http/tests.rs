use std::collections::HashMap;
use std::net::SocketAddr;

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::extract::ConnectInfo;
use axum::http::{Method, Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;

use crate::infrastructure::settings::Settings;
use crate::server::{build_app, build_state};

const SECRET: &str = "router-test-secret-0123456789abcdef";

async fn app_with(vars: &[(&str, &str)]) -> Router {
    let mut env: HashMap<String, String> = [
        ("DATABASE_DRIVER", "memory"),
        ("JWT_SECRET", SECRET),
        ("RATE_LIMIT_PER_SECOND", "100000"),
    ]
    .iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect();
    for (k, v) in vars {
        env.insert(k.to_string(), v.to_string());
    }

    let settings = Settings::from_lookup(|key| env.get(key).cloned()).expect("settings");
    let state = build_state(&settings).await.expect("state");
    build_app(state, &settings).expect("app")
}

async fn app() -> Router {
    app_with(&[]).await
}

fn request(method: Method, uri: &str, token: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request"),
        None => builder.body(Body::empty()).expect("request"),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.expect("router is infallible");
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("body must be readable");
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).expect("body must be json")
    };
    (status, body)
}

async fn sign_up(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        request(
            Method::POST,
            "/api/v1/auth/signup",
            None,
            Some(json!({ "email": email, "master_password": password })),
        ),
    )
    .await
}

async fn sign_in(app: &Router, email: &str, password: &str) -> (StatusCode, Value) {
    send(
        app,
        request(
            Method::POST,
            "/api/v1/auth/signin",
            None,
            Some(json!({ "email": email, "master_password": password })),
        ),
    )
    .await
}

/// Signs up a fresh user and returns `(access_token, refresh_token)`.
async fn tokens(app: &Router) -> (String, String) {
    let (status, _) = sign_up(app, "writer@example.com", "s3cret-pass").await;
    assert_eq!(status, StatusCode::CREATED);
    let (status, body) = sign_in(app, "writer@example.com", "s3cret-pass").await;
    assert_eq!(status, StatusCode::OK);
    (
        body["access_token"].as_str().expect("access").to_string(),
        body["refresh_token"].as_str().expect("refresh").to_string(),
    )
}

async fn create_post(app: &Router, token: &str, body: Value) -> Value {
    let (status, created) = send(app, request(Method::POST, "/api/v1/posts", Some(token), Some(body))).await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    created
}

#[tokio::test]
async fn healthz_carries_security_headers() {
    let app = app().await;
    let response = app
        .clone()
        .oneshot(request(Method::GET, "/healthz", None, None))
        .await
        .expect("router is infallible");

    assert_eq!(response.status(), StatusCode::OK);
    let headers = response.headers();
    assert_eq!(headers["x-frame-options"], "SAMEORIGIN");
    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");
    assert_eq!(headers["referrer-policy"], "no-referrer");
    assert_eq!(headers["x-permitted-cross-domain-policies"], "none");
    assert_eq!(headers["feature-policy"], "microphone 'none'; camera 'none'");
    assert!(headers.contains_key("strict-transport-security"));
    assert!(headers.contains_key("content-security-policy"));

    let bytes = to_bytes(response.into_body(), usize::MAX).await.expect("body");
    let body: Value = serde_json::from_slice(&bytes).expect("json");
    assert_eq!(body, json!({ "status": "ok" }));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let app = app().await;
    let (status, body) = send(&app, request(Method::GET, "/api-docs/openapi.json", None, None)).await;

    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/posts"].is_object());
}

#[tokio::test]
async fn sign_up_then_duplicate_is_conflict() {
    let app = app().await;

    let (status, body) = sign_up(&app, "new@example.com", "123456").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "user created successfully");

    let (status, body) = sign_up(&app, "NEW@example.com", "123456").await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn sign_up_rejects_bad_input() {
    let app = app().await;

    let (status, _) = sign_up(&app, "not-an-email", "123456").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = sign_up(&app, "a@b.com", "123").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = sign_up(&app, "", "").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let malformed = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/auth/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .expect("request");
    let (status, body) = send(&app, malformed).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn sign_in_does_not_reveal_which_part_was_wrong() {
    let app = app().await;
    sign_up(&app, "user@example.com", "right-password").await;

    let (wrong_status, wrong_body) = sign_in(&app, "user@example.com", "wrong-password").await;
    let (unknown_status, unknown_body) = sign_in(&app, "nobody@example.com", "right-password").await;

    assert_eq!(wrong_status, StatusCode::UNAUTHORIZED);
    assert_eq!(unknown_status, StatusCode::UNAUTHORIZED);
    assert_eq!(wrong_body, unknown_body);
    assert_eq!(wrong_body["error"], "invalid email or password");
}

#[tokio::test]
async fn sign_in_returns_full_token_details() {
    let app = app().await;
    sign_up(&app, "user@example.com", "right-password").await;

    let (status, body) = sign_in(&app, "  User@Example.com ", "right-password").await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["access_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert!(body["refresh_token"].as_str().is_some_and(|t| !t.is_empty()));
    assert_ne!(body["access_token"], body["refresh_token"]);
    let key = body["transmission_key"].as_str().expect("transmission key");
    assert_eq!(key.len(), 32);
    assert!(key.chars().all(|c| c.is_ascii_hexdigit()));
    assert!(body["access_token_expires_at"].is_string());
    assert!(body["refresh_token_expires_at"].is_string());
}

#[tokio::test]
async fn check_accepts_access_tokens_only() {
    let app = app().await;
    let (access, refresh) = tokens(&app).await;

    let (status, body) = send(&app, request(Method::POST, "/api/v1/auth/check", Some(&access), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": true, "email": "writer@example.com" }));

    let (status, _) = send(&app, request(Method::POST, "/api/v1/auth/check", Some(&refresh), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request(Method::POST, "/api/v1/auth/check", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request(Method::POST, "/api/v1/auth/check", Some("garbage"), None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn refresh_mints_a_new_pair_from_a_refresh_token() {
    let app = app().await;
    let (access, refresh) = tokens(&app).await;

    let (status, body) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": refresh })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let new_access = body["access_token"].as_str().expect("access");
    assert_ne!(new_access, access);
    assert_ne!(body["refresh_token"].as_str().expect("refresh"), refresh);

    let (status, _) = send(&app, request(Method::POST, "/api/v1/auth/check", Some(new_access), None)).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": access })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(
        &app,
        request(
            Method::POST,
            "/api/v1/auth/refresh",
            None,
            Some(json!({ "refresh_token": "" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn writes_require_a_bearer_token() {
    let app = app().await;
    let body = json!({ "name": "Hello", "description": "World" });

    let (status, _) = send(&app, request(Method::POST, "/api/v1/posts", None, Some(body.clone()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request(Method::PUT, "/api/v1/posts/1", None, Some(body))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, request(Method::DELETE, "/api/v1/posts/1", None, None)).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn post_lifecycle() {
    let app = app().await;
    let (access, _) = tokens(&app).await;

    let created = create_post(
        &app,
        &access,
        json!({
            "name": "Hello",
            "description": "World",
            "tags": [{ "name": "rust", "description": "lang" }, { "name": "axum" }]
        }),
    )
    .await;
    let id = created["id"].as_i64().expect("id");
    assert_eq!(created["tags"].as_array().map(Vec::len), Some(2));

    let (status, fetched) = send(&app, request(Method::GET, &format!("/api/v1/posts/{id}"), None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["name"], "Hello");
    assert_eq!(fetched["tags"][0]["post_id"], id);

    let (status, updated) = send(
        &app,
        request(
            Method::PUT,
            &format!("/api/v1/posts/{id}"),
            Some(&access),
            Some(json!({ "name": "Bye", "description": "Moon", "tags": [{ "name": "new" }] })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["name"], "Bye");
    assert_eq!(updated["tags"].as_array().map(Vec::len), Some(1));

    let (status, body) = send(&app, request(Method::DELETE, &format!("/api/v1/posts/{id}"), Some(&access), None)).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, _) = send(&app, request(Method::GET, &format!("/api/v1/posts/{id}"), None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(&app, request(Method::DELETE, &format!("/api/v1/posts/{id}"), Some(&access), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn post_input_errors() {
    let app = app().await;
    let (access, _) = tokens(&app).await;

    let (status, _) = send(&app, request(Method::GET, "/api/v1/posts/abc", None, None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(&app, request(Method::GET, "/api/v1/posts/999", None, None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = send(
        &app,
        request(Method::POST, "/api/v1/posts", Some(&access), Some(json!({ "name": "   " }))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) = send(
        &app,
        request(
            Method::PUT,
            "/api/v1/posts/999",
            Some(&access),
            Some(json!({ "name": "x" })),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn listing_paginates_sorts_and_counts() {
    let app = app().await;
    let (access, _) = tokens(&app).await;
    for (name, description) in [
        ("Hello", "World"),
        ("Shell tricks", ""),
        ("Other", "nothing here"),
        ("Zebra", "says HELLO"),
    ] {
        create_post(&app, &access, json!({ "name": name, "description": description })).await;
    }

    let (status, body) = send(&app, request(Method::GET, "/api/v1/posts", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .expect("data")
        .iter()
        .filter_map(|post| post["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![4, 3, 2, 1]);
    assert_eq!(body["total_data"], 4);
    assert_eq!(body["filtered_data"], 4);

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/posts?Search=hell&Sort=name&Order=asc&Limit=2&Offset=1",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let names: Vec<&str> = body["data"]
        .as_array()
        .expect("data")
        .iter()
        .filter_map(|post| post["name"].as_str())
        .collect();
    assert_eq!(names, vec!["Shell tricks", "Zebra"]);
    assert_eq!(body["total_data"], 4);
    assert_eq!(body["filtered_data"], 3);
}

#[tokio::test]
async fn listing_falls_back_on_garbage_parameters() {
    let app = app().await;
    let (access, _) = tokens(&app).await;
    for name in ["a", "b", "c"] {
        create_post(&app, &access, json!({ "name": name })).await;
    }

    let (status, body) = send(
        &app,
        request(
            Method::GET,
            "/api/v1/posts?Limit=abc&Offset=-5&Sort=password&Order=sideways",
            None,
            None,
        ),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .expect("data")
        .iter()
        .filter_map(|post| post["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![3, 2, 1]);

    let (status, body) = send(&app, request(Method::GET, "/api/v1/posts?Search=%25", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["filtered_data"], 0);
    assert_eq!(body["total_data"], 3);
}

#[tokio::test]
async fn requests_beyond_the_budget_are_throttled() {
    let app = app_with(&[("RATE_LIMIT_PER_SECOND", "2")]).await;

    let mut statuses = Vec::new();
    for _ in 0..5 {
        let (status, _) = send(&app, request(Method::GET, "/healthz", None, None)).await;
        statuses.push(status);
    }

    assert!(statuses.contains(&StatusCode::TOO_MANY_REQUESTS));
    assert!(statuses.iter().filter(|s| **s == StatusCode::OK).count() <= 4);
}

fn from_peer(peer: &str, mut req: Request<Body>) -> Request<Body> {
    let addr: SocketAddr = peer.parse().expect("socket address");
    req.extensions_mut().insert(ConnectInfo(addr));
    req
}

#[tokio::test]
async fn each_client_address_gets_its_own_budget() {
    let app = app_with(&[("RATE_LIMIT_PER_SECOND", "1")]).await;
    let get = || request(Method::GET, "/healthz", None, None);

    // fresh addresses on retry in case a pair straddles a window boundary
    for attempt in 0..2 {
        let (first, _) = send(&app, from_peer(&format!("10.0.{attempt}.1:4000"), get())).await;
        let (second, _) = send(&app, from_peer(&format!("10.0.{attempt}.1:4001"), get())).await;
        let (other, _) = send(&app, from_peer(&format!("10.0.{attempt}.2:4000"), get())).await;
        if second == StatusCode::TOO_MANY_REQUESTS {
            assert_eq!(first, StatusCode::OK);
            assert_eq!(other, StatusCode::OK);
            return;
        }
    }
    panic!("second request from the same address was never throttled");
}
