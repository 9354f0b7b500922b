#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{Request, Response, header},
};
use faststack::api::AppState;
use faststack::config::{Config, RateLimitRule};
use http_body_util::BodyExt;
use std::sync::Arc;
use tower::ServiceExt;

pub const ROOT_PASSWORD: &str = "root-password-123";

/// Fast hashing, relaxed limits, plain-HTTP cookies and a fresh database.
pub fn test_config() -> Config {
    let db_path =
        std::env::temp_dir().join(format!("faststack-test-{}.db", uuid::Uuid::new_v4()));

    let mut config = Config::default();
    config.general.database_path = format!("sqlite:{}", db_path.display());
    config.security.secret_key = "integration-test-secret".to_string();
    config.security.root_password = Some(ROOT_PASSWORD.to_string());
    config.security.argon2_memory_cost_kib = 1024;
    config.security.argon2_time_cost = 1;
    config.server.secure_cookies = false;
    config.rate_limits.login = RateLimitRule::per_minute(100);
    config.rate_limits.register = RateLimitRule::per_minute(100);
    config.rate_limits.password_change = RateLimitRule::per_minute(100);
    config.rate_limits.subscribe = RateLimitRule::per_minute(100);
    config
}

pub async fn spawn_app_with(config: Config) -> (Router, Arc<AppState>) {
    let state = faststack::api::create_app_state_from_config(config, None)
        .await
        .expect("Failed to create app state");
    (faststack::api::router(state.clone()), state)
}

pub async fn spawn_app() -> (Router, Arc<AppState>) {
    spawn_app_with(test_config()).await
}

pub async fn send(app: &Router, request: Request<Body>) -> Response<Body> {
    app.clone().oneshot(request).await.unwrap()
}

pub async fn body_string(response: Response<Body>) -> String {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    String::from_utf8(bytes.to_vec()).unwrap()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn form_post(uri: &str, body: &str) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/x-www-form-urlencoded")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn json_request(
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: &serde_json::Value,
) -> Request<Body> {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

pub fn bearer_request(method: &str, uri: &str, token: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::AUTHORIZATION, format!("Bearer {token}"))
        .body(Body::empty())
        .unwrap()
}

pub fn cookie_request(method: &str, uri: &str, cookie: &str) -> Request<Body> {
    Request::builder()
        .method(method)
        .uri(uri)
        .header(header::COOKIE, cookie)
        .body(Body::empty())
        .unwrap()
}

/// Logs in over the JSON API and returns the bearer token.
pub async fn api_login(app: &Router, username: &str, password: &str) -> String {
    let response = send(
        app,
        form_post(
            "/api/v1/auth/login",
            &format!("username={username}&password={password}"),
        ),
    )
    .await;
    assert_eq!(response.status(), 200, "login failed for {username}");
    let body = body_json(response).await;
    body["data"]["access_token"].as_str().unwrap().to_string()
}

/// Registers a regular user and returns its id.
pub async fn api_register(app: &Router, username: &str, password: &str) -> i64 {
    let response = send(
        app,
        json_request(
            "POST",
            "/api/v1/auth/register",
            None,
            &serde_json::json!({
                "username": username,
                "email": format!("{username}@example.com"),
                "password": password,
            }),
        ),
    )
    .await;
    assert_eq!(response.status(), 201, "register failed for {username}");
    body_json(response).await["data"]["id"].as_i64().unwrap()
}

/// Logs in through the web form and returns the `name=value` cookie pair.
pub async fn web_login(app: &Router, username: &str, password: &str) -> String {
    let response = send(
        app,
        form_post("/login", &format!("username={username}&password={password}")),
    )
    .await;
    assert_eq!(response.status(), 303, "web login failed for {username}");
    session_cookie(&response).expect("login did not set a cookie")
}

pub fn session_cookie(response: &Response<Body>) -> Option<String> {
    response
        .headers()
        .get(header::SET_COOKIE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(ToString::to_string)
}
