//! Server-rendered pages authenticated by the access-token cookie.

use axum::{
    Router, middleware,
    response::Response,
    routing::{delete, get, post},
};
use std::sync::Arc;

use crate::api::{ApiError, AppState, RateLimitPolicy, Transport, enforce_rate_limit};

mod account;
mod admin;
mod assets;
mod auth;
mod extract;
pub mod pages;

pub use extract::{AdminJson, MaybeWebUser, WebAdmin, WebUser};

/// Renders a service failure as an error page.
fn service_error(err: impl Into<ApiError>) -> Response {
    let (status, message) = err.into().status_and_message();
    pages::error_page(status, &message)
}

pub fn router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let rules = &state.config.rate_limits;
    let limited = |route: &'static str, rule| {
        middleware::from_fn_with_state(
            RateLimitPolicy::new(state, route, rule, Transport::Web),
            enforce_rate_limit,
        )
    };

    Router::new()
        .route("/", get(account::home))
        .route(
            "/login",
            post(auth::login_submit)
                .layer(limited("login", rules.login))
                .get(auth::login_page),
        )
        .route(
            "/register",
            post(auth::register_submit)
                .layer(limited("register", rules.register))
                .get(auth::register_page),
        )
        .route("/logout", get(auth::logout))
        .route("/dashboard", get(account::dashboard))
        .route("/profile", get(account::profile))
        .route("/profile/update", post(account::update_profile))
        .route(
            "/profile/password",
            post(account::change_password)
                .layer(limited("password_change", rules.password_change)),
        )
        .route("/server-stats", get(account::server_stats))
        .route("/users", get(admin::users))
        .route("/users/edit/{id}", post(admin::edit_user))
        .route("/users/delete/{id}", delete(admin::delete_user))
        .route("/subscribers", get(admin::subscribers))
        .route("/subscribers/delete/{id}", delete(admin::delete_subscriber))
        .route("/assets/admin.js", get(assets::admin_script))
}
