use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use std::sync::Arc;

use super::{MaybeWebUser, pages, service_error};
use crate::api::AppState;
use crate::services::{AuthError, Registration};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    pub password: String,
    pub confirm_password: String,
}

/// `HttpOnly` cookie carrying the access token; expires with the token.
fn session_cookie(state: &AppState, token: String) -> Cookie<'static> {
    let max_age = state.resolver.tokens().ttl().num_seconds();
    Cookie::build((state.cookie.cookie_name().to_string(), token))
        .http_only(true)
        .same_site(SameSite::Lax)
        .path("/")
        .max_age(time::Duration::seconds(max_age))
        .secure(state.config.server.secure_cookies)
        .build()
}

fn expired_cookie(state: &AppState) -> Cookie<'static> {
    Cookie::build((state.cookie.cookie_name().to_string(), ""))
        .path("/")
        .build()
}

fn signed_in(state: &AppState, jar: CookieJar, token: String) -> Response {
    (jar.add(session_cookie(state, token)), Redirect::to("/dashboard")).into_response()
}

/// `GET /login`
pub async fn login_page(MaybeWebUser(principal): MaybeWebUser) -> Response {
    if principal.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    pages::login(None, "").into_response()
}

/// `POST /login`
pub async fn login_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<LoginForm>,
) -> Response {
    match state.auth_service.login(&form.username, &form.password).await {
        Ok(result) => {
            tracing::info!(user_id = result.user.id, "Web login");
            signed_in(&state, jar, result.token.token)
        }
        Err(err @ (AuthError::InvalidCredentials | AuthError::AccountInactive)) => (
            StatusCode::UNAUTHORIZED,
            pages::login(Some(&err.to_string()), &form.username),
        )
            .into_response(),
        Err(err) => service_error(err),
    }
}

/// `GET /register`
pub async fn register_page(MaybeWebUser(principal): MaybeWebUser) -> Response {
    if principal.is_some() {
        return Redirect::to("/dashboard").into_response();
    }
    pages::register(None, "", "", "").into_response()
}

/// `POST /register`. Signs the new account in straight away.
pub async fn register_submit(
    State(state): State<Arc<AppState>>,
    jar: CookieJar,
    Form(form): Form<RegisterForm>,
) -> Response {
    let rerender = |status: StatusCode, message: &str| {
        (
            status,
            pages::register(Some(message), &form.username, &form.email, &form.full_name),
        )
            .into_response()
    };

    if form.password != form.confirm_password {
        return rerender(StatusCode::BAD_REQUEST, "Passwords do not match");
    }

    let full_name = Some(form.full_name.trim().to_string()).filter(|n| !n.is_empty());
    let registration = Registration {
        username: form.username.clone(),
        email: form.email.clone(),
        full_name,
        password: form.password.clone(),
    };

    let user = match state.auth_service.register(registration).await {
        Ok(user) => user,
        Err(err @ (AuthError::UsernameTaken | AuthError::EmailTaken)) => {
            return rerender(StatusCode::CONFLICT, &err.to_string());
        }
        Err(AuthError::Validation(msg)) => return rerender(StatusCode::BAD_REQUEST, &msg),
        Err(err) => return service_error(err),
    };

    match state.auth_service.issue_token(user.id) {
        Ok(token) => {
            tracing::info!(user_id = user.id, "Web registration");
            signed_in(&state, jar, token.token)
        }
        Err(err) => service_error(err),
    }
}

/// `GET /logout`. The token itself stays valid until it expires.
pub async fn logout(State(state): State<Arc<AppState>>, jar: CookieJar) -> Response {
    (jar.remove(expired_cookie(&state)), Redirect::to("/")).into_response()
}
