use axum::{
    Form,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{MaybeWebUser, WebUser, pages, service_error};
use crate::api::AppState;
use crate::services::AuthError;

#[derive(Debug, Deserialize)]
pub struct ProfileForm {
    #[serde(default)]
    pub full_name: String,
}

#[derive(Debug, Deserialize)]
pub struct PasswordForm {
    pub current_password: String,
    pub new_password: String,
    pub confirm_password: String,
}

/// `GET /`
pub async fn home(MaybeWebUser(principal): MaybeWebUser) -> Html<String> {
    pages::home(principal.as_ref())
}

/// `GET /dashboard`
pub async fn dashboard(
    State(state): State<Arc<AppState>>,
    WebUser(principal): WebUser,
) -> Response {
    match state.user_service.get(&principal, principal.id).await {
        Ok(user) => pages::dashboard(&principal, &user).into_response(),
        Err(err) => service_error(err),
    }
}

/// `GET /profile`
pub async fn profile(
    State(state): State<Arc<AppState>>,
    WebUser(principal): WebUser,
) -> Response {
    match state.user_service.get(&principal, principal.id).await {
        Ok(user) => pages::profile(&principal, &user, None, None).into_response(),
        Err(err) => service_error(err),
    }
}

/// `POST /profile/update`
pub async fn update_profile(
    State(state): State<Arc<AppState>>,
    WebUser(principal): WebUser,
    Form(form): Form<ProfileForm>,
) -> Response {
    let full_name = Some(form.full_name.trim().to_string()).filter(|n| !n.is_empty());

    match state.auth_service.update_profile(principal.id, full_name).await {
        Ok(user) => {
            pages::profile(&principal, &user, Some("Profile updated successfully"), None)
                .into_response()
        }
        Err(err) => service_error(err),
    }
}

/// `POST /profile/password`
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    WebUser(principal): WebUser,
    Form(form): Form<PasswordForm>,
) -> Response {
    let outcome = if form.new_password == form.confirm_password {
        state
            .auth_service
            .change_password(principal.id, &form.current_password, &form.new_password)
            .await
    } else {
        Err(AuthError::Validation("New passwords do not match".to_string()))
    };

    let (status, message, error) = match outcome {
        Ok(()) => {
            tracing::info!(user_id = principal.id, "Password changed");
            (StatusCode::OK, Some("Password changed successfully"), None)
        }
        Err(AuthError::Validation(msg)) => (StatusCode::BAD_REQUEST, None, Some(msg)),
        Err(err @ AuthError::IncorrectPassword) => {
            (StatusCode::BAD_REQUEST, None, Some(err.to_string()))
        }
        Err(err) => return service_error(err),
    };

    match state.user_service.get(&principal, principal.id).await {
        Ok(user) => (
            status,
            pages::profile(&principal, &user, message, error.as_deref()),
        )
            .into_response(),
        Err(err) => service_error(err),
    }
}

/// `GET /server-stats`
pub async fn server_stats(
    State(state): State<Arc<AppState>>,
    WebUser(principal): WebUser,
) -> Response {
    match state.stats_service.server_stats().await {
        Ok(stats) => pages::server_stats(&principal, &stats.into()).into_response(),
        Err(err) => service_error(err),
    }
}
