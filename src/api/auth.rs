use axum::{
    Form, Json,
    extract::State,
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, CurrentUser, MessageResponse, TokenResponse, UserDto};
use crate::services::{AuthError, Registration};

#[derive(Debug, Deserialize)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    pub password: String,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::InvalidCredentials | AuthError::AccountInactive => {
                Self::Unauthorized(err.to_string())
            }
            AuthError::UsernameTaken | AuthError::EmailTaken => Self::Conflict(err.to_string()),
            AuthError::IncorrectPassword => Self::validation(err.to_string()),
            AuthError::UserNotFound => Self::NotFound(err.to_string()),
            AuthError::Validation(msg) => Self::validation(msg),
            AuthError::Database(msg) => Self::DatabaseError(msg),
            AuthError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// `POST /api/v1/auth/login`
///
/// Form-encoded `username`/`password`, answered with a bearer token.
pub async fn login(
    State(state): State<Arc<AppState>>,
    Form(form): Form<LoginForm>,
) -> Result<Json<ApiResponse<TokenResponse>>, ApiError> {
    if form.username.is_empty() || form.password.is_empty() {
        return Err(ApiError::validation("Username and password are required"));
    }

    let result = state
        .auth_service
        .login(&form.username, &form.password)
        .await?;

    tracing::info!(user_id = result.user.id, "API login");

    Ok(Json(ApiResponse::success(TokenResponse {
        access_token: result.token.token,
        token_type: "bearer",
        expires_in: state.resolver.tokens().ttl().num_seconds(),
    })))
}

/// `POST /api/v1/auth/register`
pub async fn register(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<UserDto>>), ApiError> {
    let user = state
        .auth_service
        .register(Registration {
            username: payload.username,
            email: payload.email,
            full_name: payload.full_name,
            password: payload.password,
        })
        .await?;

    Ok((StatusCode::CREATED, Json(ApiResponse::success(user.into()))))
}

/// `GET /api/v1/auth/me`
pub async fn me(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let user = state.user_service.get(&principal, principal.id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// `POST /api/v1/auth/password`
pub async fn change_password(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Json(payload): Json<ChangePasswordRequest>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state
        .auth_service
        .change_password(
            principal.id,
            &payload.current_password,
            &payload.new_password,
        )
        .await?;

    tracing::info!(user_id = principal.id, "Password changed");

    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Password updated successfully",
    ))))
}
