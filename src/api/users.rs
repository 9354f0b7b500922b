use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::{validate_id, validate_limit, validate_search_query, validate_sort_order};
use super::{
    ApiError, ApiResponse, AppState, CurrentUser, MessageResponse, UserDto, UserListResponse,
    default_limit,
};
use crate::auth::require_superuser;
use crate::db::{UserQuery, UserSort};
use crate::services::{UserError, UserUpdate};

#[derive(Debug, Deserialize)]
pub struct UserListQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
    pub search: Option<String>,
    pub sort_by: Option<String>,
    pub sort_order: Option<String>,
}

/// Admin edit body. An empty `full_name` clears it.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateUserRequest {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

impl From<UpdateUserRequest> for UserUpdate {
    fn from(req: UpdateUserRequest) -> Self {
        Self {
            username: req.username,
            email: req.email,
            full_name: req
                .full_name
                .map(|name| Some(name).filter(|n| !n.trim().is_empty())),
            password: req.password,
            is_active: req.is_active,
            is_superuser: req.is_superuser,
        }
    }
}

impl From<UserError> for ApiError {
    fn from(err: UserError) -> Self {
        match err {
            UserError::NotFound => Self::NotFound(err.to_string()),
            UserError::Forbidden(msg) => Self::Forbidden(msg),
            UserError::UsernameTaken | UserError::EmailTaken => Self::Conflict(err.to_string()),
            UserError::Validation(msg) => Self::validation(msg),
            UserError::Database(msg) => Self::DatabaseError(msg),
            UserError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// `GET /api/v1/users`
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Query(params): Query<UserListQuery>,
) -> Result<Json<ApiResponse<UserListResponse>>, ApiError> {
    require_superuser(&principal)?;
    let limit = validate_limit(params.limit)?;

    let query = UserQuery {
        skip: params.skip,
        limit,
        search: validate_search_query(params.search.as_deref()),
        sort: params
            .sort_by
            .as_deref()
            .map(UserSort::parse)
            .unwrap_or_default(),
        descending: validate_sort_order(params.sort_order.as_deref())?,
    };

    let page = state.user_service.list(&query).await?;

    Ok(Json(ApiResponse::success(UserListResponse {
        users: page.users.into_iter().map(UserDto::from).collect(),
        total: page.total,
        skip: params.skip,
        limit,
    })))
}

/// `GET /api/v1/users/{id}`
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let id = validate_id("User", id)?;
    let user = state.user_service.get(&principal, id).await?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// `PUT /api/v1/users/{id}`
pub async fn update_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateUserRequest>,
) -> Result<Json<ApiResponse<UserDto>>, ApiError> {
    let id = validate_id("User", id)?;
    let user = state
        .user_service
        .update(&principal, id, payload.into())
        .await?;
    Ok(Json(ApiResponse::success(user.into())))
}

/// `DELETE /api/v1/users/{id}`
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    let id = validate_id("User", id)?;
    state.user_service.delete(&principal, id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User deleted successfully",
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_request_blank_full_name_clears() {
        let update: UserUpdate = UpdateUserRequest {
            full_name: Some("  ".into()),
            ..UpdateUserRequest::default()
        }
        .into();
        assert_eq!(update.full_name, Some(None));

        let update: UserUpdate = UpdateUserRequest {
            full_name: Some("Ada".into()),
            ..UpdateUserRequest::default()
        }
        .into();
        assert_eq!(update.full_name, Some(Some("Ada".into())));

        let update: UserUpdate = UpdateUserRequest::default().into();
        assert_eq!(update.full_name, None);
    }
}
