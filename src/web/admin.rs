//! Superuser pages for user and subscriber management.

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use serde::Deserialize;
use std::sync::Arc;

use super::{AdminJson, WebAdmin, pages, service_error};
use crate::api::{ApiError, ApiResponse, AppState, MessageResponse, default_limit};
use crate::auth::Principal;
use crate::db::UserQuery;
use crate::services::UserUpdate;

#[derive(Debug, Deserialize)]
pub struct UsersPageQuery {
    #[serde(default)]
    pub search: String,
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

#[derive(Debug, Deserialize)]
pub struct SubscribersPageQuery {
    #[serde(default)]
    pub skip: u64,
    #[serde(default = "default_limit")]
    pub limit: u64,
}

/// Row edit from the users table. Unchecked boxes are simply absent.
#[derive(Debug, Deserialize)]
pub struct EditUserForm {
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub password: String,
    pub is_active: Option<String>,
    pub is_superuser: Option<String>,
}

impl From<EditUserForm> for UserUpdate {
    fn from(form: EditUserForm) -> Self {
        let full_name = form.full_name.trim().to_string();
        Self {
            username: Some(form.username),
            email: Some(form.email),
            full_name: Some(Some(full_name).filter(|n| !n.is_empty())),
            password: Some(form.password).filter(|p| !p.is_empty()),
            is_active: Some(form.is_active.is_some()),
            is_superuser: Some(form.is_superuser.is_some()),
        }
    }
}

async fn render_users(
    state: &AppState,
    principal: &Principal,
    search: &str,
    skip: u64,
    limit: u64,
    status: StatusCode,
    error: Option<&str>,
) -> Response {
    let query = UserQuery {
        skip,
        limit: limit.clamp(1, crate::api::MAX_PAGE_LIMIT),
        search: Some(search.trim().to_string()).filter(|s| !s.is_empty()),
        ..UserQuery::default()
    };

    match state.user_service.list(&query).await {
        Ok(page) => (
            status,
            pages::users(principal, &page.users, page.total, search, error),
        )
            .into_response(),
        Err(err) => service_error(err),
    }
}

/// `GET /users`
pub async fn users(
    State(state): State<Arc<AppState>>,
    WebAdmin(principal): WebAdmin,
    Query(query): Query<UsersPageQuery>,
) -> Response {
    render_users(
        &state,
        &principal,
        &query.search,
        query.skip,
        query.limit,
        StatusCode::OK,
        None,
    )
    .await
}

/// `POST /users/edit/{id}`
pub async fn edit_user(
    State(state): State<Arc<AppState>>,
    WebAdmin(principal): WebAdmin,
    Path(id): Path<i32>,
    Form(form): Form<EditUserForm>,
) -> Response {
    match state.user_service.update(&principal, id, form.into()).await {
        Ok(_) => Redirect::to("/users").into_response(),
        Err(err) => {
            let (status, message) = ApiError::from(err).status_and_message();
            if status.is_server_error() {
                return pages::error_page(status, &message);
            }
            render_users(
                &state,
                &principal,
                "",
                0,
                default_limit(),
                status,
                Some(&message),
            )
            .await
        }
    }
}

/// `DELETE /users/delete/{id}`
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    AdminJson(principal): AdminJson,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.user_service.delete(&principal, id).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "User deleted successfully",
    ))))
}

/// `GET /subscribers`
pub async fn subscribers(
    State(state): State<Arc<AppState>>,
    WebAdmin(principal): WebAdmin,
    Query(query): Query<SubscribersPageQuery>,
) -> Response {
    let limit = query.limit.clamp(1, crate::api::MAX_PAGE_LIMIT);

    let listed = state
        .subscription_service
        .list_active(query.skip, limit)
        .await;
    let counts = state.store.subscription_counts().await;

    match (listed, counts) {
        (Ok(subscribers), Ok((_, active))) => {
            pages::subscribers(&principal, &subscribers, active).into_response()
        }
        (Err(err), _) => service_error(err),
        (_, Err(err)) => service_error(err),
    }
}

/// `DELETE /subscribers/delete/{id}`
pub async fn delete_subscriber(
    State(state): State<Arc<AppState>>,
    AdminJson(principal): AdminJson,
    Path(id): Path<i32>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.subscription_service.delete(id).await?;
    tracing::info!(actor = principal.id, subscription_id = id, "Subscriber deleted");
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Subscriber deleted successfully",
    ))))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_form_checkboxes() {
        let update: UserUpdate = EditUserForm {
            username: "alice".into(),
            email: "alice@example.com".into(),
            full_name: " ".into(),
            password: String::new(),
            is_active: Some("on".into()),
            is_superuser: None,
        }
        .into();

        assert_eq!(update.is_active, Some(true));
        assert_eq!(update.is_superuser, Some(false));
        assert_eq!(update.full_name, Some(None));
        assert_eq!(update.password, None);
    }
}
