use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

use super::validation::validate_limit;
use super::{
    ApiError, ApiResponse, AppState, CurrentUser, MessageResponse, PageQuery, SubscriptionDto,
};
use crate::auth::require_superuser;
use crate::db::SubscriptionInput;
use crate::services::SubscriptionError;

#[derive(Debug, Deserialize)]
pub struct SubscribeRequest {
    pub email: String,
    pub name: String,
    #[serde(default)]
    pub company: Option<String>,
    #[serde(default)]
    pub interests: Option<Vec<String>>,
}

impl From<SubscribeRequest> for SubscriptionInput {
    fn from(req: SubscribeRequest) -> Self {
        Self {
            email: req.email,
            name: req.name,
            company: req.company,
            interests: req.interests,
        }
    }
}

impl From<SubscriptionError> for ApiError {
    fn from(err: SubscriptionError) -> Self {
        match err {
            SubscriptionError::AlreadySubscribed => Self::Conflict(err.to_string()),
            SubscriptionError::NotFound => Self::NotFound(err.to_string()),
            SubscriptionError::Validation(msg) => Self::validation(msg),
            SubscriptionError::Database(msg) => Self::DatabaseError(msg),
            SubscriptionError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// `POST /api/v1/subscribe`
///
/// Public. A previously unsubscribed address is reactivated.
pub async fn subscribe(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<SubscribeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<SubscriptionDto>>), ApiError> {
    let subscription = state.subscription_service.subscribe(payload.into()).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success(subscription.into())),
    ))
}

/// `DELETE /api/v1/unsubscribe/{email}`
pub async fn unsubscribe(
    State(state): State<Arc<AppState>>,
    Path(email): Path<String>,
) -> Result<Json<ApiResponse<MessageResponse>>, ApiError> {
    state.subscription_service.unsubscribe(&email).await?;
    Ok(Json(ApiResponse::success(MessageResponse::new(
        "Successfully unsubscribed from newsletter",
    ))))
}

/// `GET /api/v1/subscriptions`
pub async fn list_subscriptions(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
    Query(page): Query<PageQuery>,
) -> Result<Json<ApiResponse<Vec<SubscriptionDto>>>, ApiError> {
    require_superuser(&principal)?;
    let limit = validate_limit(page.limit)?;

    let subscriptions = state
        .subscription_service
        .list_active(page.skip, limit)
        .await?;

    Ok(Json(ApiResponse::success(
        subscriptions.into_iter().map(SubscriptionDto::from).collect(),
    )))
}
