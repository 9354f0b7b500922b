//! Host and process statistics for signed-in users.

use axum::{Json, extract::State};
use std::sync::Arc;

use super::{ApiError, ApiResponse, AppState, CurrentUser};
use crate::auth::require_superuser;
use crate::services::{ServerStats, ServerStatsFormatted, StatsError, SystemStats};

impl From<StatsError> for ApiError {
    fn from(err: StatsError) -> Self {
        match err {
            StatsError::Database(msg) => Self::DatabaseError(msg),
            StatsError::Internal(msg) => Self::internal(msg),
        }
    }
}

/// `GET /api/v1/server-stats`
pub async fn server_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(_principal): CurrentUser,
) -> Result<Json<ApiResponse<ServerStats>>, ApiError> {
    let stats = state.stats_service.server_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}

/// `GET /api/v1/server-stats/formatted`
///
/// Same numbers, plus human-readable byte and uptime strings.
pub async fn server_stats_formatted(
    State(state): State<Arc<AppState>>,
    CurrentUser(_principal): CurrentUser,
) -> Result<Json<ApiResponse<ServerStatsFormatted>>, ApiError> {
    let stats = state.stats_service.server_stats().await?;
    Ok(Json(ApiResponse::success(stats.into())))
}

/// `GET /api/v1/system/stats`
pub async fn system_stats(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
) -> Result<Json<ApiResponse<SystemStats>>, ApiError> {
    require_superuser(&principal)?;
    let stats = state.stats_service.system_stats().await?;
    Ok(Json(ApiResponse::success(stats)))
}
