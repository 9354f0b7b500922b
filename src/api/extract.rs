use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::auth::Principal;

/// The caller resolved from `Authorization: Bearer`. Rejects with 401.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Principal);

impl FromRequestParts<Arc<AppState>> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let principal = state.resolver.resolve(&state.bearer, &parts.headers).await?;
        principal.record_in_span();
        Ok(Self(principal))
    }
}
