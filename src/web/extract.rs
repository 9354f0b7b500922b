//! Principals for the cookie-authenticated pages.

use axum::{
    extract::FromRequestParts,
    http::{StatusCode, request::Parts},
    response::{IntoResponse, Redirect, Response},
};
use std::sync::Arc;

use super::pages;
use crate::api::{ApiError, AppState};
use crate::auth::{AuthFailure, Principal, require_superuser};

async fn resolve_cookie(
    parts: &Parts,
    state: &Arc<AppState>,
) -> Result<Principal, AuthFailure> {
    let principal = state.resolver.resolve(&state.cookie, &parts.headers).await?;
    principal.record_in_span();
    Ok(principal)
}

fn lookup_failed(msg: &str) -> Response {
    tracing::error!("Session lookup failed: {msg}");
    pages::error_page(
        StatusCode::INTERNAL_SERVER_ERROR,
        "An internal error occurred",
    )
}

/// Signed-in user. Anyone else is sent to `/login`.
#[derive(Debug, Clone)]
pub struct WebUser(pub Principal);

impl FromRequestParts<Arc<AppState>> for WebUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match resolve_cookie(parts, state).await {
            Ok(principal) => Ok(Self(principal)),
            Err(AuthFailure::Lookup(msg)) => Err(lookup_failed(&msg)),
            Err(_) => Err(Redirect::to("/login").into_response()),
        }
    }
}

/// Signed-in user, if any. Used by pages that render either way.
#[derive(Debug, Clone)]
pub struct MaybeWebUser(pub Option<Principal>);

impl FromRequestParts<Arc<AppState>> for MaybeWebUser {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        match state
            .resolver
            .resolve_optional(&state.cookie, &parts.headers)
            .await
        {
            Ok(principal) => {
                if let Some(principal) = &principal {
                    principal.record_in_span();
                }
                Ok(Self(principal))
            }
            Err(err) => Err(lookup_failed(&err.to_string())),
        }
    }
}

/// Superuser for admin pages. Regular users land back on `/dashboard`.
#[derive(Debug, Clone)]
pub struct WebAdmin(pub Principal);

impl FromRequestParts<Arc<AppState>> for WebAdmin {
    type Rejection = Response;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let WebUser(principal) = WebUser::from_request_parts(parts, state).await?;
        if require_superuser(&principal).is_err() {
            return Err(Redirect::to("/dashboard").into_response());
        }
        Ok(Self(principal))
    }
}

/// Superuser for the script-driven admin endpoints, which answer JSON
/// 401/403 instead of redirecting.
#[derive(Debug, Clone)]
pub struct AdminJson(pub Principal);

impl FromRequestParts<Arc<AppState>> for AdminJson {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let principal = resolve_cookie(parts, state).await?;
        require_superuser(&principal)?;
        Ok(Self(principal))
    }
}
