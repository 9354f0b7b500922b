use axum::{
    extract::{MatchedPath, Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::Response,
};
use std::sync::Arc;
use std::time::Instant;
use tracing::{Instrument, info, info_span};
use uuid::Uuid;

use crate::api::{ApiError, AppState, CurrentUser};
use crate::auth::{BearerCarrier, CookieCarrier, TokenCarrier, require_superuser};

/// `GET /api/v1/metrics`, Prometheus text format. Superuser only.
pub async fn get_metrics(
    State(state): State<Arc<AppState>>,
    CurrentUser(principal): CurrentUser,
) -> Result<String, ApiError> {
    require_superuser(&principal)?;
    Ok(state.prometheus_handle.as_ref().map_or_else(
        || "Metrics not enabled or failed to initialize".to_string(),
        metrics_exporter_prometheus::PrometheusHandle::render,
    ))
}

/// Which credential a request presented, before any validation.
fn presented_carrier(headers: &HeaderMap, cookie: &CookieCarrier) -> &'static str {
    if BearerCarrier.extract(headers).is_some() {
        BearerCarrier.name()
    } else if cookie.extract(headers).is_some() {
        cookie.name()
    } else {
        "anonymous"
    }
}

/// How a request ended, from the auth layer's point of view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    Success,
    /// 401, or a page bounced to `/login`.
    Unauthenticated,
    Forbidden,
    RateLimited,
    ClientError,
    ServerError,
}

impl RequestOutcome {
    #[must_use]
    pub fn classify(response: &Response) -> Self {
        let status = response.status();
        match status {
            StatusCode::UNAUTHORIZED => Self::Unauthenticated,
            StatusCode::FORBIDDEN => Self::Forbidden,
            StatusCode::TOO_MANY_REQUESTS => Self::RateLimited,
            StatusCode::SEE_OTHER if redirects_to_login(response.headers()) => {
                Self::Unauthenticated
            }
            s if s.is_server_error() => Self::ServerError,
            s if s.is_client_error() => Self::ClientError,
            _ => Self::Success,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Unauthenticated => "unauthenticated",
            Self::Forbidden => "forbidden",
            Self::RateLimited => "rate_limited",
            Self::ClientError => "client_error",
            Self::ServerError => "server_error",
        }
    }

    const fn is_auth_denial(self) -> bool {
        matches!(self, Self::Unauthenticated | Self::Forbidden)
    }
}

fn redirects_to_login(headers: &HeaderMap) -> bool {
    headers
        .get(header::LOCATION)
        .is_some_and(|location| location == "/login")
}

/// Request span plus one summary event per request. `user_id` and
/// `superuser` are filled in by the auth extractors when a principal resolves.
pub async fn logging_middleware(
    State(cookie): State<CookieCarrier>,
    req: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let request_id = Uuid::new_v4();

    let method = req.method().to_string();
    let path = req.uri().path().to_string();
    let route = req
        .extensions()
        .get::<MatchedPath>()
        .map(|mp| mp.as_str().to_string());
    let carrier = presented_carrier(req.headers(), &cookie);

    let span = info_span!(
        "request",
        request_id = %request_id,
        method = %method,
        path = %path,
        route = route.as_deref(),
        carrier,
        user_id = tracing::field::Empty,
        superuser = tracing::field::Empty,
    );

    async move {
        let response = next.run(req).await;

        let elapsed = start.elapsed();
        let status = response.status().as_u16();
        let outcome = RequestOutcome::classify(&response);

        // Unmatched paths would blow up label cardinality.
        let route_label = route.unwrap_or_else(|| "unmatched".to_string());
        let labels = [
            ("method", method),
            ("route", route_label),
            ("status", status.to_string()),
            ("outcome", outcome.as_str().to_string()),
        ];
        metrics::counter!("http_requests_total", &labels).increment(1);
        metrics::histogram!("http_request_duration_seconds", &labels)
            .record(elapsed.as_secs_f64());

        if outcome.is_auth_denial() {
            metrics::counter!(
                "auth_denied_total",
                "outcome" => outcome.as_str(),
                "carrier" => carrier
            )
            .increment(1);
        }

        info!(
            event = "http_request_finished",
            duration_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            status_code = status,
            outcome = outcome.as_str(),
            "Request finished"
        );

        response
    }
    .instrument(span)
    .await
}

const SECURITY_HEADERS: [(&str, &str); 4] = [
    ("x-content-type-options", "nosniff"),
    ("x-frame-options", "DENY"),
    ("referrer-policy", "strict-origin-when-cross-origin"),
    (
        "content-security-policy",
        "default-src 'self'; script-src 'self'; style-src 'self' 'unsafe-inline'; form-action 'self'; frame-ancestors 'none'; base-uri 'self'",
    ),
];

/// Hardening headers on every response. Anything answered to a request that
/// carried credentials is also marked uncacheable, unless the handler chose
/// its own caching.
pub async fn security_headers_middleware(req: Request, next: Next) -> Response {
    let credentialed =
        req.headers().contains_key(header::AUTHORIZATION) || req.headers().contains_key(header::COOKIE);

    let mut response = next.run(req).await;
    let headers = response.headers_mut();

    for (name, value) in SECURITY_HEADERS {
        headers.insert(name, HeaderValue::from_static(value));
    }
    if credentialed && !headers.contains_key(header::CACHE_CONTROL) {
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    }

    response
}
