use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::net::SocketAddr;
use std::sync::Arc;

use super::{ApiError, AppState};
use crate::auth::{RateDecision, client_key};
use crate::config::RateLimitRule;

/// How a denial is rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transport {
    Api,
    Web,
}

/// Middleware state for one rate-limited route.
#[derive(Clone)]
pub struct RateLimitPolicy {
    state: Arc<AppState>,
    route: &'static str,
    rule: RateLimitRule,
    transport: Transport,
}

impl RateLimitPolicy {
    pub fn new(
        state: &Arc<AppState>,
        route: &'static str,
        rule: RateLimitRule,
        transport: Transport,
    ) -> Self {
        Self {
            state: state.clone(),
            route,
            rule,
            transport,
        }
    }
}

pub async fn enforce_rate_limit(
    State(policy): State<RateLimitPolicy>,
    req: Request,
    next: Next,
) -> Response {
    let peer = req
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip());
    let client = client_key(req.headers(), peer, &policy.state.trusted_proxies);

    match policy
        .state
        .rate_limiter
        .check(&client, policy.route, policy.rule)
    {
        RateDecision::Allowed { .. } => next.run(req).await,
        RateDecision::Denied { retry_after } => {
            metrics::counter!("rate_limit_denied_total", "route" => policy.route).increment(1);
            tracing::warn!(
                route = policy.route,
                client = %client,
                retry_after_secs = retry_after.as_secs(),
                "Rate limit exceeded"
            );

            match policy.transport {
                Transport::Api => ApiError::RateLimited { retry_after }.into_response(),
                Transport::Web => crate::web::pages::too_many_requests(retry_after),
            }
        }
    }
}
