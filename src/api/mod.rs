use axum::{
    Router,
    http::HeaderValue,
    middleware,
    routing::{delete, get, post},
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::net::IpAddr;
use std::sync::Arc;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{info, warn};

use crate::auth::{
    AuthResolver, BearerCarrier, CookieCarrier, PasswordHasher, RateLimiter, TokenIssuer,
};
use crate::config::Config;
use crate::db::Store;
use crate::services::{
    AuthService, SeaOrmAuthService, SeaOrmSubscriptionService, SeaOrmUserService,
    StatsService, SubscriptionService, SysinfoStatsService, UserService, ensure_root_user,
};

mod auth;
mod error;
mod extract;
mod observability;
pub mod rate_limit;
mod stats;
mod subscriptions;
mod system;
mod types;
mod users;
mod validation;

pub use error::ApiError;
pub use extract::CurrentUser;
pub use rate_limit::{RateLimitPolicy, Transport, enforce_rate_limit};
pub use types::*;

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,

    pub store: Store,

    pub resolver: AuthResolver,

    pub bearer: BearerCarrier,

    pub cookie: CookieCarrier,

    pub rate_limiter: Arc<RateLimiter>,

    /// Peers whose `X-Forwarded-For` is believed.
    pub trusted_proxies: Vec<IpAddr>,

    pub auth_service: Arc<dyn AuthService>,

    pub user_service: Arc<dyn UserService>,

    pub subscription_service: Arc<dyn SubscriptionService>,

    pub stats_service: Arc<dyn StatsService>,

    pub start_time: std::time::Instant,

    pub prometheus_handle: Option<PrometheusHandle>,
}

impl AppState {
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub const fn store(&self) -> &Store {
        &self.store
    }
}

fn parse_trusted_proxies(entries: &[String]) -> Vec<IpAddr> {
    entries
        .iter()
        .filter_map(|entry| match entry.trim().parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                warn!("Ignoring invalid trusted proxy address: {entry}");
                None
            }
        })
        .collect()
}

/// Connects the database, creates `root` on first run and wires the services.
pub async fn create_app_state_from_config(
    config: Config,
    prometheus_handle: Option<PrometheusHandle>,
) -> anyhow::Result<Arc<AppState>> {
    let store = Store::with_pool_options(
        &config.general.database_path,
        config.general.max_db_connections,
        config.general.min_db_connections,
    )
    .await?;

    let hasher = PasswordHasher::new(&config.security)?;
    let tokens = Arc::new(TokenIssuer::from_config(&config.security)?);

    if let Some(root) =
        ensure_root_user(&store, &hasher, config.security.root_password.as_deref()).await?
    {
        match &root.generated_password {
            Some(password) => warn!(
                username = %root.user.username,
                "Created root user with generated password: {password}. Change it after first login"
            ),
            None => info!(username = %root.user.username, "Created root user"),
        }
    }

    let resolver = AuthResolver::new(tokens.clone(), Arc::new(store.clone()));

    Ok(Arc::new(AppState {
        bearer: BearerCarrier,
        cookie: CookieCarrier::new(config.security.cookie_name.clone()),
        rate_limiter: Arc::new(RateLimiter::new()),
        trusted_proxies: parse_trusted_proxies(&config.server.trusted_proxy_ips),
        auth_service: Arc::new(SeaOrmAuthService::new(
            store.clone(),
            hasher.clone(),
            tokens,
        )),
        user_service: Arc::new(SeaOrmUserService::new(store.clone(), hasher)),
        subscription_service: Arc::new(SeaOrmSubscriptionService::new(store.clone())),
        stats_service: Arc::new(SysinfoStatsService::new(store.clone())),
        resolver,
        store,
        config: Arc::new(config),
        start_time: std::time::Instant::now(),
        prometheus_handle,
    }))
}

pub fn router(state: Arc<AppState>) -> Router {
    let cors_origins = state.config.server.cors_allowed_origins.clone();
    let session_cookie = state.cookie.clone();

    let api_router = create_api_router(&state).with_state(state.clone());
    let web_router = crate::web::router(&state).with_state(state);

    let cors_layer = if cors_origins.iter().any(|o| o == "*") {
        CorsLayer::new().allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> =
            cors_origins.iter().filter_map(|s| s.parse().ok()).collect();
        CorsLayer::new().allow_origin(origins)
    };

    Router::new()
        .nest("/api/v1", api_router)
        .merge(web_router)
        .layer(middleware::from_fn_with_state(
            session_cookie,
            observability::logging_middleware,
        ))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer.allow_methods(Any).allow_headers(Any))
        .layer(middleware::from_fn(observability::security_headers_middleware))
}

fn create_api_router(state: &Arc<AppState>) -> Router<Arc<AppState>> {
    let rules = &state.config.rate_limits;
    let limited = |route: &'static str, rule| {
        middleware::from_fn_with_state(
            RateLimitPolicy::new(state, route, rule, Transport::Api),
            enforce_rate_limit,
        )
    };

    Router::new()
        .route(
            "/auth/login",
            post(auth::login).layer(limited("login", rules.login)),
        )
        .route(
            "/auth/register",
            post(auth::register).layer(limited("register", rules.register)),
        )
        .route("/auth/me", get(auth::me))
        .route(
            "/auth/password",
            post(auth::change_password).layer(limited("password_change", rules.password_change)),
        )
        .route("/users", get(users::list_users))
        .route(
            "/users/{id}",
            get(users::get_user)
                .put(users::update_user)
                .delete(users::delete_user),
        )
        .route(
            "/subscribe",
            post(subscriptions::subscribe).layer(limited("subscribe", rules.subscribe)),
        )
        .route("/unsubscribe/{email}", delete(subscriptions::unsubscribe))
        .route("/subscriptions", get(subscriptions::list_subscriptions))
        .route(
            "/server-stats",
            get(stats::server_stats).layer(limited("server_stats", rules.server_stats)),
        )
        .route(
            "/server-stats/formatted",
            get(stats::server_stats_formatted).layer(limited("server_stats", rules.server_stats)),
        )
        .route("/system/stats", get(stats::system_stats))
        .route("/health", get(system::health))
        .route("/metrics", get(observability::get_metrics))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_trusted_proxies_skips_garbage() {
        let parsed = parse_trusted_proxies(&[
            "10.0.0.1".to_string(),
            "not-an-ip".to_string(),
            " ::1 ".to_string(),
        ]);
        assert_eq!(
            parsed,
            vec![
                "10.0.0.1".parse::<IpAddr>().unwrap(),
                "::1".parse::<IpAddr>().unwrap()
            ]
        );
    }
}
