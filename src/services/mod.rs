pub mod auth_service;
pub mod auth_service_impl;
pub use auth_service::{AuthError, AuthService, LoginResult, Registration};
pub use auth_service_impl::SeaOrmAuthService;

pub mod user_service;
pub mod user_service_impl;
pub use user_service::{UserError, UserPage, UserService, UserUpdate};
pub use user_service_impl::SeaOrmUserService;

pub mod subscription_service;
pub mod subscription_service_impl;
pub use subscription_service::{SubscriptionError, SubscriptionService};
pub use subscription_service_impl::SeaOrmSubscriptionService;

pub mod stats_service;
pub mod stats_service_impl;
pub use stats_service::{
    ServerStats, ServerStatsFormatted, StatsError, StatsService, SystemStats, format_bytes,
    format_uptime,
};
pub use stats_service_impl::SysinfoStatsService;

pub mod bootstrap;
pub use bootstrap::{RootCredentials, ensure_root_user};

pub mod validation;
