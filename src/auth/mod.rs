//! Authentication and authorization.
//!
//! A request flows through the rate limiter, then the resolver (token carrier
//! plus user lookup), then a gate check, before any handler runs.

pub mod carrier;
pub mod gate;
pub mod password;
pub mod principal;
pub mod rate_limit;
pub mod resolver;
pub mod root_guard;
pub mod token;

pub use carrier::{BearerCarrier, CookieCarrier, TokenCarrier};
pub use gate::{AccessError, require_authenticated, require_self_or_superuser, require_superuser};
pub use password::{PasswordHasher, generate_password};
pub use principal::{Principal, ROOT_USERNAME};
pub use rate_limit::{RateDecision, RateLimiter, WindowState, client_key};
pub use resolver::{AuthFailure, AuthResolver, UserLookup};
pub use root_guard::{RootViolation, UserMutation, ensure_root_mutation_allowed};
pub use token::{Claims, InvalidToken, IssuedToken, TokenIssuer};
