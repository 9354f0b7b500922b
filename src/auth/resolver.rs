//! Turns a request's credentials into a [`Principal`].

use async_trait::async_trait;
use axum::http::HeaderMap;
use std::sync::Arc;
use thiserror::Error;

use super::carrier::TokenCarrier;
use super::principal::Principal;
use super::token::TokenIssuer;

/// The only read the resolver needs from persistence.
#[async_trait]
pub trait UserLookup: Send + Sync {
    async fn get_user_by_id(&self, id: i32) -> anyhow::Result<Option<Principal>>;
}

#[derive(Debug, Error)]
pub enum AuthFailure {
    #[error("Not authenticated")]
    MissingToken,

    #[error("Could not validate credentials")]
    InvalidToken,

    #[error("Inactive user")]
    AccountInactive,

    #[error("Failed to load user: {0}")]
    Lookup(String),
}

#[derive(Clone)]
pub struct AuthResolver {
    tokens: Arc<TokenIssuer>,
    users: Arc<dyn UserLookup>,
}

impl AuthResolver {
    pub fn new(tokens: Arc<TokenIssuer>, users: Arc<dyn UserLookup>) -> Self {
        Self { tokens, users }
    }

    #[must_use]
    pub fn tokens(&self) -> &TokenIssuer {
        &self.tokens
    }

    pub async fn resolve(
        &self,
        carrier: &dyn TokenCarrier,
        headers: &HeaderMap,
    ) -> Result<Principal, AuthFailure> {
        let Some(token) = carrier.extract(headers) else {
            return Err(AuthFailure::MissingToken);
        };

        let result = self.resolve_token(&token).await;
        if let Err(e) = &result {
            tracing::debug!(carrier = carrier.name(), "Authentication failed: {e}");
        }
        result
    }

    /// Like [`Self::resolve`], but any credential problem means anonymous.
    pub async fn resolve_optional(
        &self,
        carrier: &dyn TokenCarrier,
        headers: &HeaderMap,
    ) -> Result<Option<Principal>, AuthFailure> {
        match self.resolve(carrier, headers).await {
            Ok(principal) => Ok(Some(principal)),
            Err(AuthFailure::Lookup(e)) => Err(AuthFailure::Lookup(e)),
            Err(_) => Ok(None),
        }
    }

    pub async fn resolve_token(&self, token: &str) -> Result<Principal, AuthFailure> {
        let user_id = self
            .tokens
            .validate(token)
            .map_err(|_| AuthFailure::InvalidToken)?;

        let principal = self
            .users
            .get_user_by_id(user_id)
            .await
            .map_err(|e| AuthFailure::Lookup(e.to_string()))?
            .ok_or(AuthFailure::InvalidToken)?;

        if !principal.is_active {
            return Err(AuthFailure::AccountInactive);
        }

        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::carrier::{BearerCarrier, CookieCarrier};
    use axum::http::{HeaderValue, header};
    use chrono::Duration;
    use jsonwebtoken::Algorithm;
    use std::collections::HashMap;
    use std::sync::Mutex;

    #[derive(Default)]
    struct MemoryUsers {
        users: Mutex<HashMap<i32, Principal>>,
    }

    impl MemoryUsers {
        fn insert(&self, id: i32, username: &str, is_active: bool) {
            self.users.lock().unwrap().insert(
                id,
                Principal {
                    id,
                    username: username.to_string(),
                    is_active,
                    is_superuser: false,
                },
            );
        }
    }

    #[async_trait]
    impl UserLookup for MemoryUsers {
        async fn get_user_by_id(&self, id: i32) -> anyhow::Result<Option<Principal>> {
            Ok(self.users.lock().unwrap().get(&id).cloned())
        }
    }

    fn setup() -> (AuthResolver, Arc<MemoryUsers>) {
        let tokens = Arc::new(TokenIssuer::new(
            b"resolver-secret",
            Algorithm::HS256,
            Duration::minutes(30),
            0,
        ));
        let users = Arc::new(MemoryUsers::default());
        (AuthResolver::new(tokens, users.clone()), users)
    }

    fn bearer(token: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::AUTHORIZATION,
            HeaderValue::from_str(&format!("Bearer {token}")).unwrap(),
        );
        headers
    }

    #[tokio::test]
    async fn test_resolves_active_user() {
        let (resolver, users) = setup();
        users.insert(5, "alice", true);
        let token = resolver.tokens().issue(5).unwrap().token;

        let principal = resolver.resolve(&BearerCarrier, &bearer(&token)).await.unwrap();
        assert_eq!(principal.id, 5);
        assert_eq!(principal.username, "alice");
    }

    #[tokio::test]
    async fn test_missing_token() {
        let (resolver, _) = setup();
        let result = resolver.resolve(&BearerCarrier, &HeaderMap::new()).await;
        assert!(matches!(result, Err(AuthFailure::MissingToken)));
    }

    #[tokio::test]
    async fn test_deleted_user_is_invalid_token() {
        let (resolver, _) = setup();
        let token = resolver.tokens().issue(99).unwrap().token;

        let result = resolver.resolve(&BearerCarrier, &bearer(&token)).await;
        assert!(matches!(result, Err(AuthFailure::InvalidToken)));
    }

    #[tokio::test]
    async fn test_deactivation_invalidates_live_token() {
        let (resolver, users) = setup();
        users.insert(5, "alice", true);
        let token = resolver.tokens().issue(5).unwrap().token;
        assert!(resolver.resolve_token(&token).await.is_ok());

        users.insert(5, "alice", false);
        let result = resolver.resolve_token(&token).await;
        assert!(matches!(result, Err(AuthFailure::AccountInactive)));
    }

    #[tokio::test]
    async fn test_cookie_carrier_uses_same_validation() {
        let (resolver, users) = setup();
        users.insert(8, "bob", true);
        let token = resolver.tokens().issue(8).unwrap().token;

        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_str(&format!("access_token={token}")).unwrap(),
        );

        let carrier = CookieCarrier::new("access_token");
        assert_eq!(resolver.resolve(&carrier, &headers).await.unwrap().id, 8);

        headers.insert(header::COOKIE, HeaderValue::from_static("access_token=forged"));
        assert!(matches!(
            resolver.resolve(&carrier, &headers).await,
            Err(AuthFailure::InvalidToken)
        ));
    }

    #[tokio::test]
    async fn test_optional_resolution_treats_bad_tokens_as_anonymous() {
        let (resolver, _) = setup();
        let result = resolver
            .resolve_optional(&BearerCarrier, &bearer("garbage"))
            .await
            .unwrap();
        assert!(result.is_none());
    }
}
