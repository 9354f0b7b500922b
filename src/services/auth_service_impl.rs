//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;

use crate::auth::{IssuedToken, PasswordHasher, TokenIssuer};
use crate::db::{NewUser, Store, User, UserChanges};
use crate::services::auth_service::{AuthError, AuthService, LoginResult, Registration};
use crate::services::validation;

pub struct SeaOrmAuthService {
    store: Store,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, hasher: PasswordHasher, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError> {
        let Some((user, password_hash)) = self
            .store
            .get_user_by_username_with_password(username)
            .await?
        else {
            metrics::counter!("auth_login_total", "outcome" => "unknown_user").increment(1);
            return Err(AuthError::InvalidCredentials);
        };

        if !self.hasher.verify(password, &password_hash).await {
            metrics::counter!("auth_login_total", "outcome" => "bad_password").increment(1);
            return Err(AuthError::InvalidCredentials);
        }

        if !user.is_active {
            metrics::counter!("auth_login_total", "outcome" => "inactive").increment(1);
            return Err(AuthError::AccountInactive);
        }

        let token = self.issue_token(user.id)?;
        metrics::counter!("auth_login_total", "outcome" => "success").increment(1);
        tracing::info!(user_id = user.id, "User logged in");

        Ok(LoginResult { user, token })
    }

    async fn register(&self, registration: Registration) -> Result<User, AuthError> {
        let username = registration.username.trim().to_string();
        let email = registration.email.trim().to_string();

        validation::username(&username).map_err(AuthError::Validation)?;
        validation::email(&email).map_err(AuthError::Validation)?;
        validation::password(&registration.password).map_err(AuthError::Validation)?;

        if self.store.get_user_by_email(&email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }
        if self.store.get_user_by_username(&username).await?.is_some() {
            return Err(AuthError::UsernameTaken);
        }

        let password_hash = self.hasher.hash(&registration.password).await?;
        let full_name = registration
            .full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let user = self
            .store
            .create_user(NewUser {
                username,
                email,
                full_name,
                password_hash,
                is_active: true,
                is_superuser: false,
            })
            .await?;

        tracing::info!(user_id = user.id, username = %user.username, "User registered");
        Ok(user)
    }

    fn issue_token(&self, user_id: i32) -> Result<IssuedToken, AuthError> {
        Ok(self.tokens.issue(user_id)?)
    }

    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError> {
        validation::password(new_password).map_err(AuthError::Validation)?;

        if current_password == new_password {
            return Err(AuthError::Validation(
                "New password must be different from current password".to_string(),
            ));
        }

        let stored = self
            .store
            .get_user_password_hash(user_id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        if !self.hasher.verify(current_password, &stored).await {
            return Err(AuthError::IncorrectPassword);
        }

        let new_hash = self.hasher.hash(new_password).await?;
        if !self.store.update_user_password(user_id, new_hash).await? {
            return Err(AuthError::UserNotFound);
        }

        tracing::info!(user_id, "Password changed");
        Ok(())
    }

    async fn update_profile(
        &self,
        user_id: i32,
        full_name: Option<String>,
    ) -> Result<User, AuthError> {
        let full_name = full_name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty());

        let changes = UserChanges {
            full_name: Some(full_name),
            ..UserChanges::default()
        };

        self.store
            .update_user(user_id, changes)
            .await?
            .ok_or(AuthError::UserNotFound)
    }
}
