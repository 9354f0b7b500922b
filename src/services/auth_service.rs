//! Domain service for authentication and self-service account changes.
//!
//! Handles login, registration, password changes and profile edits.

use thiserror::Error;

use crate::auth::IssuedToken;
use crate::db::User;

/// Errors specific to authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Incorrect username or password")]
    InvalidCredentials,

    #[error("Inactive user")]
    AccountInactive,

    #[error("A user with this username already exists")]
    UsernameTaken,

    #[error("A user with this email already exists")]
    EmailTaken,

    #[error("Current password is incorrect")]
    IncorrectPassword,

    #[error("User not found")]
    UserNotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for AuthError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for AuthError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[derive(Debug, Clone)]
pub struct Registration {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub password: String,
}

/// Login result: the user and a freshly signed access token.
#[derive(Debug, Clone)]
pub struct LoginResult {
    pub user: User,
    pub token: IssuedToken,
}

/// Domain service trait for authentication.
#[async_trait::async_trait]
pub trait AuthService: Send + Sync {
    /// Verifies credentials and issues a token.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::InvalidCredentials`] for an unknown user or wrong
    /// password, and [`AuthError::AccountInactive`] for a disabled account.
    async fn login(&self, username: &str, password: &str) -> Result<LoginResult, AuthError>;

    /// Creates a regular, active account.
    async fn register(&self, registration: Registration) -> Result<User, AuthError>;

    /// Signs a token for an already authenticated user.
    fn issue_token(&self, user_id: i32) -> Result<IssuedToken, AuthError>;

    /// Changes a user's password after checking the current one.
    ///
    /// # Errors
    ///
    /// Returns [`AuthError::IncorrectPassword`] if `current_password` does not match.
    async fn change_password(
        &self,
        user_id: i32,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), AuthError>;

    /// Updates the caller's own display name.
    async fn update_profile(
        &self,
        user_id: i32,
        full_name: Option<String>,
    ) -> Result<User, AuthError>;
}
