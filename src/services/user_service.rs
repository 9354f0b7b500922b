//! Domain service for user administration.

use thiserror::Error;

use crate::auth::{AccessError, Principal, RootViolation};
use crate::db::{User, UserQuery};

#[derive(Debug, Error)]
pub enum UserError {
    #[error("User not found")]
    NotFound,

    #[error("{0}")]
    Forbidden(String),

    #[error("A user with this username already exists")]
    UsernameTaken,

    #[error("A user with this email already exists")]
    EmailTaken,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for UserError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for UserError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

impl From<RootViolation> for UserError {
    fn from(err: RootViolation) -> Self {
        Self::Forbidden(err.to_string())
    }
}

impl From<AccessError> for UserError {
    fn from(err: AccessError) -> Self {
        Self::Forbidden(err.to_string())
    }
}

/// An admin edit. Absent fields are left alone.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<Option<String>>,
    pub password: Option<String>,
    pub is_active: Option<bool>,
    pub is_superuser: Option<bool>,
}

#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub total: u64,
}

#[async_trait::async_trait]
pub trait UserService: Send + Sync {
    async fn list(&self, query: &UserQuery) -> Result<UserPage, UserError>;

    /// Fetches a user the caller is allowed to see (self, or anyone for a superuser).
    async fn get(&self, actor: &Principal, user_id: i32) -> Result<User, UserError>;

    /// Applies an admin edit.
    ///
    /// # Errors
    ///
    /// Returns [`UserError::Forbidden`] when the edit would rename, demote or
    /// deactivate `root`, or when the caller is not a superuser.
    async fn update(
        &self,
        actor: &Principal,
        user_id: i32,
        update: UserUpdate,
    ) -> Result<User, UserError>;

    /// Hard-deletes a user. `root` and the caller's own account are refused.
    async fn delete(&self, actor: &Principal, user_id: i32) -> Result<(), UserError>;
}
