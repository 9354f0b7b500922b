//! Domain service for the newsletter subscriber list.

use thiserror::Error;

use crate::db::{Subscription, SubscriptionInput};

#[derive(Debug, Error)]
pub enum SubscriptionError {
    #[error("Email is already subscribed to our newsletter")]
    AlreadySubscribed,

    #[error("Email not found in our subscription list")]
    NotFound,

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<sea_orm::DbErr> for SubscriptionError {
    fn from(err: sea_orm::DbErr) -> Self {
        Self::Database(err.to_string())
    }
}

impl From<anyhow::Error> for SubscriptionError {
    fn from(err: anyhow::Error) -> Self {
        Self::Internal(err.to_string())
    }
}

#[async_trait::async_trait]
pub trait SubscriptionService: Send + Sync {
    /// Adds an address, or reactivates it with the new details if it had
    /// unsubscribed.
    ///
    /// # Errors
    ///
    /// Returns [`SubscriptionError::AlreadySubscribed`] for an active address.
    async fn subscribe(&self, input: SubscriptionInput) -> Result<Subscription, SubscriptionError>;

    /// Marks an address inactive. The row is kept.
    async fn unsubscribe(&self, email: &str) -> Result<Subscription, SubscriptionError>;

    async fn list_active(&self, skip: u64, limit: u64)
    -> Result<Vec<Subscription>, SubscriptionError>;

    /// Permanently removes a subscriber.
    async fn delete(&self, id: i32) -> Result<(), SubscriptionError>;
}
