//! `SeaORM` implementation of the `SubscriptionService` trait.

use async_trait::async_trait;

use crate::db::{Store, Subscription, SubscriptionInput};
use crate::services::subscription_service::{SubscriptionError, SubscriptionService};
use crate::services::validation;

pub struct SeaOrmSubscriptionService {
    store: Store,
}

impl SeaOrmSubscriptionService {
    #[must_use]
    pub const fn new(store: Store) -> Self {
        Self { store }
    }
}

fn normalize(input: SubscriptionInput) -> Result<SubscriptionInput, SubscriptionError> {
    let email = input.email.trim().to_lowercase();
    let name = input.name.trim().to_string();

    validation::email(&email).map_err(SubscriptionError::Validation)?;
    validation::required("Name", &name).map_err(SubscriptionError::Validation)?;

    let interests = input.interests.map(|list| {
        list.into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect::<Vec<_>>()
    });

    Ok(SubscriptionInput {
        email,
        name,
        company: input
            .company
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty()),
        interests,
    })
}

#[async_trait]
impl SubscriptionService for SeaOrmSubscriptionService {
    async fn subscribe(&self, input: SubscriptionInput) -> Result<Subscription, SubscriptionError> {
        let input = normalize(input)?;

        if let Some(existing) = self.store.get_subscription_by_email(&input.email).await? {
            if existing.is_active {
                return Err(SubscriptionError::AlreadySubscribed);
            }

            let reactivated = self
                .store
                .reactivate_subscription(existing.id, &input)
                .await?
                .ok_or(SubscriptionError::NotFound)?;
            tracing::info!(subscription_id = reactivated.id, "Reactivated subscription");
            return Ok(reactivated);
        }

        let created = self.store.create_subscription(&input).await?;
        tracing::info!(subscription_id = created.id, "New subscription created");
        Ok(created)
    }

    async fn unsubscribe(&self, email: &str) -> Result<Subscription, SubscriptionError> {
        let email = email.trim().to_lowercase();
        let subscription = self
            .store
            .deactivate_subscription(&email)
            .await?
            .ok_or(SubscriptionError::NotFound)?;

        tracing::info!(subscription_id = subscription.id, "Unsubscribed");
        Ok(subscription)
    }

    async fn list_active(
        &self,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Subscription>, SubscriptionError> {
        Ok(self.store.list_active_subscriptions(skip, limit).await?)
    }

    async fn delete(&self, id: i32) -> Result<(), SubscriptionError> {
        if !self.store.delete_subscription(id).await? {
            return Err(SubscriptionError::NotFound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trims_and_lowercases() {
        let input = SubscriptionInput {
            email: "  Reader@Example.COM ".to_string(),
            name: " Reader ".to_string(),
            company: Some("   ".to_string()),
            interests: Some(vec![" rust ".to_string(), String::new()]),
        };

        let normalized = normalize(input).unwrap();
        assert_eq!(normalized.email, "reader@example.com");
        assert_eq!(normalized.name, "Reader");
        assert_eq!(normalized.company, None);
        assert_eq!(normalized.interests, Some(vec!["rust".to_string()]));
    }

    #[test]
    fn test_normalize_rejects_bad_input() {
        let bad_email = SubscriptionInput {
            email: "nope".to_string(),
            name: "Reader".to_string(),
            company: None,
            interests: None,
        };
        assert!(matches!(
            normalize(bad_email),
            Err(SubscriptionError::Validation(_))
        ));

        let no_name = SubscriptionInput {
            email: "reader@example.com".to_string(),
            name: " ".to_string(),
            company: None,
            interests: None,
        };
        assert!(matches!(
            normalize(no_name),
            Err(SubscriptionError::Validation(_))
        ));
    }
}
