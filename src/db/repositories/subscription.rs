use anyhow::{Context, Result};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};

use crate::entities::subscriptions;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Subscription {
    pub id: i32,
    pub email: String,
    pub name: String,
    pub company: Option<String>,
    pub interests: Option<Vec<String>>,
    pub is_active: bool,
    pub created_at: String,
    pub updated_at: String,
}

impl From<subscriptions::Model> for Subscription {
    fn from(model: subscriptions::Model) -> Self {
        Self {
            id: model.id,
            email: model.email,
            name: model.name,
            company: model.company,
            interests: decode_interests(model.interests.as_deref()),
            is_active: model.is_active,
            created_at: model.created_at,
            updated_at: model.updated_at,
        }
    }
}

/// Stored interests that fail to parse read back as absent.
fn decode_interests(raw: Option<&str>) -> Option<Vec<String>> {
    raw.filter(|s| !s.is_empty())
        .and_then(|s| serde_json::from_str(s).ok())
}

fn encode_interests(interests: Option<&[String]>) -> Result<Option<String>> {
    interests
        .map(serde_json::to_string)
        .transpose()
        .context("Failed to encode interests")
}

#[derive(Debug, Clone)]
pub struct SubscriptionInput {
    pub email: String,
    pub name: String,
    pub company: Option<String>,
    pub interests: Option<Vec<String>>,
}

pub struct SubscriptionRepository {
    conn: DatabaseConnection,
}

impl SubscriptionRepository {
    #[must_use]
    pub const fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }

    pub async fn get_by_email(&self, email: &str) -> Result<Option<Subscription>> {
        let row = subscriptions::Entity::find()
            .filter(subscriptions::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query subscription by email")?;

        Ok(row.map(Subscription::from))
    }

    pub async fn create(&self, input: &SubscriptionInput) -> Result<Subscription> {
        let now = chrono::Utc::now().to_rfc3339();

        let active = subscriptions::ActiveModel {
            email: Set(input.email.clone()),
            name: Set(input.name.clone()),
            company: Set(input.company.clone()),
            interests: Set(encode_interests(input.interests.as_deref())?),
            is_active: Set(true),
            created_at: Set(now.clone()),
            updated_at: Set(now),
            ..Default::default()
        };

        let model = active
            .insert(&self.conn)
            .await
            .context("Failed to insert subscription")?;

        Ok(Subscription::from(model))
    }

    /// Overwrites the details of an existing row and marks it active again.
    pub async fn reactivate(&self, id: i32, input: &SubscriptionInput) -> Result<Option<Subscription>> {
        let Some(row) = subscriptions::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query subscription for reactivation")?
        else {
            return Ok(None);
        };

        let mut active: subscriptions::ActiveModel = row.into();
        active.name = Set(input.name.clone());
        active.company = Set(input.company.clone());
        active.interests = Set(encode_interests(input.interests.as_deref())?);
        active.is_active = Set(true);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to reactivate subscription")?;

        Ok(Some(Subscription::from(model)))
    }

    pub async fn deactivate(&self, email: &str) -> Result<Option<Subscription>> {
        let Some(row) = subscriptions::Entity::find()
            .filter(subscriptions::Column::Email.eq(email))
            .one(&self.conn)
            .await
            .context("Failed to query subscription for deactivation")?
        else {
            return Ok(None);
        };

        let mut active: subscriptions::ActiveModel = row.into();
        active.is_active = Set(false);
        active.updated_at = Set(chrono::Utc::now().to_rfc3339());

        let model = active
            .update(&self.conn)
            .await
            .context("Failed to deactivate subscription")?;

        Ok(Some(Subscription::from(model)))
    }

    /// Active subscriptions, newest first.
    pub async fn list_active(&self, skip: u64, limit: u64) -> Result<Vec<Subscription>> {
        let rows = subscriptions::Entity::find()
            .filter(subscriptions::Column::IsActive.eq(true))
            .order_by_desc(subscriptions::Column::CreatedAt)
            .order_by_desc(subscriptions::Column::Id)
            .offset(skip)
            .limit(limit)
            .all(&self.conn)
            .await
            .context("Failed to list subscriptions")?;

        Ok(rows.into_iter().map(Subscription::from).collect())
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Option<Subscription>> {
        let row = subscriptions::Entity::find_by_id(id)
            .one(&self.conn)
            .await
            .context("Failed to query subscription by ID")?;

        Ok(row.map(Subscription::from))
    }

    pub async fn delete(&self, id: i32) -> Result<bool> {
        let result = subscriptions::Entity::delete_by_id(id)
            .exec(&self.conn)
            .await
            .context("Failed to delete subscription")?;

        Ok(result.rows_affected > 0)
    }

    /// Returns `(total, active)`.
    pub async fn counts(&self) -> Result<(u64, u64)> {
        let total = subscriptions::Entity::find()
            .count(&self.conn)
            .await
            .context("Failed to count subscriptions")?;

        let active = subscriptions::Entity::find()
            .filter(subscriptions::Column::IsActive.eq(true))
            .count(&self.conn)
            .await
            .context("Failed to count active subscriptions")?;

        Ok((total, active))
    }
}
