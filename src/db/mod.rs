use anyhow::Result;
use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Statement};
use std::path::Path;
use std::time::Duration;
use tracing::info;

use crate::auth::{Principal, UserLookup};

pub mod migrator;
pub mod repositories;

pub use repositories::subscription::{Subscription, SubscriptionInput};
pub use repositories::user::{NewUser, User, UserChanges, UserCounts, UserQuery, UserSort};

#[derive(Clone)]
pub struct Store {
    pub conn: DatabaseConnection,
}

impl Store {
    pub async fn new(db_url: &str) -> Result<Self> {
        Self::with_pool_options(db_url, 5, 1).await
    }

    pub async fn with_pool_options(
        db_url: &str,
        max_connections: u32,
        min_connections: u32,
    ) -> Result<Self> {
        use sea_orm_migration::MigratorTrait;

        let path_str = db_url.trim_start_matches("sqlite:").trim_start_matches("//");
        if !path_str.starts_with(":memory:") {
            let path_only = path_str.split('?').next().unwrap_or(path_str);
            if let Some(parent) = Path::new(path_only).parent() {
                tokio::fs::create_dir_all(parent).await.ok();
            }
            if !Path::new(path_only).exists() {
                std::fs::File::create(path_only)?;
            }
        }

        let mut opt = ConnectOptions::new(db_url.to_string());
        opt.max_connections(max_connections)
            .min_connections(min_connections)
            .connect_timeout(Duration::from_secs(10))
            .acquire_timeout(Duration::from_secs(10))
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(600))
            .sqlx_logging(false);

        let conn = Database::connect(opt).await?;

        migrator::Migrator::up(&conn, None).await?;

        info!(
            "Database connected & migrations applied (pool: {}-{})",
            min_connections, max_connections
        );

        Ok(Self { conn })
    }

    pub async fn ping(&self) -> Result<()> {
        let backend = self.conn.get_database_backend();
        self.conn
            .query_one(Statement::from_string(backend, "SELECT 1".to_string()))
            .await?;
        Ok(())
    }

    fn user_repo(&self) -> repositories::user::UserRepository {
        repositories::user::UserRepository::new(self.conn.clone())
    }

    fn subscription_repo(&self) -> repositories::subscription::SubscriptionRepository {
        repositories::subscription::SubscriptionRepository::new(self.conn.clone())
    }

    pub async fn get_user(&self, id: i32) -> Result<Option<User>> {
        self.user_repo().get_by_id(id).await
    }

    pub async fn get_user_by_username(&self, username: &str) -> Result<Option<User>> {
        self.user_repo().get_by_username(username).await
    }

    pub async fn get_user_by_email(&self, email: &str) -> Result<Option<User>> {
        self.user_repo().get_by_email(email).await
    }

    pub async fn get_user_by_username_with_password(
        &self,
        username: &str,
    ) -> Result<Option<(User, String)>> {
        self.user_repo()
            .get_by_username_with_password(username)
            .await
    }

    pub async fn get_user_password_hash(&self, id: i32) -> Result<Option<String>> {
        self.user_repo().get_password_hash(id).await
    }

    pub async fn create_user(&self, new_user: NewUser) -> Result<User> {
        self.user_repo().create(new_user).await
    }

    pub async fn update_user(&self, id: i32, changes: UserChanges) -> Result<Option<User>> {
        self.user_repo().update(id, changes).await
    }

    pub async fn update_user_password(&self, id: i32, password_hash: String) -> Result<bool> {
        let changes = UserChanges {
            password_hash: Some(password_hash),
            ..UserChanges::default()
        };
        Ok(self.user_repo().update(id, changes).await?.is_some())
    }

    pub async fn delete_user(&self, id: i32) -> Result<bool> {
        self.user_repo().delete(id).await
    }

    pub async fn list_users(&self, query: &UserQuery) -> Result<(Vec<User>, u64)> {
        self.user_repo().list(query).await
    }

    pub async fn user_counts(&self) -> Result<UserCounts> {
        self.user_repo().counts().await
    }

    pub async fn get_subscription_by_email(&self, email: &str) -> Result<Option<Subscription>> {
        self.subscription_repo().get_by_email(email).await
    }

    pub async fn create_subscription(&self, input: &SubscriptionInput) -> Result<Subscription> {
        self.subscription_repo().create(input).await
    }

    pub async fn reactivate_subscription(
        &self,
        id: i32,
        input: &SubscriptionInput,
    ) -> Result<Option<Subscription>> {
        self.subscription_repo().reactivate(id, input).await
    }

    pub async fn deactivate_subscription(&self, email: &str) -> Result<Option<Subscription>> {
        self.subscription_repo().deactivate(email).await
    }

    pub async fn list_active_subscriptions(
        &self,
        skip: u64,
        limit: u64,
    ) -> Result<Vec<Subscription>> {
        self.subscription_repo().list_active(skip, limit).await
    }

    pub async fn get_subscription(&self, id: i32) -> Result<Option<Subscription>> {
        self.subscription_repo().get_by_id(id).await
    }

    pub async fn delete_subscription(&self, id: i32) -> Result<bool> {
        self.subscription_repo().delete(id).await
    }

    /// Returns `(total, active)` subscription counts.
    pub async fn subscription_counts(&self) -> Result<(u64, u64)> {
        self.subscription_repo().counts().await
    }
}

#[async_trait]
impl UserLookup for Store {
    async fn get_user_by_id(&self, id: i32) -> Result<Option<Principal>> {
        Ok(self.get_user(id).await?.as_ref().map(Principal::from))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> (Store, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("faststack-store-{}.db", uuid::Uuid::new_v4()));
        let store = Store::new(&format!("sqlite:{}", path.display()))
            .await
            .unwrap();
        (store, path)
    }

    fn new_user(username: &str) -> NewUser {
        NewUser {
            username: username.to_string(),
            email: format!("{username}@example.com"),
            full_name: None,
            password_hash: "hash".to_string(),
            is_active: true,
            is_superuser: false,
        }
    }

    #[tokio::test]
    async fn test_user_crud() {
        let (store, path) = test_store().await;
        store.ping().await.unwrap();

        let created = store.create_user(new_user("alice")).await.unwrap();
        assert!(created.is_active);
        assert!(!created.is_superuser);

        let by_email = store.get_user_by_email("alice@example.com").await.unwrap();
        assert_eq!(by_email.map(|u| u.id), Some(created.id));

        let updated = store
            .update_user(
                created.id,
                UserChanges {
                    full_name: Some(Some("Alice A.".to_string())),
                    is_active: Some(false),
                    ..UserChanges::default()
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(updated.full_name.as_deref(), Some("Alice A."));
        assert!(!updated.is_active);

        assert!(store.update_user(9999, UserChanges::default()).await.unwrap().is_none());

        assert!(store.delete_user(created.id).await.unwrap());
        assert!(!store.delete_user(created.id).await.unwrap());
        assert!(store.get_user(created.id).await.unwrap().is_none());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_duplicate_username_rejected() {
        let (store, path) = test_store().await;

        store.create_user(new_user("bob")).await.unwrap();
        let mut dup = new_user("bob");
        dup.email = "other@example.com".to_string();
        assert!(store.create_user(dup).await.is_err());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_list_users_search_and_sort() {
        let (store, path) = test_store().await;

        for name in ["carol", "dave", "caroline"] {
            store.create_user(new_user(name)).await.unwrap();
        }

        let query = UserQuery {
            limit: 10,
            search: Some("carol".to_string()),
            sort: UserSort::Username,
            descending: true,
            ..UserQuery::default()
        };
        let (users, total) = store.list_users(&query).await.unwrap();
        assert_eq!(total, 2);
        let names: Vec<_> = users.iter().map(|u| u.username.as_str()).collect();
        assert_eq!(names, ["caroline", "carol"]);

        let page = UserQuery {
            skip: 1,
            limit: 1,
            ..UserQuery::default()
        };
        let (users, total) = store.list_users(&page).await.unwrap();
        assert_eq!(total, 3);
        assert_eq!(users.len(), 1);
        assert_eq!(users[0].username, "dave");

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_subscription_lifecycle() {
        let (store, path) = test_store().await;

        let input = SubscriptionInput {
            email: "reader@example.com".to_string(),
            name: "Reader".to_string(),
            company: None,
            interests: Some(vec!["rust".to_string()]),
        };

        let created = store.create_subscription(&input).await.unwrap();
        assert!(created.is_active);
        assert_eq!(store.subscription_counts().await.unwrap(), (1, 1));

        let deactivated = store
            .deactivate_subscription("reader@example.com")
            .await
            .unwrap()
            .unwrap();
        assert!(!deactivated.is_active);
        assert_eq!(store.subscription_counts().await.unwrap(), (1, 0));
        assert!(store.list_active_subscriptions(0, 10).await.unwrap().is_empty());

        let again = store
            .reactivate_subscription(created.id, &input)
            .await
            .unwrap()
            .unwrap();
        assert!(again.is_active);
        assert_eq!(again.interests, Some(vec!["rust".to_string()]));

        assert!(store.delete_subscription(created.id).await.unwrap());
        assert!(store.get_subscription(created.id).await.unwrap().is_none());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_user_lookup_maps_principal() {
        let (store, path) = test_store().await;

        let created = store.create_user(new_user("erin")).await.unwrap();
        let principal = UserLookup::get_user_by_id(&store, created.id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(principal.username, "erin");
        assert!(UserLookup::get_user_by_id(&store, 4242).await.unwrap().is_none());

        let _ = std::fs::remove_file(path);
    }
}
