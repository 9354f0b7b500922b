//! First-run creation of the `root` administrator.

use anyhow::{Context, Result};

use crate::auth::{PasswordHasher, ROOT_USERNAME, generate_password};
use crate::db::{NewUser, Store, User};

pub const ROOT_EMAIL: &str = "root@example.com";
pub const ROOT_FULL_NAME: &str = "Root Administrator";
const GENERATED_PASSWORD_LEN: usize = 16;

#[derive(Debug, Clone)]
pub struct RootCredentials {
    pub user: User,
    /// Only set when the password was generated here rather than configured.
    pub generated_password: Option<String>,
}

/// Creates `root` if it does not exist yet. Returns `None` when it already did.
pub async fn ensure_root_user(
    store: &Store,
    hasher: &PasswordHasher,
    configured_password: Option<&str>,
) -> Result<Option<RootCredentials>> {
    if store.get_user_by_username(ROOT_USERNAME).await?.is_some() {
        return Ok(None);
    }

    let (password, generated) = match configured_password.filter(|p| !p.is_empty()) {
        Some(password) => (password.to_string(), false),
        None => (generate_password(GENERATED_PASSWORD_LEN), true),
    };

    let password_hash = hasher.hash(&password).await?;
    let user = store
        .create_user(NewUser {
            username: ROOT_USERNAME.to_string(),
            email: ROOT_EMAIL.to_string(),
            full_name: Some(ROOT_FULL_NAME.to_string()),
            password_hash,
            is_active: true,
            is_superuser: true,
        })
        .await
        .context("Failed to create root user")?;

    Ok(Some(RootCredentials {
        user,
        generated_password: generated.then_some(password),
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SecurityConfig;

    fn fast_hasher() -> PasswordHasher {
        PasswordHasher::new(&SecurityConfig {
            argon2_memory_cost_kib: 1024,
            argon2_time_cost: 1,
            ..SecurityConfig::default()
        })
        .unwrap()
    }

    async fn test_store() -> (Store, std::path::PathBuf) {
        let path = std::env::temp_dir().join(format!("faststack-boot-{}.db", uuid::Uuid::new_v4()));
        let store = Store::new(&format!("sqlite:{}", path.display()))
            .await
            .unwrap();
        (store, path)
    }

    #[tokio::test]
    async fn test_creates_root_once() {
        let (store, path) = test_store().await;
        let hasher = fast_hasher();

        let created = ensure_root_user(&store, &hasher, None)
            .await
            .unwrap()
            .unwrap();
        assert!(created.user.is_superuser);
        assert_eq!(created.user.email, ROOT_EMAIL);
        let password = created.generated_password.unwrap();
        assert_eq!(password.chars().count(), 16);

        let (_, hash) = store
            .get_user_by_username_with_password("root")
            .await
            .unwrap()
            .unwrap();
        assert!(hasher.verify(&password, &hash).await);

        assert!(ensure_root_user(&store, &hasher, None).await.unwrap().is_none());

        let _ = std::fs::remove_file(path);
    }

    #[tokio::test]
    async fn test_configured_password_is_used() {
        let (store, path) = test_store().await;
        let hasher = fast_hasher();

        let created = ensure_root_user(&store, &hasher, Some("configured-secret"))
            .await
            .unwrap()
            .unwrap();
        assert!(created.generated_password.is_none());

        let (_, hash) = store
            .get_user_by_username_with_password("root")
            .await
            .unwrap()
            .unwrap();
        assert!(hasher.verify("configured-secret", &hash).await);

        let _ = std::fs::remove_file(path);
    }
}
