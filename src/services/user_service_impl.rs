//! `SeaORM` implementation of the `UserService` trait.

use async_trait::async_trait;

use crate::auth::{
    PasswordHasher, Principal, UserMutation, ensure_root_mutation_allowed,
    require_self_or_superuser, require_superuser,
};
use crate::db::{Store, User, UserChanges, UserQuery};
use crate::services::user_service::{UserError, UserPage, UserService, UserUpdate};
use crate::services::validation;

pub struct SeaOrmUserService {
    store: Store,
    hasher: PasswordHasher,
}

impl SeaOrmUserService {
    #[must_use]
    pub const fn new(store: Store, hasher: PasswordHasher) -> Self {
        Self { store, hasher }
    }

    async fn load(&self, user_id: i32) -> Result<User, UserError> {
        self.store.get_user(user_id).await?.ok_or(UserError::NotFound)
    }
}

#[async_trait]
impl UserService for SeaOrmUserService {
    async fn list(&self, query: &UserQuery) -> Result<UserPage, UserError> {
        let (users, total) = self.store.list_users(query).await?;
        Ok(UserPage { users, total })
    }

    async fn get(&self, actor: &Principal, user_id: i32) -> Result<User, UserError> {
        let user = self.load(user_id).await?;
        require_self_or_superuser(actor, user.id)?;
        Ok(user)
    }

    async fn update(
        &self,
        actor: &Principal,
        user_id: i32,
        update: UserUpdate,
    ) -> Result<User, UserError> {
        require_superuser(actor)?;
        let target = self.load(user_id).await?;

        let new_username = update.username.map(|u| u.trim().to_string());
        if let Some(username) = new_username.as_deref() {
            ensure_root_mutation_allowed(&target.username, UserMutation::Rename(username))?;
        }
        if let Some(is_superuser) = update.is_superuser {
            ensure_root_mutation_allowed(&target.username, UserMutation::SetSuperuser(is_superuser))?;
        }
        if let Some(is_active) = update.is_active {
            ensure_root_mutation_allowed(&target.username, UserMutation::SetActive(is_active))?;
        }

        let mut changes = UserChanges {
            full_name: update
                .full_name
                .map(|n| n.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())),
            is_active: update.is_active,
            is_superuser: update.is_superuser,
            ..UserChanges::default()
        };

        if let Some(username) = new_username
            && username != target.username
        {
            validation::username(&username).map_err(UserError::Validation)?;
            if self.store.get_user_by_username(&username).await?.is_some() {
                return Err(UserError::UsernameTaken);
            }
            changes.username = Some(username);
        }

        if let Some(email) = update.email.map(|e| e.trim().to_string())
            && email != target.email
        {
            validation::email(&email).map_err(UserError::Validation)?;
            if self.store.get_user_by_email(&email).await?.is_some() {
                return Err(UserError::EmailTaken);
            }
            changes.email = Some(email);
        }

        if let Some(password) = update.password.filter(|p| !p.is_empty()) {
            validation::password(&password).map_err(UserError::Validation)?;
            changes.password_hash = Some(self.hasher.hash(&password).await?);
        }

        let updated = self
            .store
            .update_user(user_id, changes)
            .await?
            .ok_or(UserError::NotFound)?;

        tracing::info!(actor = actor.id, target = user_id, "User updated");
        Ok(updated)
    }

    async fn delete(&self, actor: &Principal, user_id: i32) -> Result<(), UserError> {
        require_superuser(actor)?;
        let target = self.load(user_id).await?;

        ensure_root_mutation_allowed(&target.username, UserMutation::Delete)?;
        if target.id == actor.id {
            return Err(UserError::Forbidden(
                "Cannot delete your own account".to_string(),
            ));
        }

        if !self.store.delete_user(user_id).await? {
            return Err(UserError::NotFound);
        }

        tracing::info!(actor = actor.id, target = user_id, "User deleted");
        Ok(())
    }
}
