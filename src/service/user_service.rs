//! Account registration, login and profile management.

use std::sync::Arc;

use chrono::Utc;

use crate::auth::{PasswordHasher, TokenIssuer};
use crate::domain::{User, UserId};
use crate::error::ApiError;
use crate::storage::MetadataStore;

fn required(field: &str, value: &str) -> Result<(), ApiError> {
    if value.trim().is_empty() {
        return Err(ApiError::InvalidParams(format!("{field} must not be empty")));
    }
    Ok(())
}

/// Account operations.
#[derive(Debug, Clone)]
pub struct UserService {
    store: Arc<dyn MetadataStore>,
    hasher: PasswordHasher,
    tokens: Arc<TokenIssuer>,
}

impl UserService {
    /// Creates a new `UserService`.
    #[must_use]
    pub fn new(store: Arc<dyn MetadataStore>, hasher: PasswordHasher, tokens: Arc<TokenIssuer>) -> Self {
        Self {
            store,
            hasher,
            tokens,
        }
    }

    /// Registers a new account.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] for blank fields or a malformed email,
    /// [`ApiError::UserExists`] / [`ApiError::EmailExists`] on conflicts.
    pub async fn register(&self, username: &str, email: &str, password: &str) -> Result<User, ApiError> {
        required("username", username)?;
        required("email", email)?;
        required("password", password)?;
        if !email.contains('@') {
            return Err(ApiError::InvalidParams("email is malformed".to_string()));
        }

        let now = Utc::now();
        let user = User {
            id: UserId::new(),
            username: username.trim().to_string(),
            email: email.trim().to_string(),
            password_hash: self.hasher.hash(password)?,
            created_at: now,
            updated_at: now,
        };
        self.store.insert_user(&user).await?;

        tracing::info!(user_id = %user.id, username = %user.username, "user registered");
        Ok(user)
    }

    /// Checks credentials and issues a login token.
    ///
    /// # Errors
    ///
    /// [`ApiError::RecordNotFound`] for an unknown user,
    /// [`ApiError::WrongPassword`] for a bad password.
    pub async fn login(&self, username: &str, password: &str) -> Result<String, ApiError> {
        let user = self
            .store
            .user_by_name(username.trim())
            .await?
            .ok_or_else(|| ApiError::RecordNotFound("user".to_string()))?;
        if !self.hasher.verify(password, &user.password_hash) {
            tracing::debug!(user_id = %user.id, "login rejected");
            return Err(ApiError::WrongPassword);
        }
        self.tokens.issue(user.id, &user.username)
    }

    /// Loads the caller's profile.
    ///
    /// # Errors
    ///
    /// [`ApiError::RecordNotFound`] if the account is gone.
    pub async fn info(&self, user_id: UserId) -> Result<User, ApiError> {
        self.store
            .user_by_id(user_id)
            .await?
            .ok_or_else(|| ApiError::RecordNotFound("user".to_string()))
    }

    /// Changes the caller's login name.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] for a blank name, [`ApiError::UserExists`]
    /// if it is taken.
    pub async fn update_name(&self, user_id: UserId, username: &str) -> Result<(), ApiError> {
        required("username", username)?;
        self.store
            .rename_user(user_id, username.trim(), Utc::now())
            .await
    }

    /// Replaces the caller's password.
    ///
    /// # Errors
    ///
    /// [`ApiError::InvalidParams`] for a blank password,
    /// [`ApiError::RecordNotFound`] if the account is gone.
    pub async fn update_password(&self, user_id: UserId, password: &str) -> Result<(), ApiError> {
        required("password", password)?;
        let hash = self.hasher.hash(password)?;
        self.store.set_password_hash(user_id, &hash, Utc::now()).await
    }

    /// Deletes the caller's account record.
    ///
    /// # Errors
    ///
    /// [`ApiError::RecordNotFound`] if the account is already gone.
    pub async fn delete(&self, user_id: UserId) -> Result<(), ApiError> {
        if !self.store.delete_user(user_id).await? {
            return Err(ApiError::RecordNotFound("user".to_string()));
        }
        tracing::info!(%user_id, "user deleted");
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::panic)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn service() -> UserService {
        UserService::new(
            Arc::new(MemoryStore::new()),
            PasswordHasher::new("pepper", 4),
            Arc::new(TokenIssuer::new("secret", 1)),
        )
    }

    #[tokio::test]
    async fn register_then_login() {
        let users = service();
        let Ok(user) = users.register("alice", "a@x.io", "pw").await else {
            panic!("register failed");
        };
        let Ok(token) = users.login("alice", "pw").await else {
            panic!("login failed");
        };
        let Ok(claims) = users.tokens.verify(&token) else {
            panic!("token rejected");
        };
        assert_eq!(claims.sub, user.id);
        assert!(matches!(users.login("alice", "nope").await, Err(ApiError::WrongPassword)));
        assert!(matches!(users.login("bob", "pw").await, Err(ApiError::RecordNotFound(_))));
    }

    #[tokio::test]
    async fn register_validates_input() {
        let users = service();
        assert!(matches!(
            users.register("", "a@x.io", "pw").await,
            Err(ApiError::InvalidParams(_))
        ));
        assert!(matches!(
            users.register("alice", "not-an-email", "pw").await,
            Err(ApiError::InvalidParams(_))
        ));
        let _ = users.register("alice", "a@x.io", "pw").await;
        assert!(matches!(
            users.register("alice", "b@x.io", "pw").await,
            Err(ApiError::UserExists)
        ));
        assert!(matches!(
            users.register("bob", "a@x.io", "pw").await,
            Err(ApiError::EmailExists)
        ));
    }

    #[tokio::test]
    async fn password_and_name_updates() {
        let users = service();
        let Ok(user) = users.register("alice", "a@x.io", "old").await else {
            panic!("register failed");
        };
        assert!(users.update_password(user.id, "new").await.is_ok());
        assert!(users.login("alice", "old").await.is_err());
        assert!(users.login("alice", "new").await.is_ok());

        assert!(users.update_name(user.id, "alicia").await.is_ok());
        assert!(matches!(users.info(user.id).await, Ok(u) if u.username == "alicia"));

        assert!(users.delete(user.id).await.is_ok());
        assert!(matches!(users.info(user.id).await, Err(ApiError::RecordNotFound(_))));
    }
}
