//! Account DTOs.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

use crate::domain::{User, UserId};

/// Request body for `POST /user/register`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Plain-text password.
    pub password: String,
}

/// Request body for `POST /user/login`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginRequest {
    /// Login name.
    pub username: String,
    /// Plain-text password.
    pub password: String,
}

/// Request body for `POST /user/update_user_name`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdateUserNameRequest {
    /// New login name.
    pub username: String,
}

/// Request body for `POST /user/update_password`.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct UpdatePasswordRequest {
    /// New plain-text password.
    pub password: String,
}

/// Public profile, never including the password hash.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct UserInfoDto {
    /// Account id.
    pub user_id: UserId,
    /// Login name.
    pub username: String,
    /// Email address.
    pub email: String,
    /// Registration time.
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserInfoDto {
    fn from(user: User) -> Self {
        Self {
            user_id: user.id,
            username: user.username,
            email: user.email,
            created_at: user.created_at,
        }
    }
}
