//! Axum extractor for the logged-in user.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::UserId;
use crate::error::ApiError;

/// Request header carrying the login token.
pub const TOKEN_HEADER: &str = "token";

/// The caller, authenticated from the `token` header.
///
/// Rejects with [`ApiError::InvalidToken`] when the header is missing,
/// empty, or fails verification.
#[derive(Debug, Clone)]
pub struct AuthUser {
    /// Authenticated user id.
    pub user_id: UserId,
    /// User name recorded in the token.
    pub name: String,
}

/// Reads the raw `token` header, treating an empty value as absent.
#[must_use]
pub fn token_from_parts(parts: &Parts) -> Option<String> {
    parts
        .headers
        .get(TOKEN_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(ToString::to_string)
}

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = token_from_parts(parts).ok_or(ApiError::InvalidToken)?;
        let claims = state.tokens.verify(&token)?;
        Ok(Self {
            user_id: claims.sub,
            name: claims.name,
        })
    }
}
