//! Login tokens: HS256 JWTs carrying the user id and name.

use chrono::{DateTime, TimeDelta, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

use crate::domain::UserId;
use crate::error::ApiError;

/// JWT claims.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Claims {
    /// User id.
    pub sub: UserId,
    /// User name at login time.
    pub name: String,
    /// Issued-at (Unix seconds).
    pub iat: i64,
    /// Expiry (Unix seconds).
    pub exp: i64,
}

/// Issues and verifies login tokens.
#[derive(Clone)]
pub struct TokenIssuer {
    encoding: EncodingKey,
    decoding: DecodingKey,
    validation: Validation,
    ttl: TimeDelta,
}

impl std::fmt::Debug for TokenIssuer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenIssuer")
            .field("secret", &"<redacted>")
            .field("ttl", &self.ttl)
            .finish()
    }
}

impl TokenIssuer {
    /// An issuer signing with `secret`; tokens live for `ttl_hours`.
    #[must_use]
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            validation: Validation::new(Algorithm::HS256),
            ttl: TimeDelta::try_hours(ttl_hours.max(0)).unwrap_or(TimeDelta::MAX),
        }
    }

    /// Issues a token for `user_id` valid from now.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn issue(&self, user_id: UserId, name: &str) -> Result<String, ApiError> {
        self.issue_at(user_id, name, Utc::now())
    }

    /// Issues a token as if at `issued_at`.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::Internal`] if signing fails.
    pub fn issue_at(
        &self,
        user_id: UserId,
        name: &str,
        issued_at: DateTime<Utc>,
    ) -> Result<String, ApiError> {
        let claims = Claims {
            sub: user_id,
            name: name.to_string(),
            iat: issued_at.timestamp(),
            exp: issued_at
                .checked_add_signed(self.ttl)
                .unwrap_or(DateTime::<Utc>::MAX_UTC)
                .timestamp(),
        };
        encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
            .map_err(|e| ApiError::Internal(format!("token signing failed: {e}")))
    }

    /// Verifies signature and expiry and returns the claims.
    ///
    /// # Errors
    ///
    /// Returns [`ApiError::InvalidToken`] for any malformed, forged or
    /// expired token.
    pub fn verify(&self, token: &str) -> Result<Claims, ApiError> {
        decode::<Claims>(token, &self.decoding, &self.validation)
            .map(|data| data.claims)
            .map_err(|e| {
                tracing::debug!(error = %e, "token rejected");
                ApiError::InvalidToken
            })
    }
}
