//! Service error types with business-code and HTTP status mapping.
//!
//! [`ApiError`] is the central error type. Every variant maps to a
//! five-digit business code and an HTTP status, and renders as the common
//! response envelope (see [`crate::api::dto::ApiResponse`]).

use axum::extract::multipart::{MultipartError, MultipartRejection};
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};

use crate::api::dto::ApiResponse;

/// Business code returned with every successful response.
pub const SUCCESS_CODE: u32 = 0;

/// Server-side error enum with business-code and HTTP status mapping.
///
/// # Code Layout
///
/// | Digit(s) | Meaning                                   |
/// |----------|-------------------------------------------|
/// | 1        | `4` request/business error, `5` internal  |
/// | 2–3      | module: `00` common, `01` user, `02` knowledge base, `03` file, `04` recycle bin, `05` share |
/// | 4–5      | specific error                            |
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Request parameters are missing or malformed.
    #[error("invalid parameters: {0}")]
    InvalidParams(String),

    /// A generic record lookup failed.
    #[error("record not found: {0}")]
    RecordNotFound(String),

    /// The user name is already taken.
    #[error("user name already exists")]
    UserExists,

    /// The login token is missing, malformed, expired or forged.
    #[error("login token is missing or invalid")]
    InvalidToken,

    /// The supplied password does not match.
    #[error("wrong password")]
    WrongPassword,

    /// The email address is already registered.
    #[error("email already exists")]
    EmailExists,

    /// A knowledge base with that name already exists for the user.
    #[error("knowledge base already exists")]
    IndexExists,

    /// The knowledge base does not exist or is not owned by the caller.
    #[error("knowledge base does not exist")]
    IndexNotFound,

    /// The knowledge base name contains a forbidden character.
    #[error("knowledge base name must not contain any of ?,\"/\\*<>|")]
    InvalidIndexName,

    /// The file name contains a forbidden character.
    #[error("file name must not contain any of ?,\"/\\*<>|")]
    InvalidFileName,

    /// A file with that name already exists in the knowledge base.
    #[error("file already exists")]
    FileExists,

    /// The file does not exist or is not owned by the caller.
    #[error("file does not exist")]
    FileNotFound,

    /// An uploaded file could not be imported.
    #[error("file import failed: {0}")]
    ImportFailed(String),

    /// The recycled file does not exist or is not owned by the caller.
    #[error("recycled file does not exist")]
    RecycledFileNotFound,

    /// The shared file does not exist.
    #[error("shared file does not exist")]
    ShareNotFound,

    /// The share password does not match.
    #[error("wrong share password")]
    WrongSharePassword,

    /// The file is already shared.
    #[error("file is already shared")]
    ShareExists,

    /// Persistence layer failure.
    #[error("persistence error: {0}")]
    Persistence(String),

    /// Filesystem failure.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Internal server error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ApiError {
    /// Returns the five-digit business code for this variant.
    #[must_use]
    pub const fn error_code(&self) -> u32 {
        match self {
            Self::InvalidParams(_) => 40000,
            Self::RecordNotFound(_) => 40001,
            Self::UserExists => 40100,
            Self::InvalidToken => 40101,
            Self::WrongPassword => 40102,
            Self::EmailExists => 40103,
            Self::IndexExists => 40200,
            Self::IndexNotFound => 40201,
            Self::InvalidIndexName => 40202,
            Self::InvalidFileName => 40300,
            Self::FileExists => 40301,
            Self::FileNotFound => 40302,
            Self::ImportFailed(_) => 40303,
            Self::RecycledFileNotFound => 40401,
            Self::ShareNotFound => 40500,
            Self::WrongSharePassword => 40501,
            Self::ShareExists => 40502,
            Self::Persistence(_) | Self::Io(_) | Self::Internal(_) => 50000,
        }
    }

    /// Returns the HTTP status code for this variant.
    #[must_use]
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::InvalidParams(_) | Self::InvalidIndexName | Self::InvalidFileName => {
                StatusCode::BAD_REQUEST
            }
            Self::InvalidToken | Self::WrongPassword => StatusCode::UNAUTHORIZED,
            Self::WrongSharePassword => StatusCode::FORBIDDEN,
            Self::RecordNotFound(_)
            | Self::IndexNotFound
            | Self::FileNotFound
            | Self::RecycledFileNotFound
            | Self::ShareNotFound => StatusCode::NOT_FOUND,
            Self::UserExists
            | Self::EmailExists
            | Self::IndexExists
            | Self::FileExists
            | Self::ShareExists => StatusCode::CONFLICT,
            Self::ImportFailed(_) => StatusCode::UNPROCESSABLE_ENTITY,
            Self::Persistence(_) | Self::Io(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(err: sqlx::Error) -> Self {
        Self::Persistence(err.to_string())
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        Self::InvalidParams(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::InvalidParams(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::InvalidParams(rejection.body_text())
    }
}

impl From<MultipartRejection> for ApiError {
    fn from(rejection: MultipartRejection) -> Self {
        Self::InvalidParams(rejection.body_text())
    }
}

impl From<MultipartError> for ApiError {
    fn from(err: MultipartError) -> Self {
        Self::InvalidParams(err.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!(code = self.error_code(), error = %self, "request failed");
        } else {
            tracing::debug!(code = self.error_code(), error = %self, "request rejected");
        }
        let body = ApiResponse {
            code: self.error_code(),
            msg: self.to_string(),
            data: serde_json::Value::String(String::new()),
        };
        let mut response = axum::Json(body).into_response();
        *response.status_mut() = status;
        response
    }
}
