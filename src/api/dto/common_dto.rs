//! The response envelope shared by every endpoint.

use serde::Serialize;
use utoipa::ToSchema;

use crate::error::SUCCESS_CODE;

/// Message returned with every successful response.
pub const SUCCESS_MSG: &str = "success";

/// Common response envelope.
///
/// ```json
/// { "code": 0, "msg": "success", "data": { ... } }
/// ```
///
/// Errors use the same shape with a non-zero business code and an empty
/// string as `data`.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ApiResponse<T> {
    /// Business code; `0` on success.
    pub code: u32,
    /// Human-readable message.
    pub msg: String,
    /// Payload.
    pub data: T,
}

impl<T> ApiResponse<T> {
    /// Wraps `data` in a success envelope.
    #[must_use]
    pub fn ok(data: T) -> Self {
        Self {
            code: SUCCESS_CODE,
            msg: SUCCESS_MSG.to_string(),
            data,
        }
    }
}

impl ApiResponse<String> {
    /// A success envelope without payload.
    #[must_use]
    pub fn empty() -> Self {
        Self::ok(String::new())
    }
}

/// A list with its length, as returned by the share listing.
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ListDto<T> {
    /// Number of items.
    pub total: usize,
    /// Items.
    pub list: Vec<T>,
}

impl<T> From<Vec<T>> for ListDto<T> {
    fn from(list: Vec<T>) -> Self {
        Self {
            total: list.len(),
            list,
        }
    }
}
