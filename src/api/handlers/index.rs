//! Knowledge base handlers: create, delete, rename, list.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, CreateIndexRequest, IndexDto, IndexRequest, RenameIndexRequest};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// `POST /index/create_index` — Create a knowledge base.
///
/// # Errors
///
/// Returns [`ApiError::InvalidIndexName`] or [`ApiError::IndexExists`].
#[utoipa::path(
    post,
    path = "/index/create_index",
    tag = "Knowledge bases",
    summary = "Create a knowledge base",
    description = "Names are unique per user and must not contain any of `?,\"/\\*<>|`.",
    request_body = CreateIndexRequest,
    responses(
        (status = 200, description = "Knowledge base created", body = ApiResponse<IndexDto>),
        (status = 400, description = "Invalid name", body = ApiResponse<String>),
        (status = 409, description = "Name taken", body = ApiResponse<String>),
    )
)]
pub async fn create_index(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CreateIndexRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<IndexDto>>, ApiError> {
    let Json(req) = body?;
    let index = state
        .library
        .create_index(user.user_id, &req.index_name)
        .await?;
    Ok(Json(ApiResponse::ok(index.into())))
}

/// `POST /index/delete_index` — Delete a knowledge base and its files.
///
/// # Errors
///
/// Returns [`ApiError::IndexNotFound`] if it is not the caller's.
#[utoipa::path(
    post,
    path = "/index/delete_index",
    tag = "Knowledge bases",
    summary = "Delete a knowledge base",
    request_body = IndexRequest,
    responses(
        (status = 200, description = "Deleted", body = ApiResponse<String>),
        (status = 404, description = "Unknown knowledge base", body = ApiResponse<String>),
    )
)]
pub async fn delete_index(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<IndexRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(req) = body?;
    state.library.delete_index(user.user_id, req.index_id).await?;
    Ok(Json(ApiResponse::empty()))
}

/// `POST /index/rename_index` — Rename a knowledge base.
///
/// # Errors
///
/// Returns [`ApiError::InvalidIndexName`], [`ApiError::IndexNotFound`] or
/// [`ApiError::IndexExists`].
#[utoipa::path(
    post,
    path = "/index/rename_index",
    tag = "Knowledge bases",
    summary = "Rename a knowledge base",
    request_body = RenameIndexRequest,
    responses(
        (status = 200, description = "Renamed", body = ApiResponse<String>),
        (status = 404, description = "Unknown knowledge base", body = ApiResponse<String>),
        (status = 409, description = "Name taken", body = ApiResponse<String>),
    )
)]
pub async fn rename_index(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<RenameIndexRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(req) = body?;
    state
        .library
        .rename_index(user.user_id, req.index_id, &req.dest_index_name)
        .await?;
    Ok(Json(ApiResponse::empty()))
}

/// `GET /index/show_indexes` — The caller's knowledge bases.
///
/// # Errors
///
/// Returns [`ApiError::InvalidToken`] without a valid token.
#[utoipa::path(
    get,
    path = "/index/show_indexes",
    tag = "Knowledge bases",
    summary = "List knowledge bases",
    responses(
        (status = 200, description = "Knowledge bases, oldest first", body = ApiResponse<Vec<IndexDto>>),
    )
)]
pub async fn show_indexes(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<IndexDto>>>, ApiError> {
    let indexes = state.library.list_indexes(user.user_id).await?;
    Ok(Json(ApiResponse::ok(
        indexes.into_iter().map(IndexDto::from).collect(),
    )))
}

/// Knowledge base routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/index/create_index", post(create_index))
        .route("/index/delete_index", post(delete_index))
        .route("/index/rename_index", post(rename_index))
        .route("/index/show_indexes", get(show_indexes))
}
