//! Recycle bin handlers.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::Utc;

use crate::api::dto::{ApiResponse, FileDto, PurgedDto, RecycledFileDto, RecycledFileRequest};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// `GET /recycle/show_files` — The caller's recycled files.
///
/// # Errors
///
/// Returns [`ApiError::InvalidToken`] without a valid token.
#[utoipa::path(
    get,
    path = "/recycle/show_files",
    tag = "Recycle bin",
    summary = "List recycled files",
    responses(
        (status = 200, description = "Recycled files, newest first", body = ApiResponse<Vec<RecycledFileDto>>),
    )
)]
pub async fn show_files(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<Vec<RecycledFileDto>>>, ApiError> {
    let entries = state.recycle.list(user.user_id).await?;
    Ok(Json(ApiResponse::ok(
        entries.into_iter().map(RecycledFileDto::from).collect(),
    )))
}

/// `POST /recycle/restore` — Move a recycled file back.
///
/// # Errors
///
/// Returns [`ApiError::RecycledFileNotFound`], [`ApiError::IndexNotFound`]
/// or [`ApiError::FileExists`].
#[utoipa::path(
    post,
    path = "/recycle/restore",
    tag = "Recycle bin",
    summary = "Restore a file",
    description = "The knowledge base the file came from must still exist and must not hold a file with the same name.",
    request_body = RecycledFileRequest,
    responses(
        (status = 200, description = "Restored file", body = ApiResponse<FileDto>),
        (status = 404, description = "Unknown entry or knowledge base", body = ApiResponse<String>),
        (status = 409, description = "Name clash", body = ApiResponse<String>),
    )
)]
pub async fn restore(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<RecycledFileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<FileDto>>, ApiError> {
    let Json(req) = body?;
    let file = state
        .recycle
        .restore(user.user_id, req.kb_file_id, req.index_id)
        .await?;
    Ok(Json(ApiResponse::ok(file.into())))
}

/// `POST /recycle/delete_file` — Permanently delete a recycled file.
///
/// # Errors
///
/// Returns [`ApiError::RecycledFileNotFound`].
#[utoipa::path(
    post,
    path = "/recycle/delete_file",
    tag = "Recycle bin",
    summary = "Delete a recycled file",
    request_body = RecycledFileRequest,
    responses(
        (status = 200, description = "Deleted", body = ApiResponse<String>),
        (status = 404, description = "Unknown entry", body = ApiResponse<String>),
    )
)]
pub async fn delete_file(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<RecycledFileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(req) = body?;
    state
        .recycle
        .delete(user.user_id, req.kb_file_id, req.index_id)
        .await?;
    Ok(Json(ApiResponse::empty()))
}

/// `GET /recycle/clear` — Empty the caller's recycle bin.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] or [`ApiError::Io`] on storage failure.
#[utoipa::path(
    get,
    path = "/recycle/clear",
    tag = "Recycle bin",
    summary = "Empty the recycle bin",
    responses(
        (status = 200, description = "Number of purged entries", body = ApiResponse<PurgedDto>),
    )
)]
pub async fn clear(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<PurgedDto>>, ApiError> {
    let purged = state.recycle.clear(user.user_id).await?;
    Ok(Json(ApiResponse::ok(PurgedDto { purged })))
}

/// `POST /recycle/clearup` — Purge entries past the retention period.
///
/// # Errors
///
/// Returns [`ApiError::Persistence`] or [`ApiError::Io`] on storage failure.
#[utoipa::path(
    post,
    path = "/recycle/clearup",
    tag = "Recycle bin",
    summary = "Purge expired entries",
    description = "Runs the retention sweep now, for every user.",
    responses(
        (status = 200, description = "Number of purged entries", body = ApiResponse<PurgedDto>),
    )
)]
pub async fn clearup(
    State(state): State<AppState>,
    _user: AuthUser,
) -> Result<Json<ApiResponse<PurgedDto>>, ApiError> {
    let purged = state.recycle.cleanup(Utc::now()).await?;
    Ok(Json(ApiResponse::ok(PurgedDto { purged })))
}

/// Recycle bin routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/recycle/show_files", get(show_files))
        .route("/recycle/restore", post(restore))
        .route("/recycle/delete_file", post(delete_file))
        .route("/recycle/clear", get(clear))
        .route("/recycle/clearup", post(clearup))
}
