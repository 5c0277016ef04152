//! Share handlers: create, delete, exist, info, read.

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Query, State};
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, CreateShareRequest, CreatedShareDto, ListDto, ReadShareRequest, ShareDto,
    ShareExistsDto, ShareIdRequest, SharedContentDto,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;
use crate::sync::handler::share_ws_handler;

/// `POST /share/create` — Share one of the caller's files.
///
/// # Errors
///
/// Returns [`ApiError::FileNotFound`] or [`ApiError::ShareExists`].
#[utoipa::path(
    post,
    path = "/share/create",
    tag = "Shares",
    summary = "Share a file",
    description = "Snapshots the file and protects it with a generated password.",
    request_body = CreateShareRequest,
    responses(
        (status = 200, description = "Share id and password", body = ApiResponse<CreatedShareDto>),
        (status = 409, description = "Already shared", body = ApiResponse<String>),
    )
)]
pub async fn create(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CreateShareRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<CreatedShareDto>>, ApiError> {
    let Json(req) = body?;
    let share = state.shares.create(user.user_id, req.kb_file_id).await?;
    Ok(Json(ApiResponse::ok(CreatedShareDto {
        share_file_id: share.id,
        password: share.password,
    })))
}

/// `POST /share/delete` — Withdraw a share.
///
/// # Errors
///
/// Returns [`ApiError::ShareNotFound`] if it is not the caller's.
#[utoipa::path(
    post,
    path = "/share/delete",
    tag = "Shares",
    summary = "Delete a share",
    description = "Removes the snapshot and disconnects everyone editing it live.",
    request_body = ShareIdRequest,
    responses(
        (status = 200, description = "Deleted", body = ApiResponse<String>),
        (status = 404, description = "Unknown share", body = ApiResponse<String>),
    )
)]
pub async fn delete(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<ShareIdRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(req) = body?;
    state.shares.delete(user.user_id, req.share_file_id).await?;
    Ok(Json(ApiResponse::empty()))
}

/// `GET /share/exist` — Whether the caller has a share.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParams`] for a missing or malformed id.
#[utoipa::path(
    get,
    path = "/share/exist",
    tag = "Shares",
    summary = "Check a share",
    params(ShareIdRequest),
    responses(
        (status = 200, description = "Existence flag", body = ApiResponse<ShareExistsDto>),
    )
)]
pub async fn exist(
    State(state): State<AppState>,
    user: AuthUser,
    query: Result<Query<ShareIdRequest>, QueryRejection>,
) -> Result<Json<ApiResponse<ShareExistsDto>>, ApiError> {
    let Query(req) = query?;
    let exist = state.shares.exists(user.user_id, req.share_file_id).await?;
    Ok(Json(ApiResponse::ok(ShareExistsDto {
        share_file_id: req.share_file_id,
        exist,
    })))
}

/// `GET /share/info` — The caller's shares with their passwords.
///
/// # Errors
///
/// Returns [`ApiError::InvalidToken`] without a valid token.
#[utoipa::path(
    get,
    path = "/share/info",
    tag = "Shares",
    summary = "List shares",
    responses(
        (status = 200, description = "Shares, newest first", body = ApiResponse<ListDto<ShareDto>>),
    )
)]
pub async fn info(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<ListDto<ShareDto>>>, ApiError> {
    let shares = state.shares.list(user.user_id).await?;
    let list: Vec<ShareDto> = shares.into_iter().map(ShareDto::from).collect();
    Ok(Json(ApiResponse::ok(list.into())))
}

/// `POST /share/read` — Read a shared document with its password.
///
/// Any signed-in user may read a share; ownership is not checked.
///
/// # Errors
///
/// Returns [`ApiError::InvalidToken`], [`ApiError::ShareNotFound`] or
/// [`ApiError::WrongSharePassword`].
#[utoipa::path(
    post,
    path = "/share/read",
    tag = "Shares",
    summary = "Read a shared document",
    request_body = ReadShareRequest,
    responses(
        (status = 200, description = "Shared content", body = ApiResponse<SharedContentDto>),
        (status = 401, description = "Missing or invalid token", body = ApiResponse<String>),
        (status = 403, description = "Wrong password", body = ApiResponse<String>),
        (status = 404, description = "Unknown share", body = ApiResponse<String>),
    )
)]
pub async fn read(
    State(state): State<AppState>,
    _user: AuthUser,
    body: Result<Json<ReadShareRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<SharedContentDto>>, ApiError> {
    let Json(req) = body?;
    let (share, content) = state.shares.read(req.share_file_id, &req.password).await?;
    Ok(Json(ApiResponse::ok(SharedContentDto {
        share_file_id: share.id,
        file_name: share.name,
        content,
    })))
}

/// Share routes, including the live editing socket.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/share/create", post(create))
        .route("/share/delete", post(delete))
        .route("/share/exist", get(exist))
        .route("/share/info", get(info))
        .route("/share/read", post(read))
        .route("/share/ws/{room}", get(share_ws_handler))
}
