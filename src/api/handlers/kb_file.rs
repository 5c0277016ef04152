//! Knowledge base file handlers.
//!
//! JSON endpoints address a file by `index_id` + `kb_file_id`; the import
//! and update endpoints take the same ids as multipart text fields next to
//! a `file` part.

use axum::extract::rejection::JsonRejection;
use axum::extract::multipart::MultipartRejection;
use axum::extract::{Multipart, State};
use axum::routing::post;
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, CreateFileRequest, FileContentDto, FileDto, FileRequest, IndexRequest,
    RecentDocsRequest, RenameFileRequest, SearchFileRequest, UploadFormDoc,
};
use crate::api::multipart::UploadForm;
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{FileId, IndexId, KbFile};
use crate::error::ApiError;

fn file_list(files: Vec<KbFile>) -> ApiResponse<Vec<FileDto>> {
    ApiResponse::ok(files.into_iter().map(FileDto::from).collect())
}

/// `POST /index/create_file` — Create an empty Markdown file.
///
/// # Errors
///
/// Returns [`ApiError::InvalidFileName`], [`ApiError::IndexNotFound`] or
/// [`ApiError::FileExists`].
#[utoipa::path(
    post,
    path = "/index/create_file",
    tag = "Files",
    summary = "Create a file",
    request_body = CreateFileRequest,
    responses(
        (status = 200, description = "File created", body = ApiResponse<FileDto>),
        (status = 409, description = "Name taken", body = ApiResponse<String>),
    )
)]
pub async fn create_file(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<CreateFileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<FileDto>>, ApiError> {
    let Json(req) = body?;
    let file = state
        .library
        .create_file(user.user_id, req.index_id, &req.kb_file_name)
        .await?;
    Ok(Json(ApiResponse::ok(file.into())))
}

/// `POST /index/add_file` — Import a Markdown or text document.
///
/// # Errors
///
/// Returns [`ApiError::ImportFailed`] for unsupported uploads, plus the
/// errors of `create_file`.
#[utoipa::path(
    post,
    path = "/index/add_file",
    tag = "Files",
    summary = "Import a file",
    description = "Multipart form with `index_id` and `file`. Accepts `.md`, `.markdown` and `.txt`; the file is named after the upload's stem.",
    request_body(content = UploadFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File imported", body = ApiResponse<FileDto>),
        (status = 422, description = "Unsupported upload", body = ApiResponse<String>),
    )
)]
pub async fn add_file(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<FileDto>>, ApiError> {
    let mut form = UploadForm::read(multipart?).await?;
    let index_id: IndexId = form.parse("index_id")?;
    let upload = form.take_file()?;
    let file = state
        .library
        .import_file(user.user_id, index_id, &upload.file_name, upload.bytes.to_vec())
        .await?;
    Ok(Json(ApiResponse::ok(file.into())))
}

/// `POST /index/show_files` — Files of a knowledge base.
///
/// # Errors
///
/// Returns [`ApiError::IndexNotFound`] if it is not the caller's.
#[utoipa::path(
    post,
    path = "/index/show_files",
    tag = "Files",
    summary = "List files",
    request_body = IndexRequest,
    responses(
        (status = 200, description = "Files, oldest first", body = ApiResponse<Vec<FileDto>>),
        (status = 404, description = "Unknown knowledge base", body = ApiResponse<String>),
    )
)]
pub async fn show_files(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<IndexRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Vec<FileDto>>>, ApiError> {
    let Json(req) = body?;
    let files = state.library.list_files(user.user_id, req.index_id).await?;
    Ok(Json(file_list(files)))
}

/// `POST /index/read_file` — A file with its Markdown body.
///
/// # Errors
///
/// Returns [`ApiError::IndexNotFound`] or [`ApiError::FileNotFound`].
#[utoipa::path(
    post,
    path = "/index/read_file",
    tag = "Files",
    summary = "Read a file",
    description = "Local image links in the body point at the image endpoint.",
    request_body = FileRequest,
    responses(
        (status = 200, description = "File content", body = ApiResponse<FileContentDto>),
        (status = 404, description = "Unknown file", body = ApiResponse<String>),
    )
)]
pub async fn read_file(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<FileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<FileContentDto>>, ApiError> {
    let Json(req) = body?;
    let (file, content) = state
        .library
        .read_file(user.user_id, req.index_id, req.kb_file_id)
        .await?;
    Ok(Json(ApiResponse::ok(FileContentDto {
        file: file.into(),
        content,
    })))
}

/// `POST /index/update_file` — Replace a file's content.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParams`] for malformed forms,
/// [`ApiError::IndexNotFound`] or [`ApiError::FileNotFound`].
#[utoipa::path(
    post,
    path = "/index/update_file",
    tag = "Files",
    summary = "Update a file",
    description = "Multipart form with `index_id`, `kb_file_id` and `file`. Image links pointing at the image endpoint are stored as relative paths.",
    request_body(content = UploadFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "File updated", body = ApiResponse<FileDto>),
        (status = 404, description = "Unknown file", body = ApiResponse<String>),
    )
)]
pub async fn update_file(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<FileDto>>, ApiError> {
    let mut form = UploadForm::read(multipart?).await?;
    let index_id: IndexId = form.parse("index_id")?;
    let file_id: FileId = form.parse("kb_file_id")?;
    let upload = form.take_file()?;
    let file = state
        .library
        .update_file(user.user_id, index_id, file_id, upload.bytes.to_vec())
        .await?;
    Ok(Json(ApiResponse::ok(file.into())))
}

/// `POST /index/rename_file` — Rename a file.
///
/// # Errors
///
/// Returns [`ApiError::InvalidFileName`], [`ApiError::FileNotFound`] or
/// [`ApiError::FileExists`].
#[utoipa::path(
    post,
    path = "/index/rename_file",
    tag = "Files",
    summary = "Rename a file",
    request_body = RenameFileRequest,
    responses(
        (status = 200, description = "Renamed", body = ApiResponse<String>),
        (status = 409, description = "Name taken", body = ApiResponse<String>),
    )
)]
pub async fn rename_file(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<RenameFileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(req) = body?;
    state
        .library
        .rename_file(user.user_id, req.index_id, req.kb_file_id, &req.dest_kb_file_name)
        .await?;
    Ok(Json(ApiResponse::empty()))
}

/// `POST /index/search_file` — Find files by name.
///
/// # Errors
///
/// Returns [`ApiError::IndexNotFound`] if the knowledge base is not the
/// caller's.
#[utoipa::path(
    post,
    path = "/index/search_file",
    tag = "Files",
    summary = "Search files by name",
    description = "Exact match, or substring match when `is_fuzzy_search` is set.",
    request_body = SearchFileRequest,
    responses(
        (status = 200, description = "Matching files", body = ApiResponse<Vec<FileDto>>),
    )
)]
pub async fn search_file(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<SearchFileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Vec<FileDto>>>, ApiError> {
    let Json(req) = body?;
    let files = state
        .library
        .search_files(user.user_id, req.index_id, &req.kb_file_name, req.is_fuzzy_search)
        .await?;
    Ok(Json(file_list(files)))
}

/// `POST /index/recent_docs` — The caller's newest files.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParams`] for an unknown mode.
#[utoipa::path(
    post,
    path = "/index/recent_docs",
    tag = "Files",
    summary = "Recent documents",
    description = "`mode` is `modified` or `created`; at most 20 files, newest first.",
    request_body = RecentDocsRequest,
    responses(
        (status = 200, description = "Recent files", body = ApiResponse<Vec<FileDto>>),
        (status = 400, description = "Unknown mode", body = ApiResponse<String>),
    )
)]
pub async fn recent_docs(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<RecentDocsRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<Vec<FileDto>>>, ApiError> {
    let Json(req) = body?;
    let files = state.library.recent_docs(user.user_id, &req.mode).await?;
    Ok(Json(file_list(files)))
}

/// `POST /index/recycle_file` — Move a file into the recycle bin.
///
/// # Errors
///
/// Returns [`ApiError::IndexNotFound`] or [`ApiError::FileNotFound`].
#[utoipa::path(
    post,
    path = "/index/recycle_file",
    tag = "Files",
    summary = "Recycle a file",
    request_body = FileRequest,
    responses(
        (status = 200, description = "Recycled", body = ApiResponse<String>),
        (status = 404, description = "Unknown file", body = ApiResponse<String>),
    )
)]
pub async fn recycle_file(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<FileRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(req) = body?;
    state
        .library
        .recycle_file(user.user_id, req.index_id, req.kb_file_id)
        .await?;
    Ok(Json(ApiResponse::empty()))
}

/// File routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/index/create_file", post(create_file))
        .route("/index/add_file", post(add_file))
        .route("/index/show_files", post(show_files))
        .route("/index/read_file", post(read_file))
        .route("/index/update_file", post(update_file))
        .route("/index/rename_file", post(rename_file))
        .route("/index/search_file", post(search_file))
        .route("/index/recent_docs", post(recent_docs))
        .route("/index/recycle_file", post(recycle_file))
}
