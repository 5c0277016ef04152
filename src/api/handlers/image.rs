//! Image handlers: upload next to a document, serve by URL.

use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::PathRejection;
use axum::extract::{Multipart, Path, State};
use axum::http::header;
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{ApiResponse, ImageUrlDto, UploadFormDoc};
use crate::api::multipart::UploadForm;
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::domain::{FileId, IndexId};
use crate::error::ApiError;

/// `POST /images/upload` — Store an image for a document.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParams`] for malformed forms or unsupported
/// image types, [`ApiError::FileNotFound`] for a foreign file.
#[utoipa::path(
    post,
    path = "/images/upload",
    tag = "Images",
    summary = "Upload an image",
    description = "Multipart form with `index_id`, `kb_file_id` and `file` (`.jpg`, `.jpeg`, `.png` or `.gif`). Returns the image URL to embed in the document.",
    request_body(content = UploadFormDoc, content_type = "multipart/form-data"),
    responses(
        (status = 200, description = "Image URL", body = ApiResponse<ImageUrlDto>),
        (status = 400, description = "Unsupported image", body = ApiResponse<String>),
    )
)]
pub async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ApiResponse<ImageUrlDto>>, ApiError> {
    let mut form = UploadForm::read(multipart?).await?;
    let index_id: IndexId = form.parse("index_id")?;
    let file_id: FileId = form.parse("kb_file_id")?;
    let image = form.take_file()?;
    let url = state
        .library
        .upload_image(user.user_id, index_id, file_id, &image.file_name, &image.bytes)
        .await?;
    Ok(Json(ApiResponse::ok(ImageUrlDto { url })))
}

/// `GET /images/{index_id}/{kb_file_id}/{image_name}` — Serve an image.
///
/// `share` in place of the knowledge base id serves images of share
/// snapshots.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParams`] for malformed segments,
/// [`ApiError::RecordNotFound`] for unknown images.
#[utoipa::path(
    get,
    path = "/images/{index_id}/{kb_file_id}/{image_name}",
    tag = "Images",
    summary = "Serve an image",
    params(
        ("index_id" = String, Path, description = "Knowledge base id, or `share`"),
        ("kb_file_id" = String, Path, description = "File or share id"),
        ("image_name" = String, Path, description = "Stored image name"),
    ),
    responses(
        (status = 200, description = "Image bytes with a content type derived from the extension"),
        (status = 404, description = "Unknown image", body = ApiResponse<String>),
    )
)]
pub async fn serve(
    State(state): State<AppState>,
    path: Result<Path<(String, String, String)>, PathRejection>,
) -> Result<impl IntoResponse, ApiError> {
    let Path((index_segment, file_segment, image_name)) = path?;
    let image = state
        .library
        .read_image(&index_segment, &file_segment, &image_name)
        .await?;
    Ok(([(header::CONTENT_TYPE, image.content_type)], image.bytes))
}

/// Image routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/images/upload", post(upload))
        .route("/images/{index_id}/{kb_file_id}/{image_name}", get(serve))
}
