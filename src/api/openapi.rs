//! OpenAPI document assembled from the handler annotations.

use utoipa::OpenApi;

use crate::api::handlers::{image, index, kb_file, navigation, recycle, share, system, user};

/// The service's OpenAPI description.
#[derive(Debug, OpenApi)]
#[openapi(
    info(title = "gcnote", description = "Knowledge-base notes with sharing and live sync"),
    paths(
        user::register,
        user::login,
        user::info,
        user::update_user_name,
        user::update_password,
        user::delete_user,
        index::create_index,
        index::delete_index,
        index::rename_index,
        index::show_indexes,
        kb_file::create_file,
        kb_file::add_file,
        kb_file::show_files,
        kb_file::read_file,
        kb_file::update_file,
        kb_file::rename_file,
        kb_file::search_file,
        kb_file::recent_docs,
        kb_file::recycle_file,
        recycle::show_files,
        recycle::restore,
        recycle::delete_file,
        recycle::clear,
        recycle::clearup,
        share::create,
        share::delete,
        share::exist,
        share::info,
        share::read,
        image::upload,
        image::serve,
        navigation::resolve,
        system::health_handler,
    ),
    tags(
        (name = "Users", description = "Accounts and login tokens"),
        (name = "Knowledge bases", description = "Per-user document collections"),
        (name = "Files", description = "Markdown documents"),
        (name = "Recycle bin", description = "Deleted files"),
        (name = "Shares", description = "Password-protected snapshots"),
        (name = "Images", description = "Images embedded in documents"),
        (name = "Client", description = "Client route resolution"),
        (name = "System", description = "Health"),
    )
)]
pub struct ApiDoc;

/// Swagger UI at `/swagger-ui`, serving the document at
/// `/api-docs/openapi.json`.
#[cfg(feature = "swagger-ui")]
#[must_use]
pub fn swagger_ui() -> utoipa_swagger_ui::SwaggerUi {
    utoipa_swagger_ui::SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi())
}
