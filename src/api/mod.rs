//! REST API layer: route handlers, DTOs, and router composition.
//!
//! Routes are mounted at the root, matching the paths the note client
//! calls (`/user/*`, `/index/*`, `/recycle/*`, `/share/*`, `/images/*`).

pub mod dto;
pub mod handlers;
pub mod multipart;
pub mod openapi;

use std::time::Duration;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::app_state::AppState;
use crate::auth::TOKEN_HEADER;

/// Largest accepted request body (document and image uploads).
pub const MAX_BODY_BYTES: usize = 32 * 1024 * 1024;

/// Upper bound on handling a single request.
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How long browsers may cache a CORS preflight.
const CORS_MAX_AGE: Duration = Duration::from_secs(12 * 60 * 60);

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    let router = Router::new()
        .merge(handlers::routes())
        .merge(handlers::system::routes())
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES));

    #[cfg(feature = "swagger-ui")]
    let router = router.merge(openapi::swagger_ui());

    router
}

/// CORS policy: credentialed requests from `origins`, or any origin
/// without credentials when the list is empty.
#[must_use]
pub fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }
    let origins: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(TOKEN_HEADER),
        ])
        .allow_credentials(true)
        .max_age(CORS_MAX_AGE)
}

/// The API listener's full application: routes, middleware, the optional
/// static client bundle, and state.
pub fn build_app(state: AppState) -> Router {
    let mut router = build_router();

    if let Some(dir) = &state.config.static_dir {
        let index = ServeFile::new(dir.join("index.html"));
        router = router.fallback_service(ServeDir::new(dir).fallback(index));
    }

    router
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(REQUEST_TIMEOUT))
        .layer(cors_layer(&state.config.cors_allowed_origins))
        .with_state(state)
}
