//! REST endpoint handlers organized by resource.

pub mod image;
pub mod index;
pub mod kb_file;
pub mod navigation;
pub mod recycle;
pub mod share;
pub mod system;
pub mod user;

use axum::Router;

use crate::app_state::AppState;

/// Composes all resource routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(user::routes())
        .merge(index::routes())
        .merge(kb_file::routes())
        .merge(recycle::routes())
        .merge(share::routes())
        .merge(image::routes())
        .merge(navigation::routes())
}
