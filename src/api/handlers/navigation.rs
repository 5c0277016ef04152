//! Client route resolution: runs the navigator for a thin client.

use std::collections::BTreeMap;

use axum::extract::rejection::QueryRejection;
use axum::extract::{Query, State};
use axum::http::request::Parts;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::api::dto::ApiResponse;
use crate::app_state::AppState;
use crate::auth::extractor::token_from_parts;
use crate::error::ApiError;
use crate::navigation::{AuthContext, NavigationError, View};

/// Query of `GET /client/resolve`.
#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ResolveQuery {
    /// Client path, optionally with a query string.
    pub path: String,
}

/// Outcome of a client navigation.
#[derive(Debug, Serialize, ToSchema)]
pub struct ResolvedRouteDto {
    /// Final path after redirects.
    pub path: String,
    /// Name of the matched route.
    pub name: Option<String>,
    /// Views from the outermost layout to the page. Empty when nothing matched.
    #[schema(value_type = Vec<String>)]
    pub matched: Vec<View>,
    /// Route params.
    pub params: BTreeMap<String, String>,
    /// Props handed to the page.
    #[schema(value_type = Object)]
    pub props: serde_json::Value,
    /// First path visited when the navigation was redirected.
    pub redirected_from: Option<String>,
}

fn navigation_error(err: NavigationError) -> ApiError {
    match err {
        NavigationError::TooManyRedirects(_) => ApiError::Internal(err.to_string()),
        other => ApiError::InvalidParams(other.to_string()),
    }
}

/// Auth context built from the `token` header, without verifying it.
#[derive(Debug)]
pub struct HeaderAuth(pub AuthContext);

impl<S: Send + Sync> axum::extract::FromRequestParts<S> for HeaderAuth {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(AuthContext::from(token_from_parts(parts))))
    }
}

/// `GET /client/resolve` — Resolve a client path through the route guard.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParams`] when the path cannot be resolved.
#[utoipa::path(
    get,
    path = "/client/resolve",
    tag = "Client",
    summary = "Resolve a client route",
    description = "Runs the client route table and login guard with the `token` header as the session. Only the presence of a token is checked, like the browser client does.",
    params(ResolveQuery),
    responses(
        (status = 200, description = "Resolved route", body = ApiResponse<ResolvedRouteDto>),
    )
)]
pub async fn resolve(
    State(state): State<AppState>,
    HeaderAuth(auth): HeaderAuth,
    query: Result<Query<ResolveQuery>, QueryRejection>,
) -> Result<Json<ApiResponse<ResolvedRouteDto>>, ApiError> {
    let Query(query) = query?;
    let navigation = state
        .navigator
        .navigate(query.path.as_str(), &auth)
        .map_err(navigation_error)?;
    let route = navigation.route;
    Ok(Json(ApiResponse::ok(ResolvedRouteDto {
        path: route.path,
        name: route.name,
        matched: route.matched,
        params: route.params,
        props: serde_json::Value::Object(route.props),
        redirected_from: navigation.redirected_from,
    })))
}

/// Client routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/client/resolve", get(resolve))
}
