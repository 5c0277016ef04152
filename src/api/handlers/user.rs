//! Account handlers: register, login, profile, rename, password, delete.

use axum::extract::State;
use axum::extract::rejection::JsonRejection;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::api::dto::{
    ApiResponse, LoginRequest, RegisterRequest, UpdatePasswordRequest, UpdateUserNameRequest,
    UserInfoDto,
};
use crate::app_state::AppState;
use crate::auth::AuthUser;
use crate::error::ApiError;

/// `POST /user/register` — Create an account.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParams`], [`ApiError::UserExists`] or
/// [`ApiError::EmailExists`].
#[utoipa::path(
    post,
    path = "/user/register",
    tag = "Users",
    summary = "Register",
    description = "Creates an account. The email must contain `@`; user names and emails are unique.",
    request_body = RegisterRequest,
    responses(
        (status = 200, description = "Account created", body = ApiResponse<UserInfoDto>),
        (status = 409, description = "User name or email taken", body = ApiResponse<String>),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    body: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<UserInfoDto>>, ApiError> {
    let Json(req) = body?;
    let user = state
        .users
        .register(&req.username, &req.email, &req.password)
        .await?;
    Ok(Json(ApiResponse::ok(user.into())))
}

/// `POST /user/login` — Exchange credentials for a login token.
///
/// # Errors
///
/// Returns [`ApiError::RecordNotFound`] or [`ApiError::WrongPassword`].
#[utoipa::path(
    post,
    path = "/user/login",
    tag = "Users",
    summary = "Log in",
    description = "Returns a signed login token in `data`. Send it back in the `token` header.",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Login token", body = ApiResponse<String>),
        (status = 401, description = "Wrong password", body = ApiResponse<String>),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    body: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(req) = body?;
    let token = state.users.login(&req.username, &req.password).await?;
    Ok(Json(ApiResponse::ok(token)))
}

/// `GET /user/info` — The caller's profile.
///
/// # Errors
///
/// Returns [`ApiError::InvalidToken`] or [`ApiError::RecordNotFound`].
#[utoipa::path(
    get,
    path = "/user/info",
    tag = "Users",
    summary = "Profile",
    responses(
        (status = 200, description = "Profile", body = ApiResponse<UserInfoDto>),
        (status = 401, description = "Missing or invalid token", body = ApiResponse<String>),
    )
)]
pub async fn info(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<UserInfoDto>>, ApiError> {
    let profile = state.users.info(user.user_id).await?;
    Ok(Json(ApiResponse::ok(profile.into())))
}

/// `POST /user/update_user_name` — Change the login name.
///
/// # Errors
///
/// Returns [`ApiError::UserExists`] if the name is taken.
#[utoipa::path(
    post,
    path = "/user/update_user_name",
    tag = "Users",
    summary = "Rename account",
    request_body = UpdateUserNameRequest,
    responses(
        (status = 200, description = "Renamed", body = ApiResponse<String>),
        (status = 409, description = "Name taken", body = ApiResponse<String>),
    )
)]
pub async fn update_user_name(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<UpdateUserNameRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(req) = body?;
    state.users.update_name(user.user_id, &req.username).await?;
    Ok(Json(ApiResponse::empty()))
}

/// `POST /user/update_password` — Change the password.
///
/// # Errors
///
/// Returns [`ApiError::InvalidParams`] for a blank password.
#[utoipa::path(
    post,
    path = "/user/update_password",
    tag = "Users",
    summary = "Change password",
    request_body = UpdatePasswordRequest,
    responses(
        (status = 200, description = "Password changed", body = ApiResponse<String>),
    )
)]
pub async fn update_password(
    State(state): State<AppState>,
    user: AuthUser,
    body: Result<Json<UpdatePasswordRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    let Json(req) = body?;
    state
        .users
        .update_password(user.user_id, &req.password)
        .await?;
    Ok(Json(ApiResponse::empty()))
}

/// `POST /user/delete` — Delete the caller's account.
///
/// # Errors
///
/// Returns [`ApiError::RecordNotFound`] if it is already gone.
#[utoipa::path(
    post,
    path = "/user/delete",
    tag = "Users",
    summary = "Delete account",
    responses(
        (status = 200, description = "Account deleted", body = ApiResponse<String>),
    )
)]
pub async fn delete_user(
    State(state): State<AppState>,
    user: AuthUser,
) -> Result<Json<ApiResponse<String>>, ApiError> {
    state.users.delete(user.user_id).await?;
    Ok(Json(ApiResponse::empty()))
}

/// Account routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/user/register", post(register))
        .route("/user/login", post(login))
        .route("/user/info", get(info))
        .route("/user/update_user_name", post(update_user_name))
        .route("/user/update_password", post(update_password))
        .route("/user/delete", post(delete_user))
}
