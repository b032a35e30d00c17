//! v1 account handlers.

use axum::extract::State;
use axum::Extension;

use crate::api::v1::dto::{
    CurrentUserResponse, LoginRequest, MessageResponse, RegisterRequest, TokenResponse,
    UserResponse,
};
use crate::api::v1::response::{ApiError, ApiResponse};
use crate::api::{AppJson, AppState};
use crate::models::User;

/// `POST /api/v1/auth/register`
#[utoipa::path(
    post,
    path = "/api/v1/auth/register",
    tag = "auth",
    operation_id = "auth.register",
    request_body = RegisterRequest,
    responses(
        (status = 201, description = "Account created", body = UserResponse),
        (status = 400, description = "Invalid email or password", body = ApiError),
        (status = 409, description = "Email already registered", body = ApiError),
    )
)]
pub async fn register(
    State(state): State<AppState>,
    AppJson(req): AppJson<RegisterRequest>,
) -> ApiResponse<UserResponse> {
    match state.auth.register(req.into()).await {
        Ok(user) => ApiResponse::created(user.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/auth/login`
///
/// Exchanges email and password for a bearer token.
#[utoipa::path(
    post,
    path = "/api/v1/auth/login",
    tag = "auth",
    operation_id = "auth.login",
    request_body = LoginRequest,
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Invalid credentials", body = ApiError),
    )
)]
pub async fn login(
    State(state): State<AppState>,
    AppJson(req): AppJson<LoginRequest>,
) -> ApiResponse<TokenResponse> {
    match state.auth.login(req.into()).await {
        Ok(token) => ApiResponse::success(token.into()),
        Err(e) => e.into(),
    }
}

/// `POST /api/v1/auth/logout`
///
/// Tokens are stateless; the client discards its copy.
#[utoipa::path(
    post,
    path = "/api/v1/auth/logout",
    tag = "auth",
    operation_id = "auth.logout",
    responses(
        (status = 200, description = "Logged out", body = MessageResponse),
    )
)]
pub async fn logout() -> ApiResponse<MessageResponse> {
    ApiResponse::success(MessageResponse {
        message: "Logged out successfully".to_string(),
    })
}

/// `GET /api/v1/auth/current`
#[utoipa::path(
    get,
    path = "/api/v1/auth/current",
    tag = "auth",
    operation_id = "auth.current",
    responses(
        (status = 200, description = "The authenticated user", body = CurrentUserResponse),
        (status = 401, description = "Missing or invalid token", body = ApiError),
    ),
    security(("bearer_auth" = []))
)]
pub async fn current_user(Extension(user): Extension<User>) -> ApiResponse<CurrentUserResponse> {
    ApiResponse::success(user.into())
}
