//! Account request/response DTOs.

use serde::{Deserialize, Serialize};

use crate::models;

/// Request body for `POST /api/v1/auth/register`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct RegisterRequest {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub full_name: Option<String>,
}

impl From<RegisterRequest> for models::RegisterRequest {
    fn from(req: RegisterRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
            full_name: req.full_name,
        }
    }
}

/// Request body for `POST /api/v1/auth/login`.
#[derive(Debug, Clone, Deserialize, utoipa::ToSchema)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl From<LoginRequest> for models::LoginRequest {
    fn from(req: LoginRequest) -> Self {
        Self {
            email: req.email,
            password: req.password,
        }
    }
}

/// A newly registered account.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct UserResponse {
    pub id: String,
    pub email: String,
    pub full_name: Option<String>,
}

impl From<models::User> for UserResponse {
    fn from(user: models::User) -> Self {
        Self {
            id: user.id,
            email: user.email,
            full_name: user.full_name,
        }
    }
}

/// The caller's own account, as seen through their token.
#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct CurrentUserResponse {
    pub email: String,
    pub full_name: Option<String>,
}

impl From<models::User> for CurrentUserResponse {
    fn from(user: models::User) -> Self {
        Self {
            email: user.email,
            full_name: user.full_name,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    /// Always `"bearer"`.
    pub token_type: String,
}

impl From<models::AccessToken> for TokenResponse {
    fn from(token: models::AccessToken) -> Self {
        Self {
            access_token: token.access_token,
            token_type: token.token_type,
        }
    }
}

#[derive(Debug, Clone, Serialize, utoipa::ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
