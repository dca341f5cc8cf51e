//! Request/response types and the gateway error type
//!
//! Errors share the `{statusCode, message}` body with
//! [`AuthError`](crate::user_auth::AuthError).

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Deserialize;
use utoipa::{IntoParams, ToSchema};
use validator::{Validate, ValidationError};

use crate::user_auth::{AuthError, ErrorBody};
use crate::users::{Role, StoreError};

pub const DEFAULT_PAGE_SIZE: u32 = 20;
pub const MAX_PAGE_SIZE: u32 = 100;

// ============================================================================
// Errors
// ============================================================================

#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(&'static str),
    Conflict(String),
    Auth(AuthError),
    Internal(String),
}

pub type ApiResult<T> = Result<T, ApiError>;

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict(field) => ApiError::Conflict(format!("{} already exists", field)),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        ApiError::Auth(err)
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(err: validator::ValidationErrors) -> Self {
        ApiError::BadRequest(err.to_string())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Auth(err) => return err.into_response(),
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(what) => (StatusCode::NOT_FOUND, format!("{} not found", what)),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(detail) => {
                tracing::error!("request failed: {}", detail);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Internal server error".to_string(),
                )
            }
        };
        (status, Json(ErrorBody::new(status, message))).into_response()
    }
}

// ============================================================================
// Requests
// ============================================================================

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListUsersQuery {
    /// Page size, at most 100
    #[serde(default = "default_page_size")]
    pub limit: u32,
    #[serde(default)]
    pub offset: u32,
}

fn default_page_size() -> u32 {
    DEFAULT_PAGE_SIZE
}

impl ListUsersQuery {
    pub fn clamped_limit(&self) -> u32 {
        self.limit.clamp(1, MAX_PAGE_SIZE)
    }
}

#[derive(Deserialize, Validate, ToSchema)]
pub struct CreateUserRequest {
    /// 3-64 characters, no `@` (logins accept username or email)
    #[validate(length(min = 3, max = 64), custom(function = "username_is_not_email_like"))]
    #[schema(example = "alice")]
    pub username: String,
    #[validate(email)]
    #[schema(example = "alice@example.com")]
    pub email: String,
    #[validate(length(min = 8))]
    #[schema(example = "password123")]
    pub password: String,
    #[serde(default = "default_role")]
    pub role: Role,
}

fn username_is_not_email_like(username: &str) -> Result<(), ValidationError> {
    if username.contains('@') {
        return Err(ValidationError::new("username_contains_at"));
    }
    Ok(())
}

fn default_role() -> Role {
    Role::RegularUser
}

impl std::fmt::Debug for CreateUserRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CreateUserRequest")
            .field("username", &self.username)
            .field("email", &self.email)
            .field("role", &self.role)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
pub struct UpdateRoleRequest {
    pub role: Role,
}
