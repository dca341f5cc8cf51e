//! Authentication error types.
//!
//! Every variant is terminal for the request. The response body is always
//! `{statusCode, message}` and never says *why* a token or a login failed.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use super::token::TokenError;
use crate::users::StoreError;

#[derive(Debug, Error)]
pub enum AuthError {
    /// Wrong identifier or password. Same error whether or not the user exists.
    #[error("Bad credentials")]
    BadCredentials,

    /// Missing token, or a token that failed signature/structure/expiry checks
    #[error("Unauthorized")]
    Unauthorized,

    /// Well-signed token with the wrong claims, or pointing at a deleted user
    #[error("Bad jwt")]
    BadToken,

    /// Principal lacks a required capability
    #[error("Forbidden resource")]
    Forbidden,

    /// Store or signing failure. The detail is logged, never returned.
    #[error("Internal server error")]
    Internal(String),
}

impl AuthError {
    pub fn http_status(&self) -> StatusCode {
        match self {
            Self::BadCredentials | Self::BadToken => StatusCode::BAD_REQUEST,
            Self::Unauthorized => StatusCode::UNAUTHORIZED,
            Self::Forbidden => StatusCode::FORBIDDEN,
            Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for AuthError {
    fn from(err: StoreError) -> Self {
        Self::Internal(format!("user store: {}", err))
    }
}

impl From<TokenError> for AuthError {
    fn from(err: TokenError) -> Self {
        match err {
            TokenError::InvalidToken(_) => Self::Unauthorized,
            other => Self::Internal(other.to_string()),
        }
    }
}

/// JSON response body for all error responses.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ErrorBody {
    #[schema(example = 400)]
    pub status_code: u16,
    #[schema(example = "Bad credentials")]
    pub message: String,
}

impl ErrorBody {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        Self {
            status_code: status.as_u16(),
            message: message.into(),
        }
    }
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        if let Self::Internal(ref detail) = self {
            tracing::error!("auth internal error: {}", detail);
        }
        let status = self.http_status();
        (status, Json(ErrorBody::new(status, self.to_string()))).into_response()
    }
}
