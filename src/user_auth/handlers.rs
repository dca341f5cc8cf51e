use axum::{Json, extract::State, http::StatusCode};
use serde::Deserialize;
use std::sync::Arc;
use utoipa::ToSchema;

use super::error::{AuthError, ErrorBody};
use super::service::TokenPair;
use crate::gateway::state::AppState;

/// Credentials login request
#[derive(Deserialize, ToSchema)]
pub struct TokenRequest {
    /// Username or email
    #[schema(example = "alice")]
    pub username: String,
    #[schema(example = "password123")]
    pub password: String,
}

// Hand-written so the password can never reach a log line through `{:?}`
impl std::fmt::Debug for TokenRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenRequest")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: String,
}

/// Issue a token pair from credentials
///
/// POST /auth/token
#[utoipa::path(
    post,
    path = "/auth/token",
    request_body = TokenRequest,
    responses(
        (status = 201, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Bad credentials", body = ErrorBody),
        (status = 500, description = "Internal server error", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn issue_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TokenRequest>,
) -> Result<(StatusCode, Json<TokenPair>), AuthError> {
    match state
        .auth
        .authenticate_with_credentials(&req.username, &req.password)
        .await
    {
        Ok(pair) => Ok((StatusCode::CREATED, Json(pair))),
        Err(AuthError::BadCredentials) => {
            tracing::warn!("Login failed: bad credentials");
            Err(AuthError::BadCredentials)
        }
        Err(e) => Err(e),
    }
}

/// Exchange a refresh token for a new token pair
///
/// POST /auth/refresh
#[utoipa::path(
    post,
    path = "/auth/refresh",
    request_body = RefreshRequest,
    responses(
        (status = 201, description = "Token pair issued", body = TokenPair),
        (status = 400, description = "Token is not a refresh token or its user is gone", body = ErrorBody),
        (status = 401, description = "Token failed verification", body = ErrorBody)
    ),
    tag = "Auth"
)]
pub async fn refresh_token(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RefreshRequest>,
) -> Result<(StatusCode, Json<TokenPair>), AuthError> {
    let pair = state
        .auth
        .authenticate_with_refresh_token(&req.refresh_token)
        .await?;
    Ok((StatusCode::CREATED, Json(pair)))
}
