//! Health check handler

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use axum::{Json, extract::State, http::StatusCode};
use utoipa::ToSchema;

use super::super::state::AppState;
use crate::user_auth::ErrorBody;

/// Health check response data
#[derive(serde::Serialize, ToSchema)]
pub struct HealthResponse {
    /// Server timestamp in milliseconds
    #[schema(example = 1703494800000_u64)]
    pub timestamp_ms: u64,
    #[schema(example = 3600)]
    pub uptime_secs: u64,
}

/// Health check endpoint
///
/// Pings the user store but does NOT expose any internal details in the
/// response.
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Service healthy", body = HealthResponse),
        (status = 503, description = "Service unavailable", body = ErrorBody)
    ),
    tag = "System"
)]
pub async fn health_check(
    State(state): State<Arc<AppState>>,
) -> Result<Json<HealthResponse>, (StatusCode, Json<ErrorBody>)> {
    let now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0);

    match state.users.health_check().await {
        Ok(()) => Ok(Json(HealthResponse {
            timestamp_ms: now_ms,
            uptime_secs: state.uptime_secs(),
        })),
        Err(e) => {
            tracing::error!("[HEALTH] {} store ping failed: {}", state.users.name(), e);
            Err((
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ErrorBody::new(StatusCode::SERVICE_UNAVAILABLE, "unavailable")),
            ))
        }
    }
}
