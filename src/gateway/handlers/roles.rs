use std::sync::Arc;

use axum::{Json, extract::State};

use super::super::state::AppState;
use crate::user_auth::{ErrorBody, RoleGrant};

/// Role → Capability table in effect
///
/// GET /roles
#[utoipa::path(
    get,
    path = "/roles",
    responses(
        (status = 200, description = "Grants per role", body = Vec<RoleGrant>),
        (status = 401, description = "Unauthorized", body = ErrorBody)
    ),
    security(("bearer_jwt" = [])),
    tag = "Roles"
)]
pub async fn list_roles(State(state): State<Arc<AppState>>) -> Json<Vec<RoleGrant>> {
    Json(state.auth.capabilities().entries())
}
