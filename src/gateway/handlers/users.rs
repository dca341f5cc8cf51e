//! User administration handlers
//!
//! Access requirements are declared where the routes are registered, see
//! [`crate::gateway::build_router`].

use std::sync::Arc;

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use super::super::state::AppState;
use super::super::types::{
    ApiError, ApiResult, CreateUserRequest, ListUsersQuery, UpdateRoleRequest,
};
use crate::user_auth::{ErrorBody, Principal, hash_password};
use crate::users::{NewUser, UserRecord};

/// Caller's own user record
///
/// GET /users/me
#[utoipa::path(
    get,
    path = "/users/me",
    responses(
        (status = 200, description = "Current user", body = UserRecord),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 404, description = "User no longer exists", body = ErrorBody)
    ),
    security(("bearer_jwt" = [])),
    tag = "Users"
)]
pub async fn get_me(
    State(state): State<Arc<AppState>>,
    principal: Principal,
) -> ApiResult<Json<UserRecord>> {
    state
        .users
        .get_user_by_id(&principal.user_id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user"))
}

/// List users
///
/// GET /users
#[utoipa::path(
    get,
    path = "/users",
    params(ListUsersQuery),
    responses(
        (status = 200, description = "Page of users", body = Vec<UserRecord>),
        (status = 401, description = "Unauthorized", body = ErrorBody),
        (status = 403, description = "Requires USER_ADMINISTRATION:read", body = ErrorBody)
    ),
    security(("bearer_jwt" = [])),
    tag = "Users"
)]
pub async fn list_users(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListUsersQuery>,
) -> ApiResult<Json<Vec<UserRecord>>> {
    let users = state
        .users
        .list_users(query.clamped_limit(), query.offset)
        .await?;
    Ok(Json(users))
}

/// Get a user by id
///
/// GET /users/{id}
#[utoipa::path(
    get,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 200, description = "User", body = UserRecord),
        (status = 403, description = "Requires USER_ADMINISTRATION:read", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer_jwt" = [])),
    tag = "Users"
)]
pub async fn get_user(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<UserRecord>> {
    state
        .users
        .get_user_by_id(&id)
        .await?
        .map(Json)
        .ok_or(ApiError::NotFound("user"))
}

/// Create a user
///
/// POST /users
#[utoipa::path(
    post,
    path = "/users",
    request_body = CreateUserRequest,
    responses(
        (status = 201, description = "User created", body = UserRecord),
        (status = 400, description = "Invalid input", body = ErrorBody),
        (status = 403, description = "Requires USER_ADMINISTRATION:write", body = ErrorBody),
        (status = 409, description = "Username or email already exists", body = ErrorBody)
    ),
    security(("bearer_jwt" = [])),
    tag = "Users"
)]
pub async fn create_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Json(req): Json<CreateUserRequest>,
) -> ApiResult<(StatusCode, Json<UserRecord>)> {
    req.validate()?;

    let password = req.password;
    let password_hash = tokio::task::spawn_blocking(move || hash_password(&password))
        .await
        .map_err(|e| ApiError::Internal(format!("hash task failed: {}", e)))??;

    let record = state
        .users
        .create_user(NewUser {
            username: req.username,
            email: req.email,
            password_hash,
            role: req.role,
        })
        .await?;

    tracing::info!(
        created = %record.id,
        role = %record.role,
        by = %principal.user_id,
        "user created"
    );
    Ok((StatusCode::CREATED, Json(record)))
}

/// Change a user's role
///
/// Takes effect on the user's next login or refresh; access tokens already
/// issued keep their capabilities until they expire.
///
/// PATCH /users/{id}/role
#[utoipa::path(
    patch,
    path = "/users/{id}/role",
    params(("id" = String, Path, description = "User id")),
    request_body = UpdateRoleRequest,
    responses(
        (status = 200, description = "Updated user", body = UserRecord),
        (status = 403, description = "Requires USER_ADMINISTRATION:write", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer_jwt" = [])),
    tag = "Users"
)]
pub async fn update_user_role(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
    Json(req): Json<UpdateRoleRequest>,
) -> ApiResult<Json<UserRecord>> {
    let record = state
        .users
        .update_role(&id, req.role)
        .await?
        .ok_or(ApiError::NotFound("user"))?;

    tracing::info!(user = %id, role = %req.role, by = %principal.user_id, "role changed");
    Ok(Json(record))
}

/// Delete a user
///
/// Outstanding refresh tokens for the user stop working immediately.
///
/// DELETE /users/{id}
#[utoipa::path(
    delete,
    path = "/users/{id}",
    params(("id" = String, Path, description = "User id")),
    responses(
        (status = 204, description = "Deleted"),
        (status = 403, description = "Requires USER_ADMINISTRATION:write", body = ErrorBody),
        (status = 404, description = "No such user", body = ErrorBody)
    ),
    security(("bearer_jwt" = [])),
    tag = "Users"
)]
pub async fn delete_user(
    State(state): State<Arc<AppState>>,
    principal: Principal,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    if !state.users.delete_user(&id).await? {
        return Err(ApiError::NotFound("user"));
    }
    tracing::info!(user = %id, by = %principal.user_id, "user deleted");
    Ok(StatusCode::NO_CONTENT)
}
