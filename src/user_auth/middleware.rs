//! Per-route access control.
//!
//! Each route registers a [`RouteAccess`] descriptor. [`guarded`] wraps the
//! route's handler in [`route_guard`], which runs the access guard (bearer
//! token → [`Principal`]) and then the authority guard (required
//! capabilities ⊆ principal capabilities).

use std::sync::Arc;

use axum::{
    extract::{Request, State},
    http::{HeaderMap, header},
    middleware::{Next, from_fn_with_state},
    response::Response,
    routing::MethodRouter,
};

use super::error::AuthError;
use super::principal::Principal;
use super::service::UserAuthService;

/// Access requirement of a single route
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteAccess {
    /// No token needed, no principal attached
    Public,
    /// Any valid access token
    Authenticated,
    /// Valid access token carrying every listed capability
    Require(&'static [&'static str]),
}

impl RouteAccess {
    pub fn is_public(self) -> bool {
        matches!(self, RouteAccess::Public)
    }

    pub fn required_capabilities(self) -> &'static [&'static str] {
        match self {
            RouteAccess::Require(caps) => caps,
            _ => &[],
        }
    }
}

/// Token after a literal `Bearer ` prefix. Missing or malformed headers give
/// `""`, which never verifies.
pub fn bearer_token(headers: &HeaderMap) -> &str {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
        .unwrap_or("")
}

/// Access guard: verify the bearer token and produce the principal.
pub fn access_guard(auth: &UserAuthService, headers: &HeaderMap) -> Result<Principal, AuthError> {
    auth.verify_access_token(bearer_token(headers))
}

/// Authority guard: every required capability must be present.
pub fn authority_guard(principal: &Principal, required: &[&str]) -> Result<(), AuthError> {
    if principal.has_all(required) {
        Ok(())
    } else {
        tracing::warn!(
            user_id = %principal.user_id,
            required = ?required,
            "missing required capability"
        );
        Err(AuthError::Forbidden)
    }
}

/// State carried by each guarded route
#[derive(Clone)]
pub struct GuardState {
    pub auth: Arc<UserAuthService>,
    pub access: RouteAccess,
}

pub async fn route_guard(
    State(guard): State<GuardState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if guard.access.is_public() {
        return Ok(next.run(request).await);
    }

    let principal = access_guard(&guard.auth, request.headers())?;
    authority_guard(&principal, guard.access.required_capabilities())?;

    request.extensions_mut().insert(principal);
    Ok(next.run(request).await)
}

/// Attach the guard for `access` to a method router.
pub fn guarded<S>(
    route: MethodRouter<S>,
    auth: &Arc<UserAuthService>,
    access: RouteAccess,
) -> MethodRouter<S>
where
    S: Clone + Send + Sync + 'static,
{
    if access.is_public() {
        return route;
    }
    route.layer(from_fn_with_state(
        GuardState {
            auth: auth.clone(),
            access,
        },
        route_guard,
    ))
}
