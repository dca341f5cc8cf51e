//! The verified identity attached to a request.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use serde::Serialize;
use utoipa::ToSchema;

use super::error::AuthError;
use crate::users::Role;

/// Built by the access guard from a verified access token, lives for one
/// request, never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct Principal {
    pub user_id: String,
    pub role: Role,
    pub capabilities: Vec<String>,
}

impl Principal {
    /// Exact, case-sensitive match
    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }

    /// Set containment, order irrelevant
    pub fn has_all(&self, required: &[&str]) -> bool {
        required.iter().all(|cap| self.has_capability(cap))
    }
}

/// Handlers behind a guarded route take `Principal` directly. On a route
/// without a guard there is nothing in the extensions and the request is
/// refused.
impl<S> FromRequestParts<S> for Principal
where
    S: Send + Sync,
{
    type Rejection = AuthError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Principal>()
            .cloned()
            .ok_or(AuthError::Unauthorized)
    }
}
