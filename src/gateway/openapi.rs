//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:8080/docs`
//! - OpenAPI JSON: `http://localhost:8080/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{CreateUserRequest, UpdateRoleRequest};
use crate::user_auth::handlers::{RefreshRequest, TokenRequest};
use crate::user_auth::{ErrorBody, RoleGrant, TokenPair};
use crate::users::{Role, UserRecord};

/// Bearer access token issued by `/auth/token` or `/auth/refresh`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_jwt",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Access token. Refresh tokens are rejected on every route.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "userhub API",
        version = "1.0.0",
        description = "User management with JWT authentication and capability-based authorization.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:8080", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::user_auth::handlers::issue_token,
        crate::user_auth::handlers::refresh_token,
        crate::gateway::handlers::users::get_me,
        crate::gateway::handlers::users::list_users,
        crate::gateway::handlers::users::get_user,
        crate::gateway::handlers::users::create_user,
        crate::gateway::handlers::users::update_user_role,
        crate::gateway::handlers::users::delete_user,
        crate::gateway::handlers::roles::list_roles,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorBody,
            TokenRequest,
            RefreshRequest,
            TokenPair,
            Role,
            RoleGrant,
            UserRecord,
            CreateUserRequest,
            UpdateRoleRequest,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Auth", description = "Token issuance and refresh (no auth required)"),
        (name = "Users", description = "User records (auth required)"),
        (name = "Roles", description = "Role → Capability table (auth required)"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;
    use utoipa::OpenApi;

    #[test]
    fn test_openapi_spec_generates() {
        let spec = ApiDoc::openapi();
        assert_eq!(spec.info.title, "userhub API");
        assert!(spec.to_json().is_ok());
    }

    #[test]
    fn test_endpoints_registered() {
        let spec = ApiDoc::openapi();
        let paths = spec.paths.paths;
        for path in [
            "/health",
            "/auth/token",
            "/auth/refresh",
            "/users",
            "/users/me",
            "/users/{id}",
            "/users/{id}/role",
            "/roles",
        ] {
            assert!(paths.contains_key(path), "missing {}", path);
        }
    }

    #[test]
    fn test_security_scheme_registered() {
        let spec = ApiDoc::openapi();
        let components = spec.components.expect("should have components");
        assert!(components.security_schemes.contains_key("bearer_jwt"));
    }
}
