pub mod handlers;
pub mod openapi;
pub mod state;
pub mod types;

use axum::{
    Router,
    routing::{delete, get, patch, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;

use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::user_auth::capabilities::{USER_ADMINISTRATION_READ, USER_ADMINISTRATION_WRITE};
use crate::user_auth::{RouteAccess, guarded};
use state::AppState;

const ADMIN_READ: RouteAccess = RouteAccess::Require(&[USER_ADMINISTRATION_READ]);
const ADMIN_WRITE: RouteAccess = RouteAccess::Require(&[USER_ADMINISTRATION_WRITE]);

/// Build the application router.
///
/// Every route states its access requirement next to its handler.
pub fn build_router(state: Arc<AppState>) -> Router {
    let auth = state.auth.clone();

    // ==========================================================================
    // Public Routes
    // ==========================================================================
    let public_routes = Router::new()
        .route(
            "/health",
            guarded(get(handlers::health_check), &auth, RouteAccess::Public),
        )
        .route(
            "/auth/token",
            guarded(
                post(crate::user_auth::handlers::issue_token),
                &auth,
                RouteAccess::Public,
            ),
        )
        .route(
            "/auth/refresh",
            guarded(
                post(crate::user_auth::handlers::refresh_token),
                &auth,
                RouteAccess::Public,
            ),
        );

    // ==========================================================================
    // Protected Routes
    // ==========================================================================
    let protected_routes = Router::new()
        .route(
            "/users/me",
            guarded(get(handlers::get_me), &auth, RouteAccess::Authenticated),
        )
        .route(
            "/roles",
            guarded(get(handlers::list_roles), &auth, RouteAccess::Authenticated),
        )
        .route("/users", guarded(get(handlers::list_users), &auth, ADMIN_READ))
        .route("/users", guarded(post(handlers::create_user), &auth, ADMIN_WRITE))
        .route("/users/{id}", guarded(get(handlers::get_user), &auth, ADMIN_READ))
        .route(
            "/users/{id}",
            guarded(delete(handlers::delete_user), &auth, ADMIN_WRITE),
        )
        .route(
            "/users/{id}/role",
            guarded(patch(handlers::update_user_role), &auth, ADMIN_WRITE),
        );

    Router::new()
        .merge(public_routes)
        .merge(protected_routes)
        .with_state(state)
        // OpenAPI / Swagger UI (stateless, added after with_state)
        .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", openapi::ApiDoc::openapi()))
}

/// Start HTTP Gateway server
pub async fn run_server(host: &str, port: u16, state: Arc<AppState>) -> anyhow::Result<()> {
    let app = build_router(state);

    let addr = format!("{}:{}", host, port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| anyhow::anyhow!("Failed to bind to {}: {}", addr, e))?;

    tracing::info!("Gateway listening on http://{}", addr);
    tracing::info!("API Docs: http://{}/docs", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    tracing::info!("Gateway stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
