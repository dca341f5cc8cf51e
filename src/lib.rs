//! userhub - user management backend with JWT authentication
//!
//! # Modules
//!
//! - [`config`] - YAML configuration per environment
//! - [`logging`] - tracing subscriber setup
//! - [`db`] - PostgreSQL pool and schema
//! - [`users`] - user records and the [`UserStore`] backends
//! - [`user_auth`] - credential verifier, token codec, auth service, guards
//! - [`gateway`] - HTTP router, handlers and OpenAPI docs

pub mod config;
pub mod db;
pub mod gateway;
pub mod logging;
pub mod user_auth;
pub mod users;

// Convenient re-exports at crate root
pub use config::AppConfig;
pub use gateway::{build_router, run_server, state::AppState};
pub use user_auth::{AuthError, Principal, TokenCodec, UserAuthService};
pub use users::{InMemoryUserStore, PgUserStore, Role, UserRecord, UserStore};
