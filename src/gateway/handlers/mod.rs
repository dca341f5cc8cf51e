//! HTTP handlers for everything outside `/auth`

pub mod health;
pub mod roles;
pub mod users;

pub use health::{HealthResponse, health_check};
pub use roles::list_roles;
pub use users::{create_user, delete_user, get_me, get_user, list_users, update_user_role};
