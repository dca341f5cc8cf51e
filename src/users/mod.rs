//! User records and their storage
//!
//! The [`UserStore`] trait is the only seam the auth core talks to.
//! [`PgUserStore`] is the production implementation, [`InMemoryUserStore`]
//! serves tests and the database-less dev mode.

pub mod memory;
pub mod models;
pub mod pg;
pub mod store;

pub use memory::InMemoryUserStore;
pub use models::{NewUser, Role, UnknownRole, UserRecord};
pub use pg::PgUserStore;
pub use store::{StoreError, UserStore};
