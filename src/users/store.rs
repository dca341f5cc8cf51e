//! User store abstraction
//!
//! The auth core only needs three lookups. The remaining methods back the
//! user administration endpoints.

use async_trait::async_trait;
use thiserror::Error;

use super::models::{NewUser, Role, UserRecord};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Uniqueness violation, carries the offending field name
    #[error("{0} already exists")]
    Conflict(&'static str),

    #[error("Corrupt user row: {0}")]
    Corrupt(String),
}

/// Persistence collaborator for user records.
///
/// `Ok(None)` means "not found". `Err` is reserved for infrastructure
/// failures and must never be conflated with a missing record.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Get adapter name for logging
    fn name(&self) -> &'static str;

    /// Stored password hash for a username or email
    async fn get_password_hash(&self, identifier: &str) -> Result<Option<String>, StoreError>;

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError>;

    /// Lookup by username or email
    async fn get_user_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, StoreError>;

    /// Insert a new user, failing with [`StoreError::Conflict`] when the
    /// username or email is already taken.
    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, StoreError>;

    /// Users ordered by creation time, oldest first
    async fn list_users(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>, StoreError>;

    async fn update_role(&self, id: &str, role: Role) -> Result<Option<UserRecord>, StoreError>;

    /// Returns `false` when no such user existed
    async fn delete_user(&self, id: &str) -> Result<bool, StoreError>;

    async fn health_check(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

/// Store whose every call fails like an unreachable database
#[cfg(test)]
pub(crate) struct FailingStore;

#[cfg(test)]
#[async_trait]
impl UserStore for FailingStore {
    fn name(&self) -> &'static str {
        "failing"
    }
    async fn get_password_hash(&self, _: &str) -> Result<Option<String>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn get_user_by_id(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn get_user_by_identifier(&self, _: &str) -> Result<Option<UserRecord>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn create_user(&self, _: NewUser) -> Result<UserRecord, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn list_users(&self, _: u32, _: u32) -> Result<Vec<UserRecord>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn update_role(&self, _: &str, _: Role) -> Result<Option<UserRecord>, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn delete_user(&self, _: &str) -> Result<bool, StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
    async fn health_check(&self) -> Result<(), StoreError> {
        Err(StoreError::Database(sqlx::Error::PoolTimedOut))
    }
}
