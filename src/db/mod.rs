//! Database connection management

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;

/// Schema for the `users` table, applied idempotently at startup
pub const USERS_SCHEMA: &str = include_str!("../../migrations/001_create_users.sql");

/// PostgreSQL database connection pool
pub struct Database {
    pool: PgPool,
}

impl Database {
    /// Create a new database connection pool
    pub async fn connect(database_url: &str, max_connections: u32) -> Result<Self, sqlx::Error> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .acquire_timeout(Duration::from_secs(5))
            .connect(database_url)
            .await?;

        tracing::info!(max_connections, "PostgreSQL connection pool established");
        Ok(Self { pool })
    }

    /// Get a reference to the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Apply the bundled schema (CREATE ... IF NOT EXISTS)
    pub async fn init_schema(&self) -> Result<(), sqlx::Error> {
        sqlx::raw_sql(USERS_SCHEMA).execute(&self.pool).await?;
        tracing::info!("users schema ready");
        Ok(())
    }

    /// Check database health
    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

/// Extension trait for safe row access with logging
pub trait SafeRow {
    /// Try to get a value from a column, log error and return None if it fails
    fn try_get_log<'r, T>(&'r self, column: &str) -> Option<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>;
}

impl SafeRow for sqlx::postgres::PgRow {
    fn try_get_log<'r, T>(&'r self, column: &str) -> Option<T>
    where
        T: sqlx::Decode<'r, sqlx::Postgres> + sqlx::Type<sqlx::Postgres>,
    {
        use sqlx::Row;
        match self.try_get(column) {
            Ok(v) => Some(v),
            Err(e) => {
                tracing::error!("Failed to read column '{}': {}", column, e);
                None
            }
        }
    }
}
