//! PostgreSQL user store
//!
//! Uses runtime queries to avoid sqlx compile-time database connection.

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use super::models::{NewUser, Role, UserRecord};
use super::store::{StoreError, UserStore};
use crate::db::{Database, SafeRow};

const USER_COLUMNS: &str = "id, username, email, role, created_at";

pub struct PgUserStore {
    db: Arc<Database>,
}

impl PgUserStore {
    pub fn new(db: Arc<Database>) -> Self {
        Self { db }
    }

    /// Convert a database row to UserRecord.
    fn row_to_record(row: &PgRow) -> Result<UserRecord, StoreError> {
        let column = |name: &str| StoreError::Corrupt(format!("column {} unreadable", name));

        let role: String = row.try_get_log("role").ok_or_else(|| column("role"))?;
        Ok(UserRecord {
            id: row.try_get_log("id").ok_or_else(|| column("id"))?,
            username: row.try_get_log("username").ok_or_else(|| column("username"))?,
            email: row.try_get_log("email").ok_or_else(|| column("email"))?,
            role: role
                .parse::<Role>()
                .map_err(|e| StoreError::Corrupt(e.to_string()))?,
            created_at: row
                .try_get_log("created_at")
                .ok_or_else(|| column("created_at"))?,
        })
    }

    /// Which field lost a cross-field clash detected by `create_user`.
    async fn cross_field_conflict(&self, username: &str) -> Result<&'static str, StoreError> {
        let row = sqlx::query("SELECT 1 FROM users WHERE lower(email) = lower($1) LIMIT 1")
            .bind(username)
            .fetch_optional(self.db.pool())
            .await?;
        Ok(if row.is_some() { "username" } else { "email" })
    }

    fn map_insert_error(err: sqlx::Error) -> StoreError {
        if let sqlx::Error::Database(db_err) = &err {
            if db_err.is_unique_violation() {
                return match db_err.constraint() {
                    Some("users_email_key") => StoreError::Conflict("email"),
                    _ => StoreError::Conflict("username"),
                };
            }
        }
        StoreError::Database(err)
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    fn name(&self) -> &'static str {
        "postgres"
    }

    async fn get_password_hash(&self, identifier: &str) -> Result<Option<String>, StoreError> {
        let row = sqlx::query(
            r#"SELECT password_hash FROM users
               WHERE username = $1 OR lower(email) = lower($1)
               ORDER BY (username = $1) DESC
               LIMIT 1"#,
        )
        .bind(identifier)
        .fetch_optional(self.db.pool())
        .await?;

        Ok(row.and_then(|r| r.try_get_log("password_hash")))
    }

    async fn get_user_by_id(&self, id: &str) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS))
            .bind(id)
            .fetch_optional(self.db.pool())
            .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn get_user_by_identifier(
        &self,
        identifier: &str,
    ) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "SELECT {} FROM users WHERE username = $1 OR lower(email) = lower($1) \
             ORDER BY (username = $1) DESC LIMIT 1",
            USER_COLUMNS
        ))
        .bind(identifier)
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn create_user(&self, new_user: NewUser) -> Result<UserRecord, StoreError> {
        // Same-field clashes hit the unique constraints; cross-field clashes
        // (username equal to another user's email or the reverse) make the
        // guarded insert return no row.
        let row = sqlx::query(&format!(
            r#"INSERT INTO users (id, username, email, password_hash, role)
               SELECT $1, $2, $3, $4, $5
               WHERE NOT EXISTS (
                   SELECT 1 FROM users
                   WHERE lower(email) = lower($2) OR lower(username) = lower($3)
               )
               RETURNING {}"#,
            USER_COLUMNS
        ))
        .bind(Uuid::new_v4().to_string())
        .bind(&new_user.username)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(new_user.role.as_str())
        .fetch_optional(self.db.pool())
        .await
        .map_err(Self::map_insert_error)?;

        match row {
            Some(row) => Self::row_to_record(&row),
            None => Err(StoreError::Conflict(
                self.cross_field_conflict(&new_user.username).await?,
            )),
        }
    }

    async fn list_users(&self, limit: u32, offset: u32) -> Result<Vec<UserRecord>, StoreError> {
        let rows = sqlx::query(&format!(
            "SELECT {} FROM users ORDER BY created_at, id LIMIT $1 OFFSET $2",
            USER_COLUMNS
        ))
        .bind(i64::from(limit))
        .bind(i64::from(offset))
        .fetch_all(self.db.pool())
        .await?;

        rows.iter().map(Self::row_to_record).collect()
    }

    async fn update_role(&self, id: &str, role: Role) -> Result<Option<UserRecord>, StoreError> {
        let row = sqlx::query(&format!(
            "UPDATE users SET role = $2 WHERE id = $1 RETURNING {}",
            USER_COLUMNS
        ))
        .bind(id)
        .bind(role.as_str())
        .fetch_optional(self.db.pool())
        .await?;

        row.as_ref().map(Self::row_to_record).transpose()
    }

    async fn delete_user(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(self.db.pool())
            .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn health_check(&self) -> Result<(), StoreError> {
        self.db.health_check().await?;
        Ok(())
    }
}
