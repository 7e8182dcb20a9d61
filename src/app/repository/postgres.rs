//! Postgres user store.

use super::{email_taken, UserRepository};
use crate::app::models::{Credentials, NewUser, User, UserPatch};
use crate::error::ActionError;
use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, name, email, created_at, updated_at";

/// Creates the `users` table and its case-insensitive email index if missing.
pub async fn ensure_users_table(pool: &PgPool) -> Result<(), sqlx::Error> {
    let ddl = r#"
        CREATE TABLE IF NOT EXISTS users (
            id UUID PRIMARY KEY,
            name TEXT NOT NULL,
            email TEXT NOT NULL,
            password TEXT NOT NULL,
            created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
            updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
        )
    "#;
    sqlx::query(ddl).execute(pool).await?;
    sqlx::query("CREATE UNIQUE INDEX IF NOT EXISTS users_email_key ON users (LOWER(email))")
        .execute(pool)
        .await?;
    Ok(())
}

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        PgUserRepository { pool }
    }
}

fn db_error(e: sqlx::Error) -> ActionError {
    match &e {
        sqlx::Error::Database(db) if db.is_unique_violation() => email_taken(),
        _ => ActionError::unexpected(e),
    }
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn all(&self) -> Result<Vec<User>, ActionError> {
        let sql = format!("SELECT {} FROM users ORDER BY created_at", USER_COLUMNS);
        tracing::debug!(sql = %sql, "query");
        sqlx::query_as::<_, User>(&sql)
            .fetch_all(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn get_by_id(&self, id: Uuid) -> Result<Option<User>, ActionError> {
        let sql = format!("SELECT {} FROM users WHERE id = $1", USER_COLUMNS);
        tracing::debug!(sql = %sql, "query");
        sqlx::query_as::<_, User>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn get_credentials_by_email(&self, email: &str) -> Result<Option<Credentials>, ActionError> {
        let sql = "SELECT id, password FROM users WHERE LOWER(email) = LOWER($1)";
        tracing::debug!(sql = %sql, "query");
        sqlx::query_as::<_, Credentials>(sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn create(&self, user: NewUser) -> Result<Uuid, ActionError> {
        let sql = "INSERT INTO users (id, name, email, password) VALUES ($1, $2, $3, $4) RETURNING id";
        tracing::debug!(sql = %sql, "query");
        sqlx::query_scalar::<_, Uuid>(sql)
            .bind(Uuid::new_v4())
            .bind(&user.name)
            .bind(&user.email)
            .bind(&user.password)
            .fetch_one(&self.pool)
            .await
            .map_err(db_error)
    }

    async fn update_by_id(&self, id: Uuid, patch: UserPatch) -> Result<(), ActionError> {
        let sql = "UPDATE users SET name = COALESCE($2, name), email = COALESCE($3, email), updated_at = NOW() WHERE id = $1";
        tracing::debug!(sql = %sql, "query");
        sqlx::query(sql)
            .bind(id)
            .bind(patch.name)
            .bind(patch.email)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }

    async fn delete_by_id(&self, id: Uuid) -> Result<(), ActionError> {
        let sql = "DELETE FROM users WHERE id = $1";
        tracing::debug!(sql = %sql, "query");
        sqlx::query(sql)
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(db_error)?;
        Ok(())
    }
}
