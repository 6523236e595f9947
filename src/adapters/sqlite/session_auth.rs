//! SQLite implementation of AuthProvider over the sessions table.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::foundation::{DomainError, Timestamp, UserId};
use crate::ports::{AuthProvider, AuthenticatedUser};

/// Resolves bearer tokens against persisted sessions.
#[derive(Clone)]
pub struct SqliteSessionAuth {
    pool: SqlitePool,
}

impl SqliteSessionAuth {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct SessionRow {
    user_id: String,
    username: String,
    avatar_url: Option<String>,
    created_at: i64,
}

#[async_trait]
impl AuthProvider for SqliteSessionAuth {
    async fn authenticate(&self, token: &str) -> Result<Option<AuthenticatedUser>, DomainError> {
        let row: Option<SessionRow> = sqlx::query_as(
            r#"
            SELECT u.id AS user_id, u.username, u.avatar_url, u.created_at
            FROM sessions s
            JOIN users u ON u.id = s.user_id
            WHERE s.token = ? AND s.expires_at > ?
            "#,
        )
        .bind(token)
        .bind(Timestamp::now().as_unix())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to resolve session: {}", e)))?;

        Ok(row.map(|r| AuthenticatedUser {
            user_id: UserId::new(r.user_id),
            username: r.username,
            avatar_url: r.avatar_url,
            created_at: Timestamp::from_unix(r.created_at),
        }))
    }
}
