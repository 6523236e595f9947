//! SQLite implementation of ChannelStore.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::domain::chat::{Channel, ChannelKind};
use crate::domain::foundation::{ChannelId, DomainError, ServerId, Timestamp};
use crate::ports::ChannelStore;

/// Channel persistence over the SQLite store.
#[derive(Clone)]
pub struct SqliteChannelStore {
    pool: SqlitePool,
}

impl SqliteChannelStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[derive(sqlx::FromRow)]
struct ChannelRow {
    id: String,
    server_id: String,
    name: String,
    kind: String,
    created_at: i64,
}

impl TryFrom<ChannelRow> for Channel {
    type Error = DomainError;

    fn try_from(row: ChannelRow) -> Result<Self, Self::Error> {
        Ok(Channel {
            id: ChannelId::new(row.id),
            server_id: ServerId::new(row.server_id),
            name: row.name,
            kind: ChannelKind::parse(&row.kind)?,
            created_at: Timestamp::from_unix(row.created_at),
        })
    }
}

#[async_trait]
impl ChannelStore for SqliteChannelStore {
    async fn channels_for_server(
        &self,
        server_id: &ServerId,
    ) -> Result<Vec<Channel>, DomainError> {
        let rows: Vec<ChannelRow> = sqlx::query_as(
            r#"
            SELECT id, server_id, name, kind, created_at
            FROM channels
            WHERE server_id = ?
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(server_id.as_str())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list channels: {}", e)))?;

        rows.into_iter().map(Channel::try_from).collect()
    }

    async fn get_channel(&self, channel_id: &ChannelId) -> Result<Option<Channel>, DomainError> {
        let row: Option<ChannelRow> = sqlx::query_as(
            "SELECT id, server_id, name, kind, created_at FROM channels WHERE id = ?",
        )
        .bind(channel_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load channel: {}", e)))?;

        row.map(Channel::try_from).transpose()
    }

    async fn create_channel(
        &self,
        server_id: &ServerId,
        name: &str,
        kind: ChannelKind,
    ) -> Result<Channel, DomainError> {
        let id = ChannelId::generate();
        let created_at = Timestamp::now();

        sqlx::query(
            "INSERT INTO channels (id, server_id, name, kind, created_at) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(id.as_str())
        .bind(server_id.as_str())
        .bind(name)
        .bind(kind.as_str())
        .bind(created_at.as_unix())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to create channel: {}", e)))?;

        Ok(Channel {
            id,
            server_id: server_id.clone(),
            name: name.to_string(),
            kind,
            created_at,
        })
    }

    async fn delete_channel(&self, channel_id: &ChannelId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM channels WHERE id = ?")
            .bind(channel_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to delete channel: {}", e)))?;
        Ok(())
    }

    async fn text_channel_count(&self, server_id: &ServerId) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM channels WHERE server_id = ? AND kind = 'text'")
            .bind(server_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to count text channels: {}", e)))
    }
}
