//! SQLite implementation of MessageStore.
//!
//! Attachment linkage uses a conditional UPDATE so that two sockets racing
//! to claim the same upload resolve to exactly one winner.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::adapters::sqlite::attachment_url;
use crate::domain::chat::{Attachment, DirectMessage, Message, PublicUser};
use crate::domain::foundation::{
    AttachmentId, ChannelId, ConversationId, DomainError, MessageId, ServerId, Timestamp, UserId,
};
use crate::ports::{MessageStore, OrphanedAttachment};

/// Message and attachment persistence over the SQLite store.
#[derive(Clone)]
pub struct SqliteMessageStore {
    pool: SqlitePool,
}

impl SqliteMessageStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    async fn load_attachment(
        &self,
        attachment_id: &AttachmentId,
        owner: &MessageId,
    ) -> Result<Attachment, DomainError> {
        let row: AttachmentRow = sqlx::query_as(
            "SELECT id, filename, mime_type, size FROM attachments WHERE id = ?",
        )
        .bind(attachment_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load attachment: {}", e)))?;

        Ok(row.into_attachment(owner.clone()))
    }
}

#[derive(sqlx::FromRow)]
struct AttachmentRow {
    id: String,
    filename: String,
    mime_type: String,
    size: i64,
}

impl AttachmentRow {
    fn into_attachment(self, owner: MessageId) -> Attachment {
        let url = attachment_url(&self.id);
        Attachment {
            id: AttachmentId::new(self.id),
            message_id: owner,
            filename: self.filename,
            mime_type: self.mime_type,
            size: self.size,
            url,
        }
    }
}

/// One hydrated history row: message columns, author snapshot, and the
/// attachment columns left-joined in (all null when there is none).
#[derive(sqlx::FromRow)]
struct HistoryRow {
    id: String,
    content: String,
    gif_url: Option<String>,
    locked: Option<i64>,
    created_at: i64,
    author_id: String,
    author_username: String,
    author_avatar_url: Option<String>,
    author_created_at: i64,
    attachment_id: Option<String>,
    attachment_filename: Option<String>,
    attachment_mime_type: Option<String>,
    attachment_size: Option<i64>,
}

impl HistoryRow {
    fn author(&self) -> PublicUser {
        PublicUser {
            id: UserId::new(self.author_id.clone()),
            username: self.author_username.clone(),
            avatar_url: self.author_avatar_url.clone(),
            created_at: Timestamp::from_unix(self.author_created_at),
        }
    }

    fn attachment(&self) -> Option<Attachment> {
        let id = self.attachment_id.clone()?;
        let url = attachment_url(&id);
        Some(Attachment {
            id: AttachmentId::new(id),
            message_id: MessageId::new(self.id.clone()),
            filename: self.attachment_filename.clone().unwrap_or_default(),
            mime_type: self.attachment_mime_type.clone().unwrap_or_default(),
            size: self.attachment_size.unwrap_or_default(),
            url,
        })
    }
}

#[async_trait]
impl MessageStore for SqliteMessageStore {
    async fn insert_message(
        &self,
        channel_id: &ChannelId,
        author_id: &UserId,
        content: &str,
        gif_url: Option<&str>,
    ) -> Result<Message, DomainError> {
        let id = MessageId::generate();
        let created_at = Timestamp::now();

        sqlx::query(
            r#"
            INSERT INTO messages (id, channel_id, author_id, content, gif_url, locked, created_at)
            VALUES (?, ?, ?, ?, ?, 0, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(channel_id.as_str())
        .bind(author_id.as_str())
        .bind(content)
        .bind(gif_url)
        .bind(created_at.as_unix())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert message: {}", e)))?;

        Ok(Message {
            id,
            channel_id: channel_id.clone(),
            author_id: author_id.clone(),
            content: content.to_string(),
            created_at,
            attachment: None,
            gif_url: gif_url.map(String::from),
            locked: false,
        })
    }

    async fn insert_direct_message(
        &self,
        conversation_id: &ConversationId,
        author_id: &UserId,
        content: &str,
        gif_url: Option<&str>,
    ) -> Result<DirectMessage, DomainError> {
        let id = MessageId::generate();
        let created_at = Timestamp::now();

        sqlx::query(
            r#"
            INSERT INTO direct_messages (id, conversation_id, author_id, content, gif_url, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(id.as_str())
        .bind(conversation_id.as_str())
        .bind(author_id.as_str())
        .bind(content)
        .bind(gif_url)
        .bind(created_at.as_unix())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to insert direct message: {}", e)))?;

        Ok(DirectMessage {
            id,
            conversation_id: conversation_id.clone(),
            author_id: author_id.clone(),
            content: content.to_string(),
            created_at,
            attachment: None,
            gif_url: gif_url.map(String::from),
        })
    }

    async fn claim_attachment_for_message(
        &self,
        attachment_id: &AttachmentId,
        message_id: &MessageId,
    ) -> Result<Option<Attachment>, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE attachments SET message_id = ?
            WHERE id = ? AND message_id IS NULL AND dm_id IS NULL
            "#,
        )
        .bind(message_id.as_str())
        .bind(attachment_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to claim attachment: {}", e)))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.load_attachment(attachment_id, message_id).await.map(Some)
    }

    async fn claim_attachment_for_dm(
        &self,
        attachment_id: &AttachmentId,
        dm_id: &MessageId,
    ) -> Result<Option<Attachment>, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE attachments SET dm_id = ?
            WHERE id = ? AND message_id IS NULL AND dm_id IS NULL
            "#,
        )
        .bind(dm_id.as_str())
        .bind(attachment_id.as_str())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to claim attachment: {}", e)))?;

        if result.rows_affected() == 0 {
            return Ok(None);
        }

        self.load_attachment(attachment_id, dm_id).await.map(Some)
    }

    async fn message_context(
        &self,
        message_id: &MessageId,
    ) -> Result<Option<(ChannelId, ServerId, bool)>, DomainError> {
        let row: Option<(String, String, i64)> = sqlx::query_as(
            r#"
            SELECT m.channel_id, c.server_id, m.locked
            FROM messages m
            JOIN channels c ON c.id = m.channel_id
            WHERE m.id = ?
            "#,
        )
        .bind(message_id.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load message context: {}", e)))?;

        Ok(row.map(|(channel, server, locked)| {
            (ChannelId::new(channel), ServerId::new(server), locked != 0)
        }))
    }

    async fn delete_message(&self, message_id: &MessageId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM messages WHERE id = ?")
            .bind(message_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to delete message: {}", e)))?;
        Ok(())
    }

    async fn set_message_locked(
        &self,
        message_id: &MessageId,
        locked: bool,
    ) -> Result<(), DomainError> {
        sqlx::query("UPDATE messages SET locked = ? WHERE id = ?")
            .bind(locked as i64)
            .bind(message_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to set lock flag: {}", e)))?;
        Ok(())
    }

    async fn purge_unlocked_messages(
        &self,
        server_id: &ServerId,
    ) -> Result<Vec<String>, DomainError> {
        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| DomainError::database(format!("Failed to start transaction: {}", e)))?;

        // Collect attachment files before the cascade removes their rows.
        let paths: Vec<String> = sqlx::query_scalar(
            r#"
            SELECT a.storage_path
            FROM attachments a
            JOIN messages m ON m.id = a.message_id
            JOIN channels c ON c.id = m.channel_id
            WHERE c.server_id = ? AND m.locked = 0
            "#,
        )
        .bind(server_id.as_str())
        .fetch_all(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to collect purge paths: {}", e)))?;

        sqlx::query(
            r#"
            DELETE FROM messages
            WHERE locked = 0
              AND channel_id IN (SELECT id FROM channels WHERE server_id = ?)
            "#,
        )
        .bind(server_id.as_str())
        .execute(&mut *tx)
        .await
        .map_err(|e| DomainError::database(format!("Failed to purge messages: {}", e)))?;

        tx.commit()
            .await
            .map_err(|e| DomainError::database(format!("Failed to commit purge: {}", e)))?;

        Ok(paths)
    }

    async fn channel_messages(
        &self,
        channel_id: &ChannelId,
        before: Option<Timestamp>,
        limit: u32,
    ) -> Result<Vec<(Message, PublicUser)>, DomainError> {
        let before = before.map(|t| t.as_unix());
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.content, m.gif_url, m.locked, m.created_at,
                   u.id AS author_id, u.username AS author_username,
                   u.avatar_url AS author_avatar_url, u.created_at AS author_created_at,
                   a.id AS attachment_id, a.filename AS attachment_filename,
                   a.mime_type AS attachment_mime_type, a.size AS attachment_size
            FROM messages m
            JOIN users u ON u.id = m.author_id
            LEFT JOIN attachments a ON a.message_id = m.id
            WHERE m.channel_id = ? AND (? IS NULL OR m.created_at < ?)
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT ?
            "#,
        )
        .bind(channel_id.as_str())
        .bind(before)
        .bind(before)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load channel history: {}", e)))?;

        let mut out: Vec<(Message, PublicUser)> = rows
            .into_iter()
            .map(|row| {
                let author = row.author();
                let attachment = row.attachment();
                let message = Message {
                    id: MessageId::new(row.id),
                    channel_id: channel_id.clone(),
                    author_id: author.id.clone(),
                    content: row.content,
                    created_at: Timestamp::from_unix(row.created_at),
                    attachment,
                    gif_url: row.gif_url,
                    locked: row.locked.unwrap_or(0) != 0,
                };
                (message, author)
            })
            .collect();
        out.reverse();
        Ok(out)
    }

    async fn conversation_messages(
        &self,
        conversation_id: &ConversationId,
        before: Option<Timestamp>,
        limit: u32,
    ) -> Result<Vec<(DirectMessage, PublicUser)>, DomainError> {
        let before = before.map(|t| t.as_unix());
        let rows: Vec<HistoryRow> = sqlx::query_as(
            r#"
            SELECT m.id, m.content, m.gif_url, NULL AS locked, m.created_at,
                   u.id AS author_id, u.username AS author_username,
                   u.avatar_url AS author_avatar_url, u.created_at AS author_created_at,
                   a.id AS attachment_id, a.filename AS attachment_filename,
                   a.mime_type AS attachment_mime_type, a.size AS attachment_size
            FROM direct_messages m
            JOIN users u ON u.id = m.author_id
            LEFT JOIN attachments a ON a.dm_id = m.id
            WHERE m.conversation_id = ? AND (? IS NULL OR m.created_at < ?)
            ORDER BY m.created_at DESC, m.id DESC
            LIMIT ?
            "#,
        )
        .bind(conversation_id.as_str())
        .bind(before)
        .bind(before)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to load conversation history: {}", e)))?;

        let mut out: Vec<(DirectMessage, PublicUser)> = rows
            .into_iter()
            .map(|row| {
                let author = row.author();
                let attachment = row.attachment();
                let message = DirectMessage {
                    id: MessageId::new(row.id),
                    conversation_id: conversation_id.clone(),
                    author_id: author.id.clone(),
                    content: row.content,
                    created_at: Timestamp::from_unix(row.created_at),
                    attachment,
                    gif_url: row.gif_url,
                };
                (message, author)
            })
            .collect();
        out.reverse();
        Ok(out)
    }

    async fn orphaned_attachments(
        &self,
        cutoff: Timestamp,
    ) -> Result<Vec<OrphanedAttachment>, DomainError> {
        let rows: Vec<(String, String)> = sqlx::query_as(
            r#"
            SELECT id, storage_path FROM attachments
            WHERE message_id IS NULL AND dm_id IS NULL AND created_at < ?
            "#,
        )
        .bind(cutoff.as_unix())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| DomainError::database(format!("Failed to list orphans: {}", e)))?;

        Ok(rows
            .into_iter()
            .map(|(id, storage_path)| OrphanedAttachment {
                id: AttachmentId::new(id),
                storage_path,
            })
            .collect())
    }

    async fn delete_attachment(&self, attachment_id: &AttachmentId) -> Result<(), DomainError> {
        sqlx::query("DELETE FROM attachments WHERE id = ?")
            .bind(attachment_id.as_str())
            .execute(&self.pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to delete attachment: {}", e)))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::test_pool;

    async fn seed(pool: &SqlitePool) {
        sqlx::query("INSERT INTO users (id, username, created_at) VALUES ('u1', 'ada', 0)")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query("INSERT INTO servers (id, name, owner_id, created_at) VALUES ('s1', 'home', 'u1', 0)")
            .execute(pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO channels (id, server_id, name, kind, created_at) VALUES ('c1', 's1', 'general', 'text', 0)",
        )
        .execute(pool)
        .await
        .unwrap();
    }

    async fn seed_unlinked_attachment(pool: &SqlitePool, id: &str) {
        sqlx::query(
            r#"
            INSERT INTO attachments (id, filename, mime_type, size, storage_path, created_at)
            VALUES (?, 'cat.png', 'image/png', 1234, ?, 0)
            "#,
        )
        .bind(id)
        .bind(format!("uploads/{}.png", id))
        .execute(pool)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn insert_then_read_back_hydrated() {
        let pool = test_pool().await;
        seed(&pool).await;

        let store = SqliteMessageStore::new(pool);
        let channel = ChannelId::new("c1");
        let msg = store
            .insert_message(&channel, &UserId::new("u1"), "hello", None)
            .await
            .unwrap();
        assert!(!msg.locked);

        let history = store.channel_messages(&channel, None, 50).await.unwrap();
        assert_eq!(history.len(), 1);
        assert_eq!(history[0].0.content, "hello");
        assert_eq!(history[0].1.username, "ada");
    }

    #[tokio::test]
    async fn attachment_claim_has_exactly_one_winner() {
        let pool = test_pool().await;
        seed(&pool).await;
        seed_unlinked_attachment(&pool, "a1").await;
        sqlx::query(
            "INSERT INTO messages (id, channel_id, author_id, content, created_at) VALUES ('m1', 'c1', 'u1', 'one', 0), ('m2', 'c1', 'u1', 'two', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query("INSERT INTO conversations (id, created_at) VALUES ('conv1', 0)")
            .execute(&pool)
            .await
            .unwrap();
        sqlx::query(
            "INSERT INTO direct_messages (id, conversation_id, author_id, content, created_at) VALUES ('d1', 'conv1', 'u1', 'dm', 0)",
        )
        .execute(&pool)
        .await
        .unwrap();

        let store = SqliteMessageStore::new(pool);
        let att = AttachmentId::new("a1");
        let first = store
            .claim_attachment_for_message(&att, &MessageId::new("m1"))
            .await
            .unwrap();
        let second = store
            .claim_attachment_for_message(&att, &MessageId::new("m2"))
            .await
            .unwrap();
        let dm_side = store
            .claim_attachment_for_dm(&att, &MessageId::new("d1"))
            .await
            .unwrap();

        assert!(first.is_some());
        assert_eq!(first.unwrap().message_id.as_str(), "m1");
        assert!(second.is_none());
        assert!(dm_side.is_none());
    }

    #[tokio::test]
    async fn purge_spares_locked_messages_and_reports_files() {
        let pool = test_pool().await;
        seed(&pool).await;
        seed_unlinked_attachment(&pool, "a1").await;

        let store = SqliteMessageStore::new(pool.clone());
        let channel = ChannelId::new("c1");
        let author = UserId::new("u1");

        let doomed = store
            .insert_message(&channel, &author, "old news", None)
            .await
            .unwrap();
        let kept = store
            .insert_message(&channel, &author, "keep me", None)
            .await
            .unwrap();
        store.set_message_locked(&kept.id, true).await.unwrap();
        store
            .claim_attachment_for_message(&AttachmentId::new("a1"), &doomed.id)
            .await
            .unwrap();

        let paths = store
            .purge_unlocked_messages(&ServerId::new("s1"))
            .await
            .unwrap();
        assert_eq!(paths, vec!["uploads/a1.png".to_string()]);

        let remaining = store.channel_messages(&channel, None, 50).await.unwrap();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].0.id, kept.id);
        assert!(remaining[0].0.locked);
    }

    #[tokio::test]
    async fn orphan_listing_respects_cutoff_and_linkage() {
        let pool = test_pool().await;
        seed(&pool).await;
        seed_unlinked_attachment(&pool, "old").await;
        sqlx::query(
            r#"
            INSERT INTO attachments (id, filename, mime_type, size, storage_path, created_at)
            VALUES ('fresh', 'dog.png', 'image/png', 99, 'uploads/fresh.png', ?)
            "#,
        )
        .bind(Timestamp::now().as_unix())
        .execute(&pool)
        .await
        .unwrap();

        let store = SqliteMessageStore::new(pool);
        let orphans = store
            .orphaned_attachments(Timestamp::now().plus_secs(-3600))
            .await
            .unwrap();
        assert_eq!(orphans.len(), 1);
        assert_eq!(orphans[0].id.as_str(), "old");

        store.delete_attachment(&orphans[0].id).await.unwrap();
        let after = store
            .orphaned_attachments(Timestamp::now().plus_secs(-3600))
            .await
            .unwrap();
        assert!(after.is_empty());
    }

    #[tokio::test]
    async fn history_pagination_is_oldest_first_with_exclusive_cursor() {
        let pool = test_pool().await;
        seed(&pool).await;

        // Insert with explicit timestamps to keep ordering deterministic.
        for (id, at) in [("m1", 100), ("m2", 200), ("m3", 300)] {
            sqlx::query(
                "INSERT INTO messages (id, channel_id, author_id, content, locked, created_at) VALUES (?, 'c1', 'u1', ?, 0, ?)",
            )
            .bind(id)
            .bind(id)
            .bind(at)
            .execute(&pool)
            .await
            .unwrap();
        }

        let store = SqliteMessageStore::new(pool);
        let channel = ChannelId::new("c1");

        let page = store
            .channel_messages(&channel, Some(Timestamp::from_unix(300)), 10)
            .await
            .unwrap();
        let ids: Vec<&str> = page.iter().map(|(m, _)| m.id.as_str()).collect();
        assert_eq!(ids, vec!["m1", "m2"]);
    }
}
