//! Integration tests for the SQLite store: invite consumption, attachment
//! claim exclusivity, and the lock/purge retention flow. Everything runs
//! against an in-memory database through the public ports.

use std::sync::Arc;

use hearth::adapters::sqlite::{
    init_pool, SqliteMessageStore, SqliteServerStore,
};
use hearth::config::DatabaseConfig;
use hearth::domain::foundation::{AttachmentId, Timestamp, UserId};
use hearth::ports::{MessageStore, ServerStore};
use sqlx::SqlitePool;

async fn memory_pool() -> SqlitePool {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    init_pool(&config).await.expect("in-memory pool")
}

async fn seed_users(pool: &SqlitePool, ids: &[&str]) {
    for id in ids {
        sqlx::query("INSERT INTO users (id, username, created_at) VALUES (?, ?, 0)")
            .bind(id)
            .bind(id)
            .execute(pool)
            .await
            .unwrap();
    }
}

#[tokio::test]
async fn single_use_invite_admits_exactly_one_member() {
    let pool = memory_pool().await;
    seed_users(&pool, &["owner", "first", "second"]).await;

    let servers = SqliteServerStore::new(pool.clone());
    let server = servers
        .create_server("Hub", &UserId::new("owner"))
        .await
        .unwrap();
    let invite = servers
        .create_invite(&server.id, &UserId::new("owner"), Some(1), None)
        .await
        .unwrap();

    let first = servers.consume_invite(&invite.code).await.unwrap();
    assert_eq!(first, Some(server.id.clone()));

    let second = servers.consume_invite(&invite.code).await.unwrap();
    assert_eq!(second, None);
}

#[tokio::test]
async fn expired_invite_is_rejected() {
    let pool = memory_pool().await;
    seed_users(&pool, &["owner"]).await;

    let servers = SqliteServerStore::new(pool.clone());
    let server = servers
        .create_server("Hub", &UserId::new("owner"))
        .await
        .unwrap();
    let invite = servers
        .create_invite(
            &server.id,
            &UserId::new("owner"),
            None,
            Some(Timestamp::now().plus_secs(-60)),
        )
        .await
        .unwrap();

    assert_eq!(servers.consume_invite(&invite.code).await.unwrap(), None);
}

#[tokio::test]
async fn attachment_claim_is_exclusive() {
    let pool = memory_pool().await;
    seed_users(&pool, &["owner"]).await;

    let servers = SqliteServerStore::new(pool.clone());
    let messages = SqliteMessageStore::new(pool.clone());
    let server = servers
        .create_server("Hub", &UserId::new("owner"))
        .await
        .unwrap();
    let channel_id: String =
        sqlx::query_scalar("SELECT id FROM channels WHERE server_id = ? AND kind = 'text'")
            .bind(server.id.as_str())
            .fetch_one(&pool)
            .await
            .unwrap();

    sqlx::query(
        "INSERT INTO attachments (id, filename, mime_type, size, storage_path, created_at) \
         VALUES ('a1', 'cat.png', 'image/png', 42, 'uploads/a1.png', 0)",
    )
    .execute(&pool)
    .await
    .unwrap();

    let first = messages
        .insert_message(
            &hearth::domain::foundation::ChannelId::new(channel_id.clone()),
            &UserId::new("owner"),
            "here",
            None,
        )
        .await
        .unwrap();
    let second = messages
        .insert_message(
            &hearth::domain::foundation::ChannelId::new(channel_id),
            &UserId::new("owner"),
            "mine too",
            None,
        )
        .await
        .unwrap();

    let attachment = AttachmentId::new("a1");
    let winner = messages
        .claim_attachment_for_message(&attachment, &first.id)
        .await
        .unwrap();
    assert!(winner.is_some());
    assert_eq!(winner.unwrap().message_id, first.id);

    let loser = messages
        .claim_attachment_for_message(&attachment, &second.id)
        .await
        .unwrap();
    assert!(loser.is_none());
}

#[tokio::test]
async fn purge_spares_locked_messages_and_reports_attachment_files() {
    let pool = memory_pool().await;
    seed_users(&pool, &["owner"]).await;

    let servers = SqliteServerStore::new(pool.clone());
    let messages: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::new(pool.clone()));
    let server = servers
        .create_server("Hub", &UserId::new("owner"))
        .await
        .unwrap();
    let channel_id: String =
        sqlx::query_scalar("SELECT id FROM channels WHERE server_id = ? AND kind = 'text'")
            .bind(server.id.as_str())
            .fetch_one(&pool)
            .await
            .unwrap();
    let channel = hearth::domain::foundation::ChannelId::new(channel_id);

    let keep = messages
        .insert_message(&channel, &UserId::new("owner"), "pinned", None)
        .await
        .unwrap();
    let drop = messages
        .insert_message(&channel, &UserId::new("owner"), "ephemeral", None)
        .await
        .unwrap();
    messages.set_message_locked(&keep.id, true).await.unwrap();

    sqlx::query(
        "INSERT INTO attachments (id, message_id, filename, mime_type, size, storage_path, created_at) \
         VALUES ('a1', ?, 'doc.pdf', 'application/pdf', 7, 'uploads/a1.pdf', 0)",
    )
    .bind(drop.id.as_str())
    .execute(&pool)
    .await
    .unwrap();

    let paths = messages.purge_unlocked_messages(&server.id).await.unwrap();
    assert_eq!(paths, vec!["uploads/a1.pdf".to_string()]);

    let remaining: Vec<String> = sqlx::query_scalar("SELECT id FROM messages")
        .fetch_all(&pool)
        .await
        .unwrap();
    assert_eq!(remaining, vec![keep.id.as_str().to_string()]);
}
