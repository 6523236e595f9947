//! SQLite adapters - pool setup, schema, and port implementations.
//!
//! All persistence runs against a single SQLite file (or `sqlite::memory:`
//! in tests). The schema is applied idempotently at startup; there is no
//! external migration tooling to run.

mod channel_store;
mod conversation_store;
mod membership_reader;
mod message_store;
mod server_store;
mod session_auth;

pub use channel_store::SqliteChannelStore;
pub use conversation_store::SqliteConversationStore;
pub use membership_reader::SqliteMembershipReader;
pub use message_store::SqliteMessageStore;
pub use server_store::SqliteServerStore;
pub use session_auth::SqliteSessionAuth;

use sqlx::sqlite::{SqliteConnectOptions, SqlitePool, SqlitePoolOptions};
use std::str::FromStr;

use crate::config::DatabaseConfig;
use crate::domain::foundation::DomainError;

/// Opens the connection pool and applies the schema.
pub async fn init_pool(config: &DatabaseConfig) -> Result<SqlitePool, DomainError> {
    let options = SqliteConnectOptions::from_str(&config.url)
        .map_err(|e| DomainError::database(format!("Invalid database URL: {}", e)))?
        .create_if_missing(true)
        .foreign_keys(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(config.max_connections)
        .connect_with(options)
        .await
        .map_err(|e| DomainError::database(format!("Failed to open database: {}", e)))?;

    apply_schema(&pool).await?;

    Ok(pool)
}

/// Applies the schema. Every statement is idempotent so this is safe to run
/// on every startup.
pub async fn apply_schema(pool: &SqlitePool) -> Result<(), DomainError> {
    const SCHEMA: &[&str] = &[
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id          TEXT PRIMARY KEY,
            username    TEXT NOT NULL UNIQUE,
            avatar_url  TEXT,
            created_at  INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            token       TEXT PRIMARY KEY,
            user_id     TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            expires_at  INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS servers (
            id                TEXT PRIMARY KEY,
            name              TEXT NOT NULL,
            owner_id          TEXT NOT NULL REFERENCES users(id),
            created_at        INTEGER NOT NULL,
            purge_after_days  INTEGER NOT NULL DEFAULT 0
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS server_members (
            server_id      TEXT NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
            user_id        TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            role           TEXT NOT NULL DEFAULT 'user',
            joined_at      INTEGER NOT NULL,
            timeout_until  INTEGER,
            PRIMARY KEY (server_id, user_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS server_bans (
            server_id  TEXT NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
            user_id    TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            banned_at  INTEGER NOT NULL,
            PRIMARY KEY (server_id, user_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS channels (
            id          TEXT PRIMARY KEY,
            server_id   TEXT NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
            name        TEXT NOT NULL,
            kind        TEXT NOT NULL CHECK (kind IN ('text', 'voice')),
            created_at  INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS messages (
            id          TEXT PRIMARY KEY,
            channel_id  TEXT NOT NULL REFERENCES channels(id) ON DELETE CASCADE,
            author_id   TEXT NOT NULL REFERENCES users(id),
            content     TEXT NOT NULL,
            gif_url     TEXT,
            locked      INTEGER NOT NULL DEFAULT 0,
            created_at  INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_messages_channel_created
            ON messages(channel_id, created_at)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS invite_codes (
            code            TEXT PRIMARY KEY,
            server_id       TEXT NOT NULL REFERENCES servers(id) ON DELETE CASCADE,
            created_by      TEXT NOT NULL REFERENCES users(id),
            uses_remaining  INTEGER,
            expires_at      INTEGER,
            created_at      INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS conversations (
            id          TEXT PRIMARY KEY,
            created_at  INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS conversation_participants (
            conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            user_id          TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
            PRIMARY KEY (conversation_id, user_id)
        )
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS direct_messages (
            id               TEXT PRIMARY KEY,
            conversation_id  TEXT NOT NULL REFERENCES conversations(id) ON DELETE CASCADE,
            author_id        TEXT NOT NULL REFERENCES users(id),
            content          TEXT NOT NULL,
            gif_url          TEXT,
            created_at       INTEGER NOT NULL
        )
        "#,
        r#"
        CREATE INDEX IF NOT EXISTS idx_dms_conversation_created
            ON direct_messages(conversation_id, created_at)
        "#,
        r#"
        CREATE TABLE IF NOT EXISTS attachments (
            id            TEXT PRIMARY KEY,
            message_id    TEXT REFERENCES messages(id) ON DELETE CASCADE,
            dm_id         TEXT REFERENCES direct_messages(id) ON DELETE CASCADE,
            filename      TEXT NOT NULL,
            mime_type     TEXT NOT NULL,
            size          INTEGER NOT NULL,
            storage_path  TEXT NOT NULL,
            created_at    INTEGER NOT NULL
        )
        "#,
    ];

    for statement in SCHEMA {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| DomainError::database(format!("Failed to apply schema: {}", e)))?;
    }

    Ok(())
}

/// The capability URL clients fetch attachment bytes from.
pub(crate) fn attachment_url(attachment_id: &str) -> String {
    format!("/files/{}", attachment_id)
}

#[cfg(test)]
pub(crate) async fn test_pool() -> SqlitePool {
    let config = DatabaseConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
    };
    init_pool(&config).await.expect("in-memory pool")
}
