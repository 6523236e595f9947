//! Background maintenance - the orphaned-attachment sweep.
//!
//! Uploads are linked to their message in a second step, so an upload
//! whose sender never completed the send would otherwise live forever.
//! The sweep removes rows (and files) that stayed unlinked past the TTL.

use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::domain::foundation::Timestamp;
use crate::ports::{FileStore, MessageStore};

/// One sweep pass: delete every attachment unlinked for longer than `ttl`.
pub async fn sweep_orphans(
    messages: &Arc<dyn MessageStore>,
    files: &Arc<dyn FileStore>,
    ttl: Duration,
) {
    let cutoff = Timestamp::now().plus_secs(-(ttl.as_secs() as i64));
    let orphans = match messages.orphaned_attachments(cutoff).await {
        Ok(orphans) => orphans,
        Err(e) => {
            warn!(error = %e, "Orphan sweep query failed");
            return;
        }
    };

    if orphans.is_empty() {
        return;
    }
    debug!(count = orphans.len(), "Sweeping orphaned attachments");

    for orphan in orphans {
        if let Err(e) = files.remove(&orphan.storage_path).await {
            warn!(error = %e, path = orphan.storage_path, "Failed to remove orphan file");
            continue;
        }
        if let Err(e) = messages.delete_attachment(&orphan.id).await {
            warn!(error = %e, id = %orphan.id, "Failed to delete orphan row");
        }
    }
}

/// Spawns the periodic orphan sweep.
pub fn spawn_orphan_sweep(
    messages: Arc<dyn MessageStore>,
    files: Arc<dyn FileStore>,
    ttl: Duration,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.tick().await;
        loop {
            ticker.tick().await;
            sweep_orphans(&messages, &files, ttl).await;
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sqlite::{test_pool, SqliteMessageStore};
    use crate::domain::foundation::DomainError;
    use async_trait::async_trait;
    use std::sync::Mutex;

    #[derive(Default)]
    struct RecordingFileStore {
        removed: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl FileStore for RecordingFileStore {
        async fn remove(&self, storage_path: &str) -> Result<(), DomainError> {
            self.removed.lock().unwrap().push(storage_path.to_string());
            Ok(())
        }
    }

    #[tokio::test]
    async fn sweep_removes_only_stale_unlinked_uploads() {
        let pool = test_pool().await;
        sqlx::query(
            r#"
            INSERT INTO attachments (id, filename, mime_type, size, storage_path, created_at)
            VALUES ('stale', 'a', 'image/png', 1, 'uploads/stale.png', 0)
            "#,
        )
        .execute(&pool)
        .await
        .unwrap();
        sqlx::query(
            r#"
            INSERT INTO attachments (id, filename, mime_type, size, storage_path, created_at)
            VALUES ('fresh', 'b', 'image/png', 1, 'uploads/fresh.png', ?)
            "#,
        )
        .bind(Timestamp::now().as_unix())
        .execute(&pool)
        .await
        .unwrap();

        let messages: Arc<dyn MessageStore> = Arc::new(SqliteMessageStore::new(pool.clone()));
        let files = Arc::new(RecordingFileStore::default());

        sweep_orphans(
            &messages,
            &(Arc::clone(&files) as Arc<dyn FileStore>),
            Duration::from_secs(3600),
        )
        .await;

        assert_eq!(*files.removed.lock().unwrap(), vec!["uploads/stale.png".to_string()]);
        let remaining: Vec<String> = sqlx::query_scalar("SELECT id FROM attachments")
            .fetch_all(&pool)
            .await
            .unwrap();
        assert_eq!(remaining, vec!["fresh".to_string()]);
    }
}
